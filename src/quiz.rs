use crate::answers::AnswerSheet;
use crate::error::{Result, SharpError, ValidationIssue};
use crate::grading::{grade, ScoreCard, Verdict};
use crate::question::{null_as_default, Question, RawQuestion};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizMetadata {
    pub quiz_id: String,
    pub community_id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub owner_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizEnvelope {
    pub metadata: QuizMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<RawQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRecord {
    #[serde(flatten)]
    pub metadata: QuizMetadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<RawQuestion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizList {
    pub quizzes: Vec<QuizRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizDocument {
    pub quiz_id: String,
    pub community_id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<RawQuestion>,
}

impl QuizDocument {
    /// Authoritative check applied before a document is stored. Unknown
    /// question types fail the whole document here, unlike when reading.
    pub fn validate(&self) -> Result<Vec<Question>> {
        let mut issues = Vec::new();
        if self.quiz_id.trim().is_empty() {
            issues.push(ValidationIssue::new("quiz_id", "must not be empty"));
        }
        if self.title.trim().is_empty() {
            issues.push(ValidationIssue::new("title", "must not be empty"));
        }
        if self.description.trim().is_empty() {
            issues.push(ValidationIssue::new("description", "must not be empty"));
        }
        let mut ids = HashSet::new();
        let mut questions = Vec::with_capacity(self.questions.len());
        for (i, raw) in self.questions.iter().enumerate() {
            if raw.question_id.trim().is_empty() {
                issues.push(ValidationIssue::new(format!("questions[{i}].question_id"), "must not be empty"));
            } else if !ids.insert(raw.question_id.as_str()) {
                issues.push(ValidationIssue::new(format!("questions[{i}].question_id"), "must be unique"));
            }
            let question = Question::try_from(raw.clone())?;
            question.check(i, &mut issues);
            questions.push(question);
        }
        if issues.is_empty() {
            Ok(questions)
        } else {
            Err(SharpError::ValidationIncomplete(issues))
        }
    }
}

#[derive(Debug)]
pub struct RejectedQuestion {
    pub position: usize,
    pub question_id: String,
    pub error: SharpError,
}

#[derive(Debug)]
pub struct NormalizedQuiz {
    pub quiz: Quiz,
    pub rejected: Vec<RejectedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub quiz_id: String,
    pub community_id: String,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    pub owner_ids: BTreeSet<String>,
    pub created_at: Option<i64>,
}

impl Quiz {
    /// Normalizes every question independently. A record with an unknown type
    /// is dropped from the quiz and reported in `rejected`.
    pub fn from_envelope(envelope: QuizEnvelope) -> NormalizedQuiz {
        let QuizEnvelope { metadata, questions: raw } = envelope;
        let mut questions = Vec::with_capacity(raw.len());
        let mut rejected = Vec::new();
        for (position, record) in raw.into_iter().enumerate() {
            let question_id = record.question_id.clone();
            match Question::try_from(record) {
                Ok(q) => questions.push(q),
                Err(error) => {
                    warn!(quiz_id = %metadata.quiz_id, %question_id, position, "skipping question: {}", error);
                    rejected.push(RejectedQuestion {
                        position,
                        question_id,
                        error,
                    });
                }
            }
        }
        NormalizedQuiz {
            quiz: Quiz {
                quiz_id: metadata.quiz_id,
                community_id: metadata.community_id,
                title: metadata.title,
                description: metadata.description,
                questions,
                owner_ids: metadata.owner_ids.into_iter().collect(),
                created_at: metadata.created_at,
            },
            rejected,
        }
    }

    pub fn from_record(record: QuizRecord) -> NormalizedQuiz {
        Self::from_envelope(QuizEnvelope {
            metadata: record.metadata,
            questions: record.questions,
        })
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_ids.contains(user_id)
    }

    pub fn metadata(&self) -> QuizMetadata {
        QuizMetadata {
            quiz_id: self.quiz_id.clone(),
            community_id: self.community_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            created_at: self.created_at,
            owner_ids: self.owner_ids.iter().cloned().collect(),
        }
    }

    pub fn to_document(&self) -> QuizDocument {
        QuizDocument {
            quiz_id: self.quiz_id.clone(),
            community_id: self.community_id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            questions: self.questions.iter().map(Question::to_raw).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz: Quiz,
    position: usize,
    answers: AnswerSheet,
}

impl QuizSession {
    pub fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            position: 0,
            answers: AnswerSheet::new(),
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn len(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quiz.questions.is_empty()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> Option<&Question> {
        self.quiz.questions.get(self.position)
    }

    pub fn can_advance(&self) -> bool {
        self.position + 1 < self.len()
    }

    pub fn can_retreat(&self) -> bool {
        self.position > 0
    }

    pub fn advance(&mut self) -> usize {
        if self.can_advance() {
            self.position += 1;
        }
        self.position
    }

    pub fn retreat(&mut self) -> usize {
        if self.can_retreat() {
            self.position -= 1;
        }
        self.position
    }

    pub fn record_answer(&mut self, index: usize, answer: Vec<String>) -> Result<()> {
        if index >= self.len() {
            return Err(SharpError::QuestionOutOfRange {
                index,
                len: self.len(),
            });
        }
        self.answers.record_answer(index, answer);
        Ok(())
    }

    pub fn answer_current(&mut self, answer: Vec<String>) -> Result<()> {
        self.record_answer(self.position, answer)
    }

    pub fn answer_for(&self, index: usize) -> &[String] {
        self.answers.answer_for(index)
    }

    pub fn displayed_answer(&self, index: usize) -> Vec<String> {
        match self.quiz.questions.get(index) {
            Some(q) if !self.answers.is_answered(index) => q.initial_answer(),
            _ => self.answers.answer_for(index).to_vec(),
        }
    }

    pub fn verdict_for(&self, index: usize) -> Option<Verdict> {
        let question = self.quiz.questions.get(index)?;
        Some(grade(question, self.answers.answer_for(index)))
    }

    pub fn score(&self) -> ScoreCard {
        (0..self.len()).filter_map(|i| self.verdict_for(i)).collect()
    }
}
