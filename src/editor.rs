use crate::error::{Result, SharpError, ValidationIssue};
use crate::question::{Question, QuestionKind, QuestionType, RawAnswer, RawQuestion};
use crate::quiz::{Quiz, QuizDocument};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftOption {
    pub id: String,
    pub value: String,
}

impl DraftOption {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftQuestion {
    pub question_id: String,
    pub question_type: Option<QuestionType>,
    pub question_text: String,
    pub options: Vec<DraftOption>,
    pub answer: Vec<String>,
}

impl Default for DraftQuestion {
    fn default() -> Self {
        Self {
            question_id: new_id(),
            question_type: None,
            question_text: String::new(),
            options: Vec::new(),
            answer: Vec::new(),
        }
    }
}

impl DraftQuestion {
    pub fn new(question_type: QuestionType) -> Self {
        Self {
            question_type: Some(question_type),
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        let Some(question_type) = self.question_type else {
            return false;
        };
        if self.question_text.is_empty() {
            return false;
        }
        match question_type {
            QuestionType::Flashcard | QuestionType::LongForm => {
                self.answer.first().is_some_and(|a| !a.is_empty())
            }
            QuestionType::MultipleChoice | QuestionType::ItemOrdering => {
                !self.options.is_empty() && self.options.iter().all(|o| !o.value.is_empty())
            }
        }
    }

    pub fn text_answer(&self) -> &str {
        self.answer.first().map(String::as_str).unwrap_or("")
    }

    pub fn set_text_answer(&mut self, text: impl Into<String>) {
        self.answer = vec![text.into()];
    }

    pub fn add_option(&mut self, value: impl Into<String>) -> &str {
        self.options.push(DraftOption::new(value));
        &self.options[self.options.len() - 1].id
    }

    pub fn remove_option(&mut self, option_id: &str) -> Option<DraftOption> {
        let index = self.options.iter().position(|o| o.id == option_id)?;
        Some(self.options.remove(index))
    }

    pub fn option_values(&self) -> Vec<String> {
        self.options.iter().map(|o| o.value.clone()).collect()
    }

    fn from_question(question: &Question) -> Self {
        let (options, answer) = match &question.kind {
            QuestionKind::MultipleChoice { options } => (options.clone(), question.expected.clone()),
            // Authors enter ordering items in their correct order.
            QuestionKind::ItemOrdering { .. } => (question.expected.clone(), Vec::new()),
            QuestionKind::Flashcard | QuestionKind::LongForm => (Vec::new(), question.expected.clone()),
        };
        Self {
            question_id: question.id.clone(),
            question_type: Some(question.question_type()),
            question_text: question.prompt.clone(),
            options: options.into_iter().map(DraftOption::new).collect(),
            answer,
        }
    }

    fn issues(&self, index: usize, issues: &mut Vec<ValidationIssue>) {
        let field = |name: &str| format!("questions[{index}].{name}");
        if self.question_text.trim().is_empty() {
            issues.push(ValidationIssue::new(field("question_text"), "is required"));
        }
        let Some(question_type) = self.question_type else {
            issues.push(ValidationIssue::new(field("question_type"), "is required"));
            return;
        };
        match question_type {
            QuestionType::Flashcard | QuestionType::LongForm => {
                if self.text_answer().trim().is_empty() {
                    issues.push(ValidationIssue::new(field("answer"), "is required"));
                }
            }
            QuestionType::MultipleChoice | QuestionType::ItemOrdering => {
                if self.options.is_empty() {
                    issues.push(ValidationIssue::new(field("options"), "must contain at least one option"));
                }
                let mut seen = HashSet::new();
                for (j, option) in self.options.iter().enumerate() {
                    if option.value.trim().is_empty() {
                        issues.push(ValidationIssue::new(field(&format!("options[{j}]")), "is required"));
                    } else if !seen.insert(option.value.as_str()) {
                        issues.push(ValidationIssue::new(field(&format!("options[{j}]")), "must be unique"));
                    }
                }
                if question_type == QuestionType::MultipleChoice {
                    if self.answer.is_empty() {
                        issues.push(ValidationIssue::new(field("answer"), "must select at least one option"));
                    }
                    for (k, answer) in self.answer.iter().enumerate() {
                        if !self.options.iter().any(|o| o.value == *answer) {
                            issues.push(ValidationIssue::new(
                                field(&format!("answer[{k}]")),
                                "must reference an existing option",
                            ));
                        }
                    }
                }
            }
        }
    }

    fn to_raw<R: Rng + ?Sized>(&self, question_type: QuestionType, rng: &mut R) -> RawQuestion {
        let (options, answer) = match question_type {
            QuestionType::Flashcard | QuestionType::LongForm => (Vec::new(), vec![self.text_answer().to_string()]),
            QuestionType::MultipleChoice => {
                let mut seen = HashSet::new();
                let answer = self.answer.iter().filter(|a| seen.insert(a.as_str())).cloned().collect();
                (self.option_values(), answer)
            }
            QuestionType::ItemOrdering => {
                let answer = self.option_values();
                let mut presented = answer.clone();
                presented.shuffle(rng);
                (presented, answer)
            }
        };
        RawQuestion {
            question_id: self.question_id.clone(),
            question_text: self.question_text.clone(),
            question_type: question_type.tag().to_string(),
            options,
            answer: RawAnswer::Many(answer),
        }
    }
}

type CompletionCallback = Box<dyn FnMut(usize, bool) + Send>;

pub struct QuizEditor {
    community_id: String,
    quiz_id: Option<String>,
    title: String,
    description: String,
    drafts: Vec<DraftQuestion>,
    on_completion: Option<CompletionCallback>,
}

impl QuizEditor {
    pub fn new(community_id: impl Into<String>) -> Self {
        Self {
            community_id: community_id.into(),
            quiz_id: None,
            title: String::new(),
            description: String::new(),
            drafts: Vec::new(),
            on_completion: None,
        }
    }

    pub fn from_quiz(quiz: &Quiz) -> Self {
        Self {
            community_id: quiz.community_id.clone(),
            quiz_id: Some(quiz.quiz_id.clone()),
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            drafts: quiz.questions.iter().map(DraftQuestion::from_question).collect(),
            on_completion: None,
        }
    }

    pub fn on_completion_change(&mut self, callback: impl FnMut(usize, bool) + Send + 'static) {
        self.on_completion = Some(Box::new(callback));
    }

    pub fn is_editing(&self) -> bool {
        self.quiz_id.is_some()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn questions(&self) -> &[DraftQuestion] {
        &self.drafts
    }

    pub fn completion(&self) -> Vec<bool> {
        self.drafts.iter().map(DraftQuestion::is_complete).collect()
    }

    pub fn can_add_question(&self) -> bool {
        self.drafts.iter().all(DraftQuestion::is_complete)
    }

    pub fn add_question(&mut self) -> Result<usize> {
        let incomplete: Vec<ValidationIssue> = self
            .drafts
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.is_complete())
            .map(|(i, _)| ValidationIssue::new(format!("questions[{i}]"), "is incomplete"))
            .collect();
        if !incomplete.is_empty() {
            return Err(SharpError::ValidationIncomplete(incomplete));
        }
        self.drafts.push(DraftQuestion::default());
        let index = self.drafts.len() - 1;
        self.notify(index);
        Ok(index)
    }

    pub fn remove_question(&mut self, index: usize) -> Result<DraftQuestion> {
        self.check_index(index)?;
        Ok(self.drafts.remove(index))
    }

    pub fn set_question_type(&mut self, index: usize, question_type: QuestionType) -> Result<bool> {
        self.edit_question(index, |draft| {
            if draft.question_type != Some(question_type) {
                draft.question_type = Some(question_type);
                draft.options.clear();
                draft.answer.clear();
            }
        })
    }

    pub fn edit_question(&mut self, index: usize, edit: impl FnOnce(&mut DraftQuestion)) -> Result<bool> {
        self.check_index(index)?;
        edit(&mut self.drafts[index]);
        Ok(self.notify(index))
    }

    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        if self.title.trim().is_empty() {
            issues.push(ValidationIssue::new("title", "is required"));
        }
        if self.description.trim().is_empty() {
            issues.push(ValidationIssue::new("description", "is required"));
        }
        let mut ids = HashSet::new();
        for (i, draft) in self.drafts.iter().enumerate() {
            if !ids.insert(draft.question_id.as_str()) {
                issues.push(ValidationIssue::new(format!("questions[{i}].question_id"), "must be unique"));
            }
            draft.issues(i, &mut issues);
        }
        issues
    }

    pub fn build(&self) -> Result<QuizDocument> {
        self.build_with_rng(&mut rand::thread_rng())
    }

    pub fn build_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<QuizDocument> {
        let issues = self.validate();
        if !issues.is_empty() {
            return Err(SharpError::ValidationIncomplete(issues));
        }
        let questions = self
            .drafts
            .iter()
            .filter_map(|d| d.question_type.map(|t| d.to_raw(t, rng)))
            .collect();
        Ok(QuizDocument {
            quiz_id: self.quiz_id.clone().unwrap_or_else(new_id),
            community_id: self.community_id.clone(),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            questions,
        })
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.drafts.len() {
            Ok(())
        } else {
            Err(SharpError::QuestionOutOfRange {
                index,
                len: self.drafts.len(),
            })
        }
    }

    fn notify(&mut self, index: usize) -> bool {
        let complete = self.drafts[index].is_complete();
        if let Some(callback) = self.on_completion.as_mut() {
            callback(index, complete);
        }
        complete
    }
}
