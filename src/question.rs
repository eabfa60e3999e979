use crate::error::{Result, SharpError, ValidationIssue};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Flashcard,
    LongForm,
    ItemOrdering,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::Flashcard,
        QuestionType::ItemOrdering,
        QuestionType::LongForm,
        QuestionType::MultipleChoice,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Flashcard => "flashcard",
            QuestionType::LongForm => "long_form",
            QuestionType::ItemOrdering => "item_ordering",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }

    pub fn has_options(self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::ItemOrdering)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice { options: Vec<String> },
    Flashcard,
    LongForm,
    /// `options` is the presentation order; the expected answer is the correct one.
    ItemOrdering { options: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renderer {
    ChoiceButtons,
    FlashcardFlip,
    TextArea,
    DraggableList,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub expected: Vec<String>,
    pub kind: QuestionKind,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::Flashcard => QuestionType::Flashcard,
            QuestionKind::LongForm => QuestionType::LongForm,
            QuestionKind::ItemOrdering { .. } => QuestionType::ItemOrdering,
        }
    }

    pub fn options(&self) -> &[String] {
        match &self.kind {
            QuestionKind::MultipleChoice { options } | QuestionKind::ItemOrdering { options } => options.as_slice(),
            QuestionKind::Flashcard | QuestionKind::LongForm => &[],
        }
    }

    pub fn renderer(&self) -> Renderer {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => Renderer::ChoiceButtons,
            QuestionKind::Flashcard => Renderer::FlashcardFlip,
            QuestionKind::LongForm => Renderer::TextArea,
            QuestionKind::ItemOrdering { .. } => Renderer::DraggableList,
        }
    }

    pub fn initial_answer(&self) -> Vec<String> {
        match &self.kind {
            QuestionKind::ItemOrdering { options } => options.clone(),
            QuestionKind::MultipleChoice { .. } | QuestionKind::Flashcard | QuestionKind::LongForm => Vec::new(),
        }
    }

    pub fn check(&self, index: usize, issues: &mut Vec<ValidationIssue>) {
        let field = |name: &str| format!("questions[{index}].{name}");
        if self.prompt.trim().is_empty() {
            issues.push(ValidationIssue::new(field("question_text"), "must not be empty"));
        }
        match &self.kind {
            QuestionKind::MultipleChoice { options } => {
                check_options(options, &field, issues);
                if self.expected.is_empty() {
                    issues.push(ValidationIssue::new(field("answer"), "must not be empty"));
                }
                for (k, answer) in self.expected.iter().enumerate() {
                    if !options.contains(answer) {
                        issues.push(ValidationIssue::new(
                            field(&format!("answer[{k}]")),
                            "must reference an existing option",
                        ));
                    }
                }
            }
            QuestionKind::Flashcard => {
                if self.expected.len() != 1 || self.expected[0].trim().is_empty() {
                    issues.push(ValidationIssue::new(field("answer"), "must contain exactly one value"));
                }
            }
            QuestionKind::LongForm => {
                if self.expected.len() > 1 {
                    issues.push(ValidationIssue::new(field("answer"), "must contain at most one value"));
                }
            }
            QuestionKind::ItemOrdering { options } => {
                check_options(options, &field, issues);
                let mut presented: Vec<&String> = options.iter().collect();
                let mut expected: Vec<&String> = self.expected.iter().collect();
                presented.sort();
                expected.sort();
                if self.expected.is_empty() || presented != expected {
                    issues.push(ValidationIssue::new(field("answer"), "must be a permutation of the options"));
                }
            }
        }
    }

    pub fn to_raw(&self) -> RawQuestion {
        RawQuestion {
            question_id: self.id.clone(),
            question_text: self.prompt.clone(),
            question_type: self.question_type().tag().to_string(),
            options: self.options().to_vec(),
            answer: RawAnswer::Many(self.expected.clone()),
        }
    }
}

fn check_options(options: &[String], field: &dyn Fn(&str) -> String, issues: &mut Vec<ValidationIssue>) {
    if options.is_empty() {
        issues.push(ValidationIssue::new(field("options"), "must contain at least one option"));
    }
    let mut seen = HashSet::new();
    for (j, option) in options.iter().enumerate() {
        if option.trim().is_empty() {
            issues.push(ValidationIssue::new(field(&format!("options[{j}]")), "must not be empty"));
        } else if !seen.insert(option.as_str()) {
            issues.push(ValidationIssue::new(field(&format!("options[{j}]")), "must be unique"));
        }
    }
}

/// `answer` as found on the wire: older records carry a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAnswer {
    One(String),
    Many(Vec<String>),
}

impl Default for RawAnswer {
    fn default() -> Self {
        RawAnswer::Many(Vec::new())
    }
}

impl RawAnswer {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RawAnswer::One(value) => vec![value],
            RawAnswer::Many(values) => values,
        }
    }
}

pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestion {
    pub question_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub question_text: String,
    pub question_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: RawAnswer,
}

impl TryFrom<RawQuestion> for Question {
    type Error = SharpError;

    fn try_from(raw: RawQuestion) -> Result<Self> {
        let Some(question_type) = QuestionType::from_tag(raw.question_type.trim()) else {
            return Err(SharpError::UnsupportedVariant {
                question_id: raw.question_id,
                tag: raw.question_type,
            });
        };
        let kind = match question_type {
            QuestionType::MultipleChoice => QuestionKind::MultipleChoice { options: raw.options },
            QuestionType::Flashcard => QuestionKind::Flashcard,
            QuestionType::LongForm => QuestionKind::LongForm,
            QuestionType::ItemOrdering => QuestionKind::ItemOrdering { options: raw.options },
        };
        Ok(Question {
            id: raw.question_id,
            prompt: raw.question_text,
            expected: raw.answer.into_vec(),
            kind,
        })
    }
}

impl From<&Question> for RawQuestion {
    fn from(question: &Question) -> Self {
        question.to_raw()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPayload {
    pub community_id: String,
    pub quiz_id: String,
    #[serde(flatten)]
    pub question: RawQuestion,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestionList {
    pub questions: Vec<RawQuestion>,
}
