use crate::question::{Question, QuestionKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
    Ungraded,
}

impl Verdict {
    fn from_bool(correct: bool) -> Self {
        if correct {
            Verdict::Correct
        } else {
            Verdict::Incorrect
        }
    }
}

fn normalize_text(value: &str) -> String {
    value.trim().to_lowercase()
}

fn text_matches(expected: &[String], submitted: &str) -> bool {
    let submitted = normalize_text(submitted);
    expected.iter().any(|e| normalize_text(e) == submitted)
}

pub fn grade(question: &Question, submitted: &[String]) -> Verdict {
    if submitted.is_empty() {
        return Verdict::Ungraded;
    }
    match &question.kind {
        QuestionKind::MultipleChoice { .. } => {
            let expected: HashSet<&str> = question.expected.iter().map(String::as_str).collect();
            let actual: HashSet<&str> = submitted.iter().map(String::as_str).collect();
            Verdict::from_bool(expected == actual)
        }
        QuestionKind::Flashcard => Verdict::from_bool(text_matches(&question.expected, &submitted[0])),
        QuestionKind::LongForm => {
            if question.expected.iter().all(|e| e.trim().is_empty()) {
                Verdict::Ungraded
            } else {
                Verdict::from_bool(text_matches(&question.expected, &submitted[0]))
            }
        }
        QuestionKind::ItemOrdering { .. } => Verdict::from_bool(question.expected.as_slice() == submitted),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub correct: u32,
    pub incorrect: u32,
    pub ungraded: u32,
}

impl ScoreCard {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Correct => self.correct += 1,
            Verdict::Incorrect => self.incorrect += 1,
            Verdict::Ungraded => self.ungraded += 1,
        }
    }

    pub fn graded(&self) -> u32 {
        self.correct + self.incorrect
    }

    pub fn correct_pct(&self) -> f64 {
        let total = self.graded();
        if total == 0 {
            0.0
        } else {
            (self.correct as f64) * 100.0 / (total as f64)
        }
    }
}

impl FromIterator<Verdict> for ScoreCard {
    fn from_iter<I: IntoIterator<Item = Verdict>>(iter: I) -> Self {
        let mut card = ScoreCard::default();
        for verdict in iter {
            card.record(verdict);
        }
        card
    }
}
