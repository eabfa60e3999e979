use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    answers: HashMap<usize, Vec<String>>,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_answer(&mut self, index: usize, answer: Vec<String>) {
        self.answers.insert(index, answer);
    }

    pub fn answer_for(&self, index: usize) -> &[String] {
        self.answers.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_answered(&self, index: usize) -> bool {
        !self.answer_for(index).is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_empty()).count()
    }

    pub fn clear(&mut self) {
        self.answers.clear();
    }
}

pub fn toggle_choice(current: &[String], option: &str) -> Vec<String> {
    if current.iter().any(|c| c == option) {
        current.iter().filter(|c| *c != option).cloned().collect()
    } else {
        let mut next = current.to_vec();
        next.push(option.to_string());
        next
    }
}

/// Drag-and-drop reorder. A `from` outside the list leaves it unchanged and
/// `to` is clamped to the end.
pub fn move_item(current: &[String], from: usize, to: usize) -> Vec<String> {
    let mut next = current.to_vec();
    if from >= next.len() {
        return next;
    }
    let item = next.remove(from);
    let to = to.min(next.len());
    next.insert(to, item);
    next
}

pub fn text_answer(text: impl Into<String>) -> Vec<String> {
    vec![text.into()]
}
