use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DISPLAY_KEYWORDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub community_id: String,
    pub community_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub owner_ids: BTreeSet<String>,
}

impl Community {
    pub fn join(&mut self, user_id: &str) -> bool {
        self.members.insert(user_id.to_string())
    }

    pub fn leave(&mut self, user_id: &str) -> bool {
        self.members.remove(user_id)
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_ids.contains(user_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn display_keywords(&self) -> &[String] {
        &self.keywords[..self.keywords.len().min(DISPLAY_KEYWORDS)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCommunity {
    pub community_id: String,
    pub community_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl NewCommunity {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            community_id: uuid::Uuid::new_v4().to_string(),
            community_name: name.into(),
            description: description.into(),
            members: Vec::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn into_community(self, creator: &str) -> Community {
        let mut members: BTreeSet<String> = self.members.into_iter().collect();
        members.insert(creator.to_string());
        Community {
            community_id: self.community_id,
            community_name: self.community_name,
            description: self.description,
            members,
            keywords: self.keywords,
            owner_ids: BTreeSet::from([creator.to_string()]),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunityList {
    pub communities: Vec<Community>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rustaceans() -> Community {
        NewCommunity::new("Rustaceans", "Systems programming")
            .with_keywords(["rust", "async", "tokio", "serde", "axum", "tower", "hyper"])
            .into_community("alice")
    }

    #[test]
    fn creator_owns_and_joins() {
        let c = rustaceans();
        assert!(c.is_owned_by("alice"));
        assert!(c.is_member("alice"));
        assert_eq!(c.member_count(), 1);
    }

    #[test]
    fn join_and_leave_are_set_operations() {
        let mut c = rustaceans();
        assert!(c.join("bob"));
        assert!(!c.join("bob"));
        assert_eq!(c.member_count(), 2);
        assert!(c.leave("bob"));
        assert!(!c.leave("bob"));
        assert!(!c.is_member("bob"));
    }

    #[test]
    fn keywords_display_first_five_in_insertion_order() {
        let c = rustaceans();
        assert_eq!(c.display_keywords(), ["rust", "async", "tokio", "serde", "axum"]);
        let mut short = c.clone();
        short.keywords.truncate(2);
        assert_eq!(short.display_keywords(), ["rust", "async"]);
    }

    #[test]
    fn members_deserialize_from_array() {
        let c: Community = serde_json::from_value(serde_json::json!({
            "community_id": "c1",
            "community_name": "Math",
            "members": ["b", "a", "a"],
            "owner_ids": ["a"]
        }))
        .unwrap();
        assert_eq!(c.member_count(), 2);
        assert!(c.keywords.is_empty());
        assert!(c.display_keywords().is_empty());
    }
}
