use crate::community::Community;
use crate::question::RawQuestion;
use crate::quiz::{QuizEnvelope, QuizMetadata, QuizRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::{fs, path::Path};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredQuiz {
    pub metadata: QuizMetadata,
    pub questions: Vec<RawQuestion>,
}

impl StoredQuiz {
    pub fn envelope(&self) -> QuizEnvelope {
        QuizEnvelope {
            metadata: self.metadata.clone(),
            questions: self.questions.clone(),
        }
    }

    pub fn record(&self) -> QuizRecord {
        QuizRecord {
            metadata: self.metadata.clone(),
            questions: self.questions.clone(),
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.metadata.owner_ids.iter().any(|o| o == user_id)
    }
}

pub struct InMemoryDb {
    pub communities: RwLock<HashMap<String, Community>>,
    /// Keyed by `(community_id, quiz_id)`.
    pub quizzes: RwLock<HashMap<(String, String), StoredQuiz>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PersistentSnapshot {
    communities: Vec<Community>,
    quizzes: Vec<StoredQuiz>,
}

impl InMemoryDb {
    pub fn new(snapshot_path: Option<&str>) -> Self {
        let snapshot = snapshot_path
            .and_then(|path| {
                let raw = fs::read_to_string(path).ok()?;
                match serde_json::from_str::<PersistentSnapshot>(&raw) {
                    Ok(s) => {
                        info!(%path, communities = s.communities.len(), quizzes = s.quizzes.len(), "loaded local snapshot");
                        Some(s)
                    }
                    Err(err) => {
                        warn!("failed to read local snapshot {}: {}", path, err);
                        None
                    }
                }
            })
            .unwrap_or_default();

        let communities = snapshot
            .communities
            .into_iter()
            .map(|c| (c.community_id.clone(), c))
            .collect();
        let quizzes = snapshot
            .quizzes
            .into_iter()
            .map(|q| ((q.metadata.community_id.clone(), q.metadata.quiz_id.clone()), q))
            .collect();

        Self {
            communities: RwLock::new(communities),
            quizzes: RwLock::new(quizzes),
        }
    }

    async fn snapshot(&self) -> PersistentSnapshot {
        PersistentSnapshot {
            communities: self.communities.read().await.values().cloned().collect(),
            quizzes: self.quizzes.read().await.values().cloned().collect(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<InMemoryDb>,
    pub local_state_path: Option<String>,
    persist_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(local_state_path: Option<String>) -> Self {
        Self {
            db: Arc::new(InMemoryDb::new(local_state_path.as_deref())),
            local_state_path,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn persist_core_data(&self) -> anyhow::Result<()> {
        let Some(path) = self.local_state_path.as_ref() else {
            return Ok(());
        };
        // snapshot and write under one lock so an older snapshot never lands last
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.db.snapshot().await;
        let serialized = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, serialized).await?;
        Ok(())
    }

    pub async fn persist_or_warn(&self, action: &str) {
        if let Err(err) = self.persist_core_data().await {
            warn!("failed to persist local state after {}: {}", action, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::community::NewCommunity;

    #[tokio::test]
    async fn snapshot_survives_restart() {
        let path = std::env::temp_dir().join(format!("sharp-state-{}.json", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();

        let state = AppState::new(Some(path.clone()));
        let community = NewCommunity::new("Rust", "Systems").into_community("alice");
        let id = community.community_id.clone();
        state.db.communities.write().await.insert(id.clone(), community);
        state.persist_core_data().await.unwrap();

        let reloaded = AppState::new(Some(path.clone()));
        assert!(reloaded.db.communities.read().await.contains_key(&id));
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writes_keep_the_latest_snapshot() {
        let path = std::env::temp_dir().join(format!("sharp-state-{}.json", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();
        let state = AppState::new(Some(path.clone()));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let state = state.clone();
            tasks.push(tokio::spawn(async move {
                let community = NewCommunity::new(format!("c{i}"), "load").into_community("alice");
                state
                    .db
                    .communities
                    .write()
                    .await
                    .insert(community.community_id.clone(), community);
                state.persist_core_data().await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let reloaded = AppState::new(Some(path.clone()));
        assert_eq!(reloaded.db.communities.read().await.len(), 16);
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn no_path_means_no_persistence() {
        let state = AppState::new(None);
        state.persist_core_data().await.unwrap();
        assert!(state.db.quizzes.read().await.is_empty());
    }
}
