//! Memory store contract and its default in-memory implementation.

use super::error::MemoryError;
use super::note::{MemoryNote, SourceType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Optional filters applied before ranking in [`MemoryStore::search`].
#[derive(Debug, Clone, Default)]
pub struct MemorySearchOptions {
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub task_id: Option<String>,
    pub source_types: Vec<SourceType>,
    pub tags: Vec<String>,
    pub min_importance: u8,
}

impl MemorySearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_source_types(mut self, source_types: Vec<SourceType>) -> Self {
        self.source_types = source_types;
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_min_importance(mut self, min_importance: u8) -> Self {
        self.min_importance = min_importance;
        self
    }

    fn matches(&self, note: &MemoryNote) -> bool {
        if let Some(user_id) = &self.user_id {
            if !user_id.is_empty() && note.user_id.as_deref() != Some(user_id.as_str()) {
                return false;
            }
        }
        if let Some(session_id) = &self.session_id {
            if !session_id.is_empty() && note.session_id.as_deref() != Some(session_id.as_str()) {
                return false;
            }
        }
        if let Some(task_id) = &self.task_id {
            if !task_id.is_empty() && note.task_id.as_deref() != Some(task_id.as_str()) {
                return false;
            }
        }
        if !self.source_types.is_empty() && !self.source_types.contains(&note.source_type) {
            return false;
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|t| note.tags.contains(t)) {
            return false;
        }
        if self.min_importance > 0 && note.importance < self.min_importance {
            return false;
        }
        true
    }
}

/// Long-term note store. The default implementation serializes its own
/// internal state and treats `search` as a snapshot read.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn write(&self, note: MemoryNote) -> Result<(), MemoryError>;
    async fn get(&self, id: &str) -> Result<MemoryNote, MemoryError>;
    /// Idempotent: a no-op if `id` is absent.
    async fn delete(&self, id: &str) -> Result<bool, MemoryError>;
    async fn search(
        &self,
        query: &str,
        limit: usize,
        options: &MemorySearchOptions,
    ) -> Result<Vec<MemoryNote>, MemoryError>;
}

fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Default [`MemoryStore`]: a keyed mapping guarded by a reader-writer lock,
/// with insertion order preserved as the final, deterministic tie-break.
#[derive(Clone, Default)]
pub struct InMemoryMemoryStore {
    notes: Arc<RwLock<HashMap<String, MemoryNote>>>,
    order: Arc<RwLock<Vec<String>>>,
}

impl InMemoryMemoryStore {
    pub fn new() -> Self {
        Self {
            notes: Arc::new(RwLock::new(HashMap::new())),
            order: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

#[async_trait]
impl MemoryStore for InMemoryMemoryStore {
    async fn write(&self, note: MemoryNote) -> Result<(), MemoryError> {
        let id = note.id.as_str().to_string();
        let mut notes = self.notes.write().await;
        let is_new = !notes.contains_key(&id);
        notes.insert(id.clone(), note);
        drop(notes);
        if is_new {
            self.order.write().await.push(id);
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<MemoryNote, MemoryError> {
        self.notes
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| MemoryError::not_found(id))
    }

    async fn delete(&self, id: &str) -> Result<bool, MemoryError> {
        let removed = self.notes.write().await.remove(id).is_some();
        if removed {
            self.order.write().await.retain(|existing| existing != id);
        }
        Ok(removed)
    }

    async fn search(
        &self,
        query: &str,
        limit: usize,
        options: &MemorySearchOptions,
    ) -> Result<Vec<MemoryNote>, MemoryError> {
        let notes = self.notes.read().await;
        let order = self.order.read().await;

        let candidates: Vec<&MemoryNote> = order
            .iter()
            .filter_map(|id| notes.get(id))
            .filter(|note| options.matches(note))
            .collect();

        let trimmed_query = query.trim();
        let is_wildcard = trimmed_query.is_empty() || trimmed_query == "*";

        let mut ranked: Vec<(&MemoryNote, u64)> = if is_wildcard {
            candidates.into_iter().map(|n| (n, 0u64)).collect()
        } else {
            let query_tokens = tokenize(trimmed_query);
            candidates
                .into_iter()
                .filter_map(|note| {
                    let note_tokens = tokenize(&note.searchable_text());
                    let score = query_tokens.intersection(&note_tokens).count() as u64;
                    if score > 0 {
                        Some((note, score))
                    } else {
                        None
                    }
                })
                .collect()
        };

        ranked.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .cmp(score_a)
                .then(b.importance.cmp(&a.importance))
                .then(b.updated_at.cmp(&a.updated_at))
        });

        Ok(ranked
            .into_iter()
            .take(limit)
            .map(|(note, _)| note.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, content: &str, importance: u8) -> MemoryNote {
        MemoryNote::new(id, SourceType::Fact, content, "summary").with_importance(importance)
    }

    #[tokio::test]
    async fn write_then_get_round_trips() {
        let store = InMemoryMemoryStore::new();
        store.write(note("n1", "dark mode", 4)).await.unwrap();

        let got = store.get("n1").await.unwrap();
        assert_eq!(got.raw_content, "dark mode");
        assert_eq!(got.importance, 4);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryMemoryStore::new();
        let err = store.get("missing").await.unwrap_err();
        assert!(matches!(err, MemoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryMemoryStore::new();
        store.write(note("n1", "x", 2)).await.unwrap();
        assert!(store.delete("n1").await.unwrap());
        assert!(!store.delete("n1").await.unwrap());
    }

    #[tokio::test]
    async fn search_ranks_by_token_overlap_then_importance() {
        let store = InMemoryMemoryStore::new();
        store.write(note("n1", "user prefers dark mode", 2)).await.unwrap();
        store.write(note("n2", "user prefers dark theme", 5)).await.unwrap();
        store.write(note("n3", "completely unrelated note", 1)).await.unwrap();

        let results = store
            .search("dark mode", 10, &MemorySearchOptions::new())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id.as_str(), "n1");
        assert_eq!(results[1].id.as_str(), "n2");
    }

    #[tokio::test]
    async fn wildcard_query_orders_by_importance_desc() {
        let store = InMemoryMemoryStore::new();
        store.write(note("n1", "a", 1)).await.unwrap();
        store.write(note("n2", "b", 5)).await.unwrap();

        let results = store.search("*", 10, &MemorySearchOptions::new()).await.unwrap();
        assert_eq!(results[0].id.as_str(), "n2");
    }

    #[tokio::test]
    async fn search_respects_filters() {
        let store = InMemoryMemoryStore::new();
        store
            .write(note("n1", "dark mode", 3).with_user_id("alice"))
            .await
            .unwrap();
        store
            .write(note("n2", "dark mode", 3).with_user_id("bob"))
            .await
            .unwrap();

        let results = store
            .search("dark", 10, &MemorySearchOptions::new().with_user_id("alice"))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_str(), "n1");
    }
}
