//! Persistence service interface.
//!
//! The core reads and writes through `StateRepository`, which layers the
//! typed layout (`focusState`, `domainContextMap`, `contextHistory`) over any
//! `KeyValueStore`.

mod memory;

use std::{collections::BTreeMap, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::models::{Category, ContextHistoryEntry, FocusState, FocusStatePatch};

pub use memory::MemoryStore;

pub const FOCUS_STATE_KEY: &str = "focusState";
pub const DOMAIN_MAP_KEY: &str = "domainContextMap";
pub const HISTORY_KEY: &str = "contextHistory";

pub const DEFAULT_HISTORY_CAP: usize = 100;

pub type DomainMap = BTreeMap<String, Category>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Publishes a `StoreChange` once the write is durable.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

#[derive(Clone)]
pub struct StateRepository {
    store: Arc<dyn KeyValueStore>,
    history_cap: usize,
}

impl StateRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            history_cap: DEFAULT_HISTORY_CAP,
        }
    }

    pub fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap.max(1);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }

    async fn read<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self
            .store
            .get(key)
            .await
            .with_context(|| format!("failed to read '{key}'"))?
        {
            Some(value) => serde_json::from_value(value)
                .with_context(|| format!("stored '{key}' has an unexpected shape")),
            None => Ok(T::default()),
        }
    }

    async fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)
            .with_context(|| format!("failed to serialize '{key}'"))?;
        self.store
            .set(key, json)
            .await
            .with_context(|| format!("failed to write '{key}'"))
    }

    /// Missing state reads as an inactive session.
    pub async fn get_state(&self) -> Result<FocusState> {
        self.read(FOCUS_STATE_KEY).await
    }

    /// Read-modify-write of the whole object. Assumes this process is the
    /// only writer of `focusState`.
    pub async fn set_state(&self, patch: FocusStatePatch) -> Result<FocusState> {
        let mut state = self.get_state().await?;
        state.merge(patch);
        self.write(FOCUS_STATE_KEY, &state).await?;
        Ok(state)
    }

    pub async fn get_domain_map(&self) -> Result<DomainMap> {
        self.read(DOMAIN_MAP_KEY).await
    }

    pub async fn set_domain_map(&self, map: &DomainMap) -> Result<()> {
        self.write(DOMAIN_MAP_KEY, map).await
    }

    pub async fn get_history(&self) -> Result<Vec<ContextHistoryEntry>> {
        self.read(HISTORY_KEY).await
    }

    pub async fn push_history(&self, entry: ContextHistoryEntry) -> Result<()> {
        let mut history = self.get_history().await?;
        history.push(entry);
        if history.len() > self.history_cap {
            let overflow = history.len() - self.history_cap;
            history.drain(..overflow);
        }
        self.write(HISTORY_KEY, &history).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn repository() -> (Arc<MemoryStore>, StateRepository) {
        let store = Arc::new(MemoryStore::new());
        let repo = StateRepository::new(store.clone());
        (store, repo)
    }

    #[tokio::test]
    async fn missing_state_reads_as_inactive() {
        let (_, repo) = repository();
        let state = repo.get_state().await.unwrap();
        assert!(!state.active);
        assert!(state.allowed_contexts.is_empty());
    }

    #[tokio::test]
    async fn set_state_merges_into_stored_object() {
        let (_, repo) = repository();
        repo.set_state(FocusStatePatch {
            active: Some(true),
            allowed_contexts: Some([Category::Work].into_iter().collect()),
            ..Default::default()
        })
        .await
        .unwrap();

        let state = repo
            .set_state(FocusStatePatch {
                end_time: Some(Some(Utc::now())),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(state.active);
        assert!(state.end_time.is_some());
        assert_eq!(repo.get_state().await.unwrap(), state);
    }

    #[tokio::test]
    async fn write_failures_propagate() {
        let (store, repo) = repository();
        store.fail_writes(true);
        let err = repo.set_state(FocusStatePatch::ended()).await.unwrap_err();
        assert!(err.to_string().contains("focusState"));
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let (_, repo) = repository();
        let repo = repo.with_history_cap(3);
        for index in 0..5 {
            repo.push_history(ContextHistoryEntry {
                context: Category::News,
                url: format!("https://example.com/{index}"),
                timestamp: Utc::now(),
                confidence: 0.9,
            })
            .await
            .unwrap();
        }

        let history = repo.get_history().await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].url, "https://example.com/2");
        assert_eq!(history[2].url, "https://example.com/4");
    }

    #[tokio::test]
    async fn writes_publish_change_notifications() {
        let (_, repo) = repository();
        let mut changes = repo.subscribe();
        repo.set_domain_map(&DomainMap::from([("youtube.com".into(), Category::Entertainment)]))
            .await
            .unwrap();
        assert_eq!(changes.recv().await.unwrap().key, DOMAIN_MAP_KEY);
    }
}
