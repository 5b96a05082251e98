// src/store.rs
//! Persistence port for generated content, plus an in-process implementation.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;
use crate::generate::GeneratedContent;

pub type ContentId = u64;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredContent {
    pub id: ContentId,
    #[serde(flatten)]
    pub content: GeneratedContent,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Case-insensitive exact title lookup.
    async fn find_by_title_ci(&self, title: &str) -> Result<Option<StoredContent>, StoreError>;
    async fn insert(&self, content: GeneratedContent) -> Result<ContentId, StoreError>;
}

fn title_key(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[derive(Debug, Default)]
pub struct MemoryContentStore {
    inner: Mutex<Vec<StoredContent>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<StoredContent> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_by_title_ci(&self, title: &str) -> Result<Option<StoredContent>, StoreError> {
        let key = title_key(title);
        let guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Ok(guard
            .iter()
            .find(|r| title_key(&r.content.title) == key)
            .cloned())
    }

    async fn insert(&self, content: GeneratedContent) -> Result<ContentId, StoreError> {
        let mut guard = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let id = guard.last().map(|r| r.id + 1).unwrap_or(1);
        guard.push(StoredContent { id, content });
        Ok(id)
    }
}
