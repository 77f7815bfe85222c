use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ApiError, TaskApi};
use crate::model::page::{ListKind, Page};
use crate::model::task::{Deadline, TaskId, TaskItem, TaskStatus};

/// Which `TaskApi` method a call went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Fetch,
    Create,
    Delete,
    Status,
    Bookmark,
    Deadline,
}

#[derive(Debug, Default)]
struct Store {
    items: Vec<TaskItem>,
    next_id: i64,
    failures: HashMap<CallKind, VecDeque<ApiError>>,
    hung: HashSet<CallKind>,
    calls: Vec<CallKind>,
}

/// In-process backend with scripted failures, used by `tb replay` and tests.
/// It holds a single list and serves it whichever list kind is asked for.
#[derive(Debug, Default)]
pub struct MemoryApi {
    store: Mutex<Store>,
}

impl MemoryApi {
    pub fn new() -> Self {
        MemoryApi::default()
    }

    /// Seed the server-side list. New ids continue after the largest seeded one.
    pub fn with_items(items: Vec<TaskItem>) -> Self {
        let next_id = items.iter().map(|t| t.id.0).max().unwrap_or(0) + 1;
        MemoryApi {
            store: Mutex::new(Store {
                items,
                next_id,
                ..Store::default()
            }),
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of `kind` fail with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, kind: CallKind, error: ApiError) {
        self.store().failures.entry(kind).or_default().push_back(error);
    }

    /// Calls of `kind` never complete
    pub fn hang(&self, kind: CallKind) {
        self.store().hung.insert(kind);
    }

    pub fn items(&self) -> Vec<TaskItem> {
        self.store().items.clone()
    }

    pub fn calls(&self) -> Vec<CallKind> {
        self.store().calls.clone()
    }

    /// Record the call and decide whether it fails, hangs or proceeds.
    async fn enter(&self, kind: CallKind) -> Result<(), ApiError> {
        let hung = {
            let mut store = self.store();
            store.calls.push(kind);
            if let Some(err) = store.failures.get_mut(&kind).and_then(|q| q.pop_front()) {
                return Err(err);
            }
            store.hung.contains(&kind)
        };
        if hung {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    fn with_item<F>(&self, id: TaskId, f: F) -> Result<(), ApiError>
    where
        F: FnOnce(&mut TaskItem),
    {
        let mut store = self.store();
        let item = store
            .items
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(ApiError::NotFound(id))?;
        f(item);
        Ok(())
    }
}

#[async_trait]
impl TaskApi for MemoryApi {
    async fn fetch_page(&self, _kind: ListKind, page: u32, size: u32) -> Result<Page, ApiError> {
        self.enter(CallKind::Fetch).await?;
        if size == 0 {
            return Err(ApiError::Validation("page size must be positive".into()));
        }
        let store = self.store();
        let total_count = store.items.len();
        let total_pages = total_count.div_ceil(size as usize) as u32;
        let items = store
            .items
            .iter()
            .skip(page as usize * size as usize)
            .take(size as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, total_count, total_pages))
    }

    async fn create_item(&self, content: &str) -> Result<TaskId, ApiError> {
        self.enter(CallKind::Create).await?;
        if content.trim().is_empty() {
            return Err(ApiError::Validation("content must not be empty".into()));
        }
        let mut store = self.store();
        let id = TaskId(store.next_id.max(1));
        store.next_id = id.0 + 1;
        store.items.insert(0, TaskItem::new(id, content));
        Ok(id)
    }

    async fn delete_item(&self, id: TaskId) -> Result<(), ApiError> {
        self.enter(CallKind::Delete).await?;
        let mut store = self.store();
        let index = store
            .items
            .iter()
            .position(|t| t.id == id)
            .ok_or(ApiError::NotFound(id))?;
        store.items.remove(index);
        Ok(())
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), ApiError> {
        self.enter(CallKind::Status).await?;
        self.with_item(id, |t| t.status = status)
    }

    async fn update_bookmark(&self, id: TaskId) -> Result<(), ApiError> {
        self.enter(CallKind::Bookmark).await?;
        self.with_item(id, |t| t.bookmark = !t.bookmark)
    }

    async fn update_deadline(&self, id: TaskId, deadline: Option<Deadline>) -> Result<(), ApiError> {
        self.enter(CallKind::Deadline).await?;
        self.with_item(id, |t| t.deadline = deadline)
    }
}
