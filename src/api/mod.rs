//! Remote task service seam.

pub mod http;
pub mod memory;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::page::{ListKind, Page};
use crate::model::task::{Deadline, TaskId, TaskStatus};

pub use http::HttpApi;
pub use memory::{CallKind, MemoryApi};

/// Failures a remote call can report
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(TaskId),
}

impl ApiError {
    /// Short label for notices and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network",
            ApiError::Server { .. } => "server",
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
        }
    }
}

/// The backend a board talks to
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// One page of the `kind` list
    async fn fetch_page(&self, kind: ListKind, page: u32, size: u32) -> Result<Page, ApiError>;

    /// Create an item, returning the id the server assigned
    async fn create_item(&self, content: &str) -> Result<TaskId, ApiError>;

    async fn delete_item(&self, id: TaskId) -> Result<(), ApiError>;

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), ApiError>;

    /// Toggle the bookmark flag
    async fn update_bookmark(&self, id: TaskId) -> Result<(), ApiError>;

    async fn update_deadline(&self, id: TaskId, deadline: Option<Deadline>) -> Result<(), ApiError>;
}
