//! REST client for the task server.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ApiError, TaskApi};
use crate::model::config::ApiConfig;
use crate::model::page::{ListKind, Page};
use crate::model::task::{Deadline, TaskId, TaskItem, TaskStatus};

/// Envelope every endpoint answers with
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    #[serde(default)]
    is_success: bool,
    #[serde(default)]
    message: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemResponse {
    todo_id: i64,
    #[serde(default)]
    content: String,
    #[serde(default)]
    todo_status: TaskStatus,
    #[serde(default)]
    is_bookmark: bool,
    #[serde(default)]
    d_day: Option<i64>,
    #[serde(default)]
    deadline: Option<String>,
    #[serde(default)]
    category_id: Option<i64>,
}

impl From<ItemResponse> for TaskItem {
    fn from(r: ItemResponse) -> Self {
        // Prefer the absolute date; fall back to the relative day count
        let deadline = r
            .deadline
            .as_deref()
            .and_then(|s| s.parse::<Deadline>().ok())
            .or(r.d_day.map(Deadline::Days));
        TaskItem {
            id: TaskId(r.todo_id),
            content: r.content,
            status: r.todo_status,
            bookmark: r.is_bookmark,
            deadline,
            category: r.category_id.map(crate::model::task::CategoryId),
        }
    }
}

/// Paged list body; the backlog and today endpoints differ only in the
/// name of the item array
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    total_count: usize,
    #[serde(default)]
    total_page_count: u32,
    #[serde(default, rename = "backlogs", alias = "todays")]
    items: Vec<ItemResponse>,
}

fn list_path(kind: ListKind, page: u32, size: u32) -> String {
    let resource = match kind {
        ListKind::Backlog => "backlogs",
        ListKind::Today => "todays",
    };
    format!("/{}?page={}&size={}", resource, page, size)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedResponse {
    todo_id: i64,
}

#[derive(Serialize)]
struct ContentRequest<'a> {
    content: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    todo_status: TaskStatus,
}

#[derive(Serialize)]
struct DeadlineRequest {
    deadline: Option<String>,
}

/// `TaskApi` over HTTP+JSON
pub struct HttpApi {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(config: &ApiConfig) -> Self {
        HttpApi {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and unwrap the envelope. `target` names the item the
    /// call is about so a 404 can be reported against it.
    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        target: Option<TaskId>,
    ) -> Result<Option<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(method = method.as_str(), %url, "api request");
        let mut req = self.client.request(method, &url);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }
        let res = req
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&text)
                .map(|r| r.message)
                .unwrap_or(text);
            tracing::warn!(status = status.as_u16(), %message, "api request failed");
            return Err(match (status, target) {
                (StatusCode::NOT_FOUND, Some(id)) => ApiError::NotFound(id),
                (StatusCode::BAD_REQUEST, _) => ApiError::Validation(message),
                _ => ApiError::Server {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        if text.trim().is_empty() {
            return Ok(None);
        }
        let envelope: ApiResponse<T> = serde_json::from_str(&text).map_err(|e| ApiError::Server {
            status: status.as_u16(),
            message: format!("malformed response: {}", e),
        })?;
        if !envelope.is_success {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: envelope.message,
            });
        }
        Ok(envelope.result)
    }
}

#[async_trait]
impl TaskApi for HttpApi {
    async fn fetch_page(&self, kind: ListKind, page: u32, size: u32) -> Result<Page, ApiError> {
        let path = list_path(kind, page, size);
        let list: Option<ListResponse> = self.send::<(), _>(Method::GET, &path, None, None).await?;
        let list = list.ok_or_else(|| ApiError::Server {
            status: 200,
            message: format!("missing {} list", kind.name()),
        })?;
        Ok(Page::new(
            list.items.into_iter().map(TaskItem::from).collect(),
            list.total_count,
            list.total_page_count,
        ))
    }

    async fn create_item(&self, content: &str) -> Result<TaskId, ApiError> {
        if content.trim().is_empty() {
            return Err(ApiError::Validation("content must not be empty".into()));
        }
        let created: Option<CreatedResponse> = self
            .send(Method::POST, "/backlog", Some(&ContentRequest { content }), None)
            .await?;
        created
            .map(|c| TaskId(c.todo_id))
            .ok_or_else(|| ApiError::Server {
                status: 200,
                message: "missing created id".into(),
            })
    }

    async fn delete_item(&self, id: TaskId) -> Result<(), ApiError> {
        let path = format!("/todo/{}", id);
        self.send::<(), serde_json::Value>(Method::DELETE, &path, None, Some(id))
            .await?;
        Ok(())
    }

    async fn update_status(&self, id: TaskId, status: TaskStatus) -> Result<(), ApiError> {
        let path = format!("/todo/{}/achieve", id);
        let body = StatusRequest { todo_status: status };
        self.send::<_, serde_json::Value>(Method::PATCH, &path, Some(&body), Some(id))
            .await?;
        Ok(())
    }

    async fn update_bookmark(&self, id: TaskId) -> Result<(), ApiError> {
        let path = format!("/todo/{}/bookmark", id);
        self.send::<(), serde_json::Value>(Method::PATCH, &path, None, Some(id))
            .await?;
        Ok(())
    }

    async fn update_deadline(&self, id: TaskId, deadline: Option<Deadline>) -> Result<(), ApiError> {
        let path = format!("/todo/{}/deadline", id);
        let today = chrono::Local::now().date_naive();
        let date = match deadline {
            Some(d) => Some(d.to_date(today).ok_or_else(|| {
                ApiError::Validation(format!("deadline out of range: {}", d.d_day_label(today)))
            })?),
            None => None,
        };
        let body = DeadlineRequest {
            deadline: date.map(|d| d.format("%Y-%m-%d").to_string()),
        };
        self.send::<_, serde_json::Value>(Method::PATCH, &path, Some(&body), Some(id))
            .await?;
        Ok(())
    }
}
