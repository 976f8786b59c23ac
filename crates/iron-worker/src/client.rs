//! HTTP client for the worker API.
//!
//! # Example
//!
//! ```rust,no_run
//! use iron_worker::{HttpWorkerClient, Settings, Task, WorkerApi};
//!
//! # async fn example() -> Result<(), iron_worker::ApiError> {
//! let settings = Settings {
//!     project_id: "my-project".into(),
//!     token: "my-token".into(),
//!     ..Settings::default()
//! };
//! let client = HttpWorkerClient::new(settings)?;
//! let ids = client.queue_tasks(&[Task::new("hello", "{}")]).await?;
//! println!("queued {}", ids[0]);
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::api::WorkerApi;
use crate::error::{ApiError, Result};
use crate::settings::Settings;
use crate::types::{
    Code, CodeInfo, DockerCredentials, MessageResponse, ProjectResponse, QueueTasksRequest,
    QueueTasksResponse, Schedule, ScheduleRequest, ScheduleResponse, Task, TaskInfo,
};

/// Default request timeout.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Worker API client over HTTP.
#[derive(Clone)]
pub struct HttpWorkerClient {
    http: reqwest::Client,
    settings: Settings,
}

impl std::fmt::Debug for HttpWorkerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWorkerClient")
            .field("api_root", &self.settings.api_root())
            .field("project_id", &self.settings.project_id)
            .finish_non_exhaustive()
    }
}

impl HttpWorkerClient {
    /// Create a client for the given connection profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_timeout(settings, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_timeout(settings: Settings, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{path}", self.settings.project_url());
        trace!(%method, %url, "building request");
        self.http
            .request(method, url)
            .header(AUTHORIZATION, format!("OAuth {}", self.settings.token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request.header(ACCEPT, "application/json")).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::decoding(e.to_string()))
    }
}

/// Turn a non-success response into [`ApiError::Status`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<MessageResponse>(&body)
        .ok()
        .map(|m| m.msg)
        .filter(|m| !m.is_empty())
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    debug!(status = status.as_u16(), %message, "request rejected");
    Err(ApiError::status(status.as_u16(), message))
}

impl WorkerApi for HttpWorkerClient {
    async fn project_name(&self) -> Result<String> {
        let reply: ProjectResponse = self.send_json(self.request(Method::GET, "")).await?;
        Ok(reply.name)
    }

    async fn queue_tasks(&self, tasks: &[Task]) -> Result<Vec<String>> {
        debug!(count = tasks.len(), "queueing tasks");
        let request = self
            .request(Method::POST, "/tasks")
            .json(&QueueTasksRequest { tasks });
        let reply: QueueTasksResponse = self.send_json(request).await?;
        Ok(reply.tasks.into_iter().map(|t| t.id).collect())
    }

    async fn schedule(&self, schedules: &[Schedule]) -> Result<Vec<String>> {
        debug!(count = schedules.len(), "creating schedules");
        let request = self
            .request(Method::POST, "/schedules")
            .json(&ScheduleRequest { schedules });
        let reply: ScheduleResponse = self.send_json(request).await?;
        Ok(reply.schedules.into_iter().map(|s| s.id).collect())
    }

    async fn task_info(&self, task_id: &str) -> Result<TaskInfo> {
        self.send_json(self.request(Method::GET, &format!("/tasks/{task_id}")))
            .await
    }

    async fn task_log(&self, task_id: &str) -> Result<Vec<u8>> {
        let response = self
            .send(self.request(Method::GET, &format!("/tasks/{task_id}/log")))
            .await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn upload_code(&self, code: &Code, archive: Option<&Path>) -> Result<CodeInfo> {
        let data = serde_json::to_string(code).map_err(|e| ApiError::decoding(e.to_string()))?;
        let mut form = Form::new().text("data", data);

        if let Some(path) = archive {
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map_or_else(|| "code.zip".to_string(), |n| n.to_string_lossy().into_owned());
            debug!(path = %path.display(), size = bytes.len(), "attaching code archive");
            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str("application/zip")?;
            form = form.part("file", part);
        }

        self.send_json(self.request(Method::POST, "/codes").multipart(form))
            .await
    }

    async fn add_docker_credentials(&self, credentials: &DockerCredentials) -> Result<String> {
        let request = self
            .request(Method::POST, "/credentials")
            .header(CONTENT_TYPE, "application/json")
            .json(credentials);
        let reply: MessageResponse = self.send_json(request).await?;
        Ok(reply.msg)
    }
}
