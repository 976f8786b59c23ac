//! Request and response bodies of the worker API.
//!
//! Optional fields are skipped when `None` so the service applies its own
//! defaults instead of receiving an explicit zero.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immediate execution request against a code package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Code package name.
    pub code_name: String,
    /// Opaque payload handed to the task.
    pub payload: String,
    /// Queue priority (0, 1 or 2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Maximum run time in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Delay before the task becomes runnable, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    /// Target cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

impl Task {
    /// Create a task with the given code name and payload.
    #[must_use]
    pub fn new(code_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            code_name: code_name.into(),
            payload: payload.into(),
            priority: None,
            timeout: None,
            delay: None,
            cluster: None,
        }
    }
}

/// A recurring or deferred execution plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Code package name.
    pub code_name: String,
    /// Opaque payload handed to every run.
    pub payload: String,
    /// Queue priority (0, 1 or 2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Maximum run time of each task in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    /// Delay before the first run, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    /// Total number of runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_times: Option<u64>,
    /// Interval between runs, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_every: Option<u64>,
    /// First run not before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<DateTime<Utc>>,
    /// No runs after this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_at: Option<DateTime<Utc>>,
    /// Maximum number of concurrently running tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<u64>,
    /// Target cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

impl Schedule {
    /// Create a schedule with the given code name and payload.
    #[must_use]
    pub fn new(code_name: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            code_name: code_name.into(),
            payload: payload.into(),
            priority: None,
            timeout: None,
            delay: None,
            run_times: None,
            run_every: None,
            start_at: None,
            end_at: None,
            max_concurrency: None,
            cluster: None,
        }
    }
}

/// Code package metadata sent on upload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Code {
    /// Code package name.
    pub name: String,
    /// Docker image reference.
    pub image: String,
    /// Command run inside the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Maximum concurrently running tasks of this package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<u64>,
    /// Automatic retries on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u64>,
    /// Seconds between retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries_delay: Option<u64>,
    /// Configuration blob made available to every task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Host name for long-running services.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Code package as returned by the service after upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeInfo {
    /// Code package id.
    pub id: String,
    /// Code package name.
    #[serde(default)]
    pub name: Option<String>,
    /// Revision number.
    #[serde(default)]
    pub rev: Option<u64>,
    /// Host the package is served at, if any.
    #[serde(default)]
    pub host: Option<String>,
}

/// Docker registry credentials stored with the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerCredentials {
    /// Registry URL.
    pub url: String,
    /// Base64 `username:password` token.
    pub auth: String,
    /// Account email.
    pub email: String,
}

/// Task details returned by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Task id.
    pub id: String,
    /// Current status.
    pub status: TaskStatus,
    /// Code package name.
    #[serde(default)]
    pub code_name: Option<String>,
    /// Owning project.
    #[serde(default)]
    pub project_id: Option<String>,
    /// Creation time, as sent by the service.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Start time, as sent by the service.
    #[serde(default)]
    pub start_time: Option<String>,
    /// End time, as sent by the service.
    #[serde(default)]
    pub end_time: Option<String>,
    /// Run duration in milliseconds.
    #[serde(default)]
    pub duration: Option<u64>,
    /// Status message.
    #[serde(default)]
    pub msg: Option<String>,
}

/// Lifecycle status of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    /// Waiting in the queue.
    Queued,
    /// Delayed or being prepared.
    Preparing,
    /// Executing.
    Running,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Error,
    /// Cancelled before completion.
    Cancelled,
    /// Killed by the service.
    Killed,
    /// Exceeded its timeout.
    Timeout,
    /// A status this client does not know about.
    Other(String),
}

impl TaskStatus {
    /// Whether the task has stopped and its log is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Complete | Self::Error | Self::Cancelled | Self::Killed | Self::Timeout
        )
    }

    /// The wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Queued => "queued",
            Self::Preparing => "preparing",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
            Self::Killed => "killed",
            Self::Timeout => "timeout",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "queued" => Self::Queued,
            "preparing" => Self::Preparing,
            "running" => Self::Running,
            "complete" => Self::Complete,
            "error" => Self::Error,
            "cancelled" => Self::Cancelled,
            "killed" => Self::Killed,
            "timeout" => Self::Timeout,
            _ => Self::Other(value),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        match value {
            TaskStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Envelopes
// ============================================================================

/// `POST /tasks` body.
#[derive(Debug, Serialize)]
pub(crate) struct QueueTasksRequest<'a> {
    pub tasks: &'a [Task],
}

/// `POST /schedules` body.
#[derive(Debug, Serialize)]
pub(crate) struct ScheduleRequest<'a> {
    pub schedules: &'a [Schedule],
}

/// An element of an id list response.
#[derive(Debug, Deserialize)]
pub(crate) struct IdEntry {
    pub id: String,
}

/// `POST /tasks` response.
#[derive(Debug, Deserialize)]
pub(crate) struct QueueTasksResponse {
    #[serde(default)]
    pub tasks: Vec<IdEntry>,
}

/// `POST /schedules` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleResponse {
    #[serde(default)]
    pub schedules: Vec<IdEntry>,
}

/// Generic `{"msg": ...}` body used by mutating endpoints and error replies.
#[derive(Debug, Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub msg: String,
}

/// `GET /projects/<id>` response.
#[derive(Debug, Deserialize)]
pub(crate) struct ProjectResponse {
    #[serde(default)]
    pub name: String,
}
