//! # iron-worker
//!
//! Types and HTTP client for the IronWorker task queue API (v2).
//!
//! The [`WorkerApi`] trait is the seam the CLI talks through; [`HttpWorkerClient`]
//! is the network implementation and [`spawn_log_wait`] drives the
//! wait-for-completion loop used by `iron worker queue --wait`.
//!
//! ```text
//! ┌──────────┐   HTTPS + OAuth token   ┌──────────────────┐
//! │ iron-cli │◄───────────────────────►│  worker API (v2) │
//! └──────────┘                         └──────────────────┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod client;
pub mod error;
pub mod settings;
pub mod types;
pub mod wait;

pub use api::WorkerApi;
pub use client::HttpWorkerClient;
pub use error::{ApiError, Result};
pub use settings::Settings;
pub use types::{Code, CodeInfo, DockerCredentials, Schedule, Task, TaskInfo, TaskStatus};
pub use wait::{spawn_log_wait, WaitOptions};
