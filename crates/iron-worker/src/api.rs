//! The operations the CLI needs from the worker service.

use std::future::Future;
use std::path::Path;

use crate::error::Result;
use crate::types::{Code, CodeInfo, DockerCredentials, Schedule, Task, TaskInfo};

/// Worker service operations.
///
/// Implemented by [`crate::HttpWorkerClient`] and by fakes in tests.
pub trait WorkerApi: Send + Sync {
    /// Human-readable name of the configured project.
    fn project_name(&self) -> impl Future<Output = Result<String>> + Send;

    /// Queue tasks, returning the assigned ids in request order.
    fn queue_tasks(&self, tasks: &[Task]) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Create schedules, returning the assigned ids in request order.
    fn schedule(
        &self,
        schedules: &[Schedule],
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Fetch a task's details.
    fn task_info(&self, task_id: &str) -> impl Future<Output = Result<TaskInfo>> + Send;

    /// Fetch a task's log.
    fn task_log(&self, task_id: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Upload code package metadata, with an optional archive attached.
    fn upload_code(
        &self,
        code: &Code,
        archive: Option<&Path>,
    ) -> impl Future<Output = Result<CodeInfo>> + Send;

    /// Store docker registry credentials, returning the service message.
    fn add_docker_credentials(
        &self,
        credentials: &DockerCredentials,
    ) -> impl Future<Output = Result<String>> + Send;
}
