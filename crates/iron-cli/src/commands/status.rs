//! `iron worker status`: print the status of one task.

use std::io::Write;

use iron_worker::WorkerApi;

use super::payload::single_arg;
use super::{Phases, render_usage};
use crate::cli::{TaskIdFlags, parse_flags};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{OutputFormat, TaskStatusReport};

/// Status command executor.
#[derive(Debug, Clone, Default)]
pub struct StatusCommand {
    flags: TaskIdFlags,
    task_id: String,
}

impl Phases for StatusCommand {
    fn flags(&mut self, args: &[String]) -> Result<(), CliError> {
        self.flags = parse_flags(args, false)?;
        Ok(())
    }

    async fn args(&mut self) -> Result<(), CliError> {
        self.task_id = single_arg(&self.flags.args, "status takes one argument, a task_id")?;
        Ok(())
    }

    fn usage(&self) -> String {
        render_usage::<TaskIdFlags>("status", "iron worker status [OPTIONS] TASK_ID")
    }

    async fn run<A, W>(
        &self,
        session: &Session<A>,
        out: &mut W,
        output: &OutputFormat,
    ) -> Result<(), CliError>
    where
        A: WorkerApi + Clone + 'static,
        W: Write,
    {
        output.banner(out, &format!("Getting status of task with id='{}'", self.task_id))?;
        let info = session.api.task_info(&self.task_id).await?;
        let report = TaskStatusReport {
            id: info.id,
            status: info.status.to_string(),
        };
        output.write(out, &report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use crate::commands::fake::{FakeApi, session};

    #[tokio::test]
    async fn prints_bare_status_line() {
        let api = FakeApi::new();
        api.state.lock().status = "running".into();
        let mut cmd = StatusCommand::default();
        cmd.flags(&["abc123".to_string()]).expect("flags");
        cmd.args().await.expect("args");

        let mut out = Vec::new();
        cmd.run(&session(api), &mut out, &OutputFormat::default())
            .await
            .expect("should run");

        let out = String::from_utf8(out).expect("utf8");
        assert_eq!(out.lines().last(), Some("running"));
    }

    #[tokio::test]
    async fn json_mode_reports_id_and_status() {
        let mut cmd = StatusCommand::default();
        cmd.flags(&["abc123".to_string()]).expect("flags");
        cmd.args().await.expect("args");

        let mut out = Vec::new();
        cmd.run(&session(FakeApi::new()), &mut out, &OutputFormat::new(Format::Json))
            .await
            .expect("should run");

        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value, serde_json::json!({"id": "abc123", "status": "complete"}));
    }

    #[tokio::test]
    async fn requires_one_task_id() {
        let mut cmd = StatusCommand::default();
        cmd.flags(&[]).expect("flags");
        let err = cmd.args().await.expect_err("no id");
        assert_eq!(err.to_string(), "status takes one argument, a task_id");
    }

    #[test]
    fn usage_names_the_command() {
        assert!(StatusCommand::default().usage().contains("iron worker status"));
    }
}
