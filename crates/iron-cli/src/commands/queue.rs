//! `iron worker queue`: queue one task, optionally waiting for its log.

use std::io::Write;
use std::time::Duration;

use iron_worker::{Task, WaitOptions, WorkerApi, spawn_log_wait};
use tracing::{debug, info};

use super::payload::{non_empty, positive, resolve_payload, single_arg};
use super::{Phases, first_id, render_usage};
use crate::cli::{QueueFlags, parse_flags};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{OutputFormat, Submission};

const USAGE: &str = "iron worker queue [OPTIONS] CODE_PACKAGE_NAME";

/// Queue command executor.
#[derive(Debug, Clone, Default)]
pub struct QueueCommand {
    flags: QueueFlags,
    task: Option<Task>,
    wait_options: WaitOptions,
}

impl QueueCommand {
    /// Override how the `--wait` loop polls.
    #[must_use]
    pub const fn with_wait_options(mut self, options: WaitOptions) -> Self {
        self.wait_options = options;
        self
    }

    /// The task built by the args phase.
    #[must_use]
    pub const fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    async fn wait_for_log<A>(&self, session: &Session<A>, task_id: &str) -> Result<String, CliError>
    where
        A: WorkerApi + Clone + 'static,
    {
        let rx = spawn_log_wait(session.api.clone(), task_id.to_string(), self.wait_options);
        let received = match self.flags.wait_timeout {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), rx)
                .await
                .map_err(|_| CliError::WaitTimedOut {
                    task_id: task_id.to_string(),
                    secs,
                })?,
            None => rx.await,
        };
        let log = received.map_err(|_| CliError::WaitClosed(task_id.to_string()))?;
        Ok(String::from_utf8_lossy(&log).into_owned())
    }
}

impl Phases for QueueCommand {
    fn flags(&mut self, args: &[String]) -> Result<(), CliError> {
        self.flags = parse_flags(args, false)?;
        Ok(())
    }

    async fn args(&mut self) -> Result<(), CliError> {
        let flags = &self.flags;
        let code_name = single_arg(&flags.args, "queue takes one argument, a code name")?;
        let submit = &flags.submit;

        let mut task = Task::new(code_name, resolve_payload(&submit.payload, &submit.payload_file)?);
        task.priority = submit.priority;
        task.timeout = positive(submit.timeout);
        task.delay = positive(submit.delay);
        task.cluster = non_empty(&submit.cluster);

        debug!(code_name = %task.code_name, "task built");
        self.task = Some(task);
        Ok(())
    }

    fn usage(&self) -> String {
        render_usage::<QueueFlags>("queue", USAGE)
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
        let Some(task) = &self.task else {
            return Err(CliError::validation("queue: arguments were not validated"));
        };

        output.banner(out, &format!("Queueing task '{}'", task.code_name))?;
        let id = first_id(session.api.queue_tasks(std::slice::from_ref(task)).await?, "task id")?;
        info!(task_id = %id, "task queued");

        let mut submission = Submission::queued(id.clone(), session.dashboard_url("jobs", &id));
        if !self.flags.wait {
            return output.write(out, &submission);
        }

        if !output.is_json() {
            output.write(out, &submission)?;
        }
        output.banner(out, &format!("Waiting for task {id}"))?;
        out.flush()?;

        let log = self.wait_for_log(session, &id).await?;
        if output.is_json() {
            submission.log = Some(log);
            return output.write(out, &submission);
        }
        output.banner(out, "Done")?;
        output.banner(out, "Printing Log:")?;
        write!(out, "{log}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;
    use crate::commands::fake::{FakeApi, session};

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    async fn built(args: &[&str]) -> Result<QueueCommand, CliError> {
        let mut cmd = QueueCommand::default().with_wait_options(WaitOptions {
            poll_interval: Duration::from_millis(1),
            max_consecutive_errors: 2,
        });
        cmd.flags(&strings(args))?;
        cmd.args().await?;
        Ok(cmd)
    }

    #[tokio::test]
    async fn defaults_to_empty_object_payload() {
        let cmd = built(&["mytask"]).await.expect("should build");
        let task = cmd.task().expect("task");
        assert_eq!(task, &Task::new("mytask", "{}"));
    }

    #[tokio::test]
    async fn optional_fields_follow_flags() {
        let cmd = built(&[
            "-priority", "0", "-timeout", "0", "-delay", "30", "-cluster", "gpu", "mytask",
        ])
        .await
        .expect("should build");
        let task = cmd.task().expect("task");
        assert_eq!(task.priority, Some(0));
        assert_eq!(task.timeout, None);
        assert_eq!(task.delay, Some(30));
        assert_eq!(task.cluster.as_deref(), Some("gpu"));
    }

    #[tokio::test]
    async fn requires_exactly_one_code_name() {
        let err = built(&[]).await.expect_err("no name");
        assert_eq!(err.to_string(), "queue takes one argument, a code name");
        assert!(built(&["a", "b"]).await.is_err());
    }

    #[tokio::test]
    async fn run_prints_id_and_dashboard_url() {
        let api = FakeApi::new();
        let cmd = built(&["mytask"]).await.expect("should build");
        let mut out = Vec::new();

        cmd.run(&session(api.clone()), &mut out, &OutputFormat::default())
            .await
            .expect("should run");

        let out = String::from_utf8(out).expect("utf8");
        assert!(out.contains("-----> Queueing task 'mytask'"));
        assert!(out.contains("Queued task with id='id-1'"));
        assert!(out.trim_end().ends_with("/jobs/id-1?ref=cli"));
        assert_eq!(api.state.lock().tasks[0].payload, "{}");
    }

    #[tokio::test]
    async fn wait_prints_log_after_done() {
        let api = FakeApi::new();
        let cmd = built(&["-wait", "mytask"]).await.expect("should build");
        let mut out = Vec::new();

        cmd.run(&session(api), &mut out, &OutputFormat::default())
            .await
            .expect("should run");

        let out = String::from_utf8(out).expect("utf8");
        let waiting = out.find("Waiting for task id-1").expect("waiting banner");
        let done = out.find("-----> Done").expect("done banner");
        assert!(waiting < done);
        assert!(out.ends_with("-----> Printing Log:\nhello from task\n"));
    }

    #[tokio::test]
    async fn wait_in_json_mode_embeds_log() {
        let api = FakeApi::new();
        let cmd = built(&["-wait", "mytask"]).await.expect("should build");
        let mut out = Vec::new();

        cmd.run(&session(api), &mut out, &OutputFormat::new(Format::Json))
            .await
            .expect("should run");

        let value: serde_json::Value = serde_json::from_slice(&out).expect("single json object");
        assert_eq!(value["id"], "id-1");
        assert_eq!(value["log"], "hello from task\n");
    }

    #[tokio::test]
    async fn closed_wait_is_a_remote_error() {
        let api = FakeApi::new();
        let cmd = built(&["-wait", "mytask"]).await.expect("should build");
        let mut out = Vec::new();
        let session = session(api.clone());
        let output = OutputFormat::default();
        // Queueing succeeds, then every status poll is rejected.
        let queue = cmd.run(&session, &mut out, &output);
        api.state.lock().status = "running".into();
        let poison = async {
            tokio::task::yield_now().await;
            api.state.lock().fail_with = Some(400);
        };
        let (result, ()) = tokio::join!(queue, poison);

        let err = result.expect_err("wait closed");
        assert!(matches!(err, CliError::WaitClosed(_)));
        assert_eq!(err.exit_code(), 5);
    }

    #[tokio::test]
    async fn wait_timeout_expires() {
        let api = FakeApi::new();
        api.state.lock().status = "running".into();
        let cmd = built(&["-wait", "-wait-timeout", "0", "mytask"])
            .await
            .expect("should build");

        let err = cmd
            .run(&session(api), &mut Vec::new(), &OutputFormat::default())
            .await
            .expect_err("timed out");
        assert!(matches!(err, CliError::WaitTimedOut { secs: 0, .. }));
    }

    #[tokio::test]
    async fn submission_failure_propagates() {
        let api = FakeApi::new();
        api.state.lock().fail_with = Some(500);
        let cmd = built(&["mytask"]).await.expect("should build");
        let err = cmd
            .run(&session(api), &mut Vec::new(), &OutputFormat::default())
            .await
            .expect_err("remote failure");
        assert!(matches!(err, CliError::Remote(_)));
    }
}
