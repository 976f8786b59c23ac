//! `iron worker log`: print the log of one task.

use std::io::Write;

use iron_worker::WorkerApi;

use super::payload::single_arg;
use super::{Phases, render_usage};
use crate::cli::{TaskIdFlags, parse_flags};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{OutputFormat, TaskLog};

/// Log command executor.
#[derive(Debug, Clone, Default)]
pub struct LogCommand {
    flags: TaskIdFlags,
    task_id: String,
}

impl Phases for LogCommand {
    fn flags(&mut self, args: &[String]) -> Result<(), CliError> {
        self.flags = parse_flags(args, false)?;
        Ok(())
    }

    async fn args(&mut self) -> Result<(), CliError> {
        self.task_id = single_arg(&self.flags.args, "log takes one argument, a task_id")?;
        Ok(())
    }

    fn usage(&self) -> String {
        render_usage::<TaskIdFlags>("log", "iron worker log [OPTIONS] TASK_ID")
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
        output.banner(out, &format!("Getting log for task with id='{}'", self.task_id))?;
        let log = TaskLog {
            id: self.task_id.clone(),
            log: session.api.task_log(&self.task_id).await?,
        };
        output.write(out, &log)
    }
}
