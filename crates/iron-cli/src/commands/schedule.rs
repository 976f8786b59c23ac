//! `iron worker schedule`: create a recurring or deferred schedule.

use std::io::Write;

use iron_worker::{Schedule, WorkerApi};
use tracing::info;

use super::payload::{non_empty, parse_timestamp, positive, resolve_payload, single_arg};
use super::{Phases, first_id, render_usage};
use crate::cli::{ScheduleFlags, parse_flags};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{OutputFormat, Submission};

const USAGE: &str = "iron worker schedule [OPTIONS] CODE_PACKAGE_NAME";

/// Schedule command executor.
#[derive(Debug, Clone, Default)]
pub struct ScheduleCommand {
    flags: ScheduleFlags,
    schedule: Option<Schedule>,
}

impl ScheduleCommand {
    /// The schedule built by the args phase.
    #[must_use]
    pub const fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }
}

impl Phases for ScheduleCommand {
    fn flags(&mut self, args: &[String]) -> Result<(), CliError> {
        self.flags = parse_flags(args, false)?;
        Ok(())
    }

    async fn args(&mut self) -> Result<(), CliError> {
        let flags = &self.flags;
        let code_name = single_arg(&flags.args, "schedule takes one argument, a code name")?;
        let submit = &flags.submit;

        let mut sched = Schedule::new(code_name, resolve_payload(&submit.payload, &submit.payload_file)?);
        sched.priority = submit.priority;
        sched.timeout = positive(submit.timeout);
        sched.delay = positive(submit.delay);
        sched.cluster = non_empty(&submit.cluster);
        sched.run_times = positive(flags.run_times);
        sched.run_every = positive(flags.run_every);
        sched.max_concurrency = positive(flags.max_concurrency);
        sched.start_at = parse_timestamp("start-at", &flags.start_at)?;
        sched.end_at = parse_timestamp("end-at", &flags.end_at)?;

        self.schedule = Some(sched);
        Ok(())
    }

    fn usage(&self) -> String {
        render_usage::<ScheduleFlags>("schedule", USAGE)
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
        let Some(sched) = &self.schedule else {
            return Err(CliError::validation("schedule: arguments were not validated"));
        };

        output.banner(out, &format!("Scheduling task '{}'", sched.code_name))?;
        let ids = session.api.schedule(std::slice::from_ref(sched)).await?;
        let id = first_id(ids, "schedule id")?;
        info!(schedule_id = %id, "schedule created");

        let submission = Submission::scheduled(id.clone(), session.dashboard_url("scheduled_jobs", &id));
        output.write(out, &submission)
    }
}
