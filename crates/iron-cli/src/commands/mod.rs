//! Worker command implementations.
//!
//! Every command passes through the same four phases, in order:
//!
//! 1. [`Phases::flags`] parses its options with a fresh clap context,
//! 2. [`Phases::args`] validates positionals and builds the descriptor,
//! 3. the shared config phase resolves the profile and opens a [`Session`],
//! 4. [`Phases::run`] performs the remote call and prints the result.
//!
//! The first failing phase stops the pipeline.
//!
//! - [`upload`] - Register a code package
//! - [`queue`] - Queue a task, optionally waiting for its log
//! - [`schedule`] - Create a schedule
//! - [`status`] - Print a task's status
//! - [`log`] - Print a task's log
//! - [`login`] - Store docker registry credentials

use std::future::Future;
use std::io::Write;

use iron_worker::{ApiError, Settings, WorkerApi};
use tracing::debug;

use crate::config::{ConfigResolver, EnvSource, Session};
use crate::error::CliError;
use crate::output::OutputFormat;

pub mod log;
pub mod login;
pub mod payload;
pub mod queue;
pub mod schedule;
pub mod status;
pub mod upload;

pub use log::LogCommand;
pub use login::LoginCommand;
pub use queue::QueueCommand;
pub use schedule::ScheduleCommand;
pub use status::StatusCommand;
pub use upload::UploadCommand;

/// The lifecycle every worker command implements.
pub trait Phases {
    /// Parse command-specific flags.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Parse`] or [`CliError::HelpRequested`].
    fn flags(&mut self, args: &[String]) -> Result<(), CliError>;

    /// Validate arguments and build the command's descriptor.
    ///
    /// # Errors
    ///
    /// Returns a validation, file or credential probe error.
    fn args(&mut self) -> impl Future<Output = Result<(), CliError>>;

    /// Invocation syntax and flag defaults.
    fn usage(&self) -> String;

    /// Perform the remote call and print its result.
    ///
    /// # Errors
    ///
    /// Returns a remote or output error.
    fn run<A, W>(
        &self,
        session: &Session<A>,
        out: &mut W,
        output: &OutputFormat,
    ) -> impl Future<Output = Result<(), CliError>>
    where
        A: WorkerApi + Clone + 'static,
        W: Write;
}

/// One worker command, ready to be driven through its phases.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    /// `iron worker upload`.
    Upload(UploadCommand),
    /// `iron worker queue`.
    Queue(QueueCommand),
    /// `iron worker schedule`.
    Schedule(ScheduleCommand),
    /// `iron worker status`.
    Status(StatusCommand),
    /// `iron worker log`.
    Log(LogCommand),
    /// `iron worker login`.
    Login(LoginCommand),
}

type Constructor = fn() -> WorkerCommand;

/// Command name to constructor.
pub const COMMANDS: &[(&str, Constructor)] = &[
    ("upload", || WorkerCommand::Upload(UploadCommand::default())),
    ("queue", || WorkerCommand::Queue(QueueCommand::default())),
    ("schedule", || WorkerCommand::Schedule(ScheduleCommand::default())),
    ("status", || WorkerCommand::Status(StatusCommand::default())),
    ("log", || WorkerCommand::Log(LogCommand::default())),
    ("login", || WorkerCommand::Login(LoginCommand::default())),
];

impl WorkerCommand {
    /// Construct the command registered under `name`.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        COMMANDS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, construct)| construct())
    }
}

impl Phases for WorkerCommand {
    fn flags(&mut self, args: &[String]) -> Result<(), CliError> {
        match self {
            Self::Upload(c) => c.flags(args),
            Self::Queue(c) => c.flags(args),
            Self::Schedule(c) => c.flags(args),
            Self::Status(c) => c.flags(args),
            Self::Log(c) => c.flags(args),
            Self::Login(c) => c.flags(args),
        }
    }

    async fn args(&mut self) -> Result<(), CliError> {
        match self {
            Self::Upload(c) => c.args().await,
            Self::Queue(c) => c.args().await,
            Self::Schedule(c) => c.args().await,
            Self::Status(c) => c.args().await,
            Self::Log(c) => c.args().await,
            Self::Login(c) => c.args().await,
        }
    }

    fn usage(&self) -> String {
        match self {
            Self::Upload(c) => c.usage(),
            Self::Queue(c) => c.usage(),
            Self::Schedule(c) => c.usage(),
            Self::Status(c) => c.usage(),
            Self::Log(c) => c.usage(),
            Self::Login(c) => c.usage(),
        }
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
        match self {
            Self::Upload(c) => c.run(session, out, output).await,
            Self::Queue(c) => c.run(session, out, output).await,
            Self::Schedule(c) => c.run(session, out, output).await,
            Self::Status(c) => c.run(session, out, output).await,
            Self::Log(c) => c.run(session, out, output).await,
            Self::Login(c) => c.run(session, out, output).await,
        }
    }
}

/// Drive the command `name` through all four phases.
///
/// `connect` builds the API client once the profile is resolved. Usage goes
/// to `diag` on help requests and flag errors; results go to `out`.
///
/// # Errors
///
/// Returns the error of the first failing phase.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch<E, A, F, W, D>(
    name: &str,
    args: &[String],
    resolver: &ConfigResolver<E>,
    connect: F,
    out: &mut W,
    diag: &mut D,
    output: &OutputFormat,
) -> Result<(), CliError>
where
    E: EnvSource,
    A: WorkerApi + Clone + 'static,
    F: FnOnce(Settings) -> Result<A, ApiError>,
    W: Write,
    D: Write,
{
    let Some(mut command) = WorkerCommand::lookup(name) else {
        let names: Vec<&str> = COMMANDS.iter().map(|(n, _)| *n).collect();
        writeln!(diag, "available commands: {}", names.join(", "))?;
        return Err(CliError::UnknownCommand(name.to_string()));
    };

    debug!(command = name, "parsing flags");
    if let Err(e) = command.flags(args) {
        if e.wants_usage() {
            diag.write_all(command.usage().as_bytes())?;
        }
        return Err(e);
    }

    debug!(command = name, "validating arguments");
    command.args().await?;

    debug!(command = name, "configuring client");
    let settings = resolver.resolve()?;
    let api = connect(settings.clone()).map_err(CliError::ProjectLookup)?;
    let session = Session::establish(settings, api, out, output).await?;

    debug!(command = name, "running");
    command.run(&session, out, output).await
}

/// First id of a submission reply.
pub(crate) fn first_id(ids: Vec<String>, what: &'static str) -> Result<String, CliError> {
    ids.into_iter()
        .next()
        .ok_or(CliError::Remote(ApiError::EmptyResponse(what)))
}

/// Render a flag struct's help with the given usage line.
pub(crate) fn render_usage<T: clap::CommandFactory>(name: &'static str, usage: &'static str) -> String {
    T::command()
        .name(name)
        .override_usage(usage)
        .render_help()
        .to_string()
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory [`WorkerApi`] recording everything submitted to it.

    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    use iron_worker::{
        ApiError, Code, CodeInfo, DockerCredentials, Result, Schedule, Settings, Task, TaskInfo,
        WorkerApi,
    };
    use parking_lot::Mutex;

    use crate::config::Session;

    #[derive(Debug, Default)]
    pub(crate) struct FakeState {
        pub tasks: Vec<Task>,
        pub schedules: Vec<Schedule>,
        pub codes: Vec<(Code, Option<PathBuf>)>,
        pub credentials: Vec<DockerCredentials>,
        pub ids: Vec<String>,
        pub status: String,
        pub log: Vec<u8>,
        pub code_host: Option<String>,
        pub fail_with: Option<u16>,
    }

    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeApi {
        pub state: Arc<Mutex<FakeState>>,
    }

    impl FakeApi {
        pub(crate) fn new() -> Self {
            let api = Self::default();
            {
                let mut state = api.state.lock();
                state.ids = vec!["id-1".into()];
                state.status = "complete".into();
                state.log = b"hello from task\n".to_vec();
            }
            api
        }

        fn check(&self) -> Result<()> {
            match self.state.lock().fail_with {
                Some(status) => Err(ApiError::status(status, "injected failure")),
                None => Ok(()),
            }
        }
    }

    impl WorkerApi for FakeApi {
        async fn project_name(&self) -> Result<String> {
            self.check()?;
            Ok("demo".into())
        }

        async fn queue_tasks(&self, tasks: &[Task]) -> Result<Vec<String>> {
            self.check()?;
            let mut state = self.state.lock();
            state.tasks.extend_from_slice(tasks);
            Ok(state.ids.clone())
        }

        async fn schedule(&self, schedules: &[Schedule]) -> Result<Vec<String>> {
            self.check()?;
            let mut state = self.state.lock();
            state.schedules.extend_from_slice(schedules);
            Ok(state.ids.clone())
        }

        async fn task_info(&self, task_id: &str) -> Result<TaskInfo> {
            self.check()?;
            let status = self.state.lock().status.clone();
            Ok(TaskInfo {
                id: task_id.into(),
                status: status.into(),
                code_name: None,
                project_id: None,
                created_at: None,
                start_time: None,
                end_time: None,
                duration: None,
                msg: None,
            })
        }

        async fn task_log(&self, _task_id: &str) -> Result<Vec<u8>> {
            self.check()?;
            Ok(self.state.lock().log.clone())
        }

        async fn upload_code(&self, code: &Code, archive: Option<&Path>) -> Result<CodeInfo> {
            self.check()?;
            let mut state = self.state.lock();
            state
                .codes
                .push((code.clone(), archive.map(Path::to_path_buf)));
            Ok(CodeInfo {
                id: state.ids.first().cloned().unwrap_or_default(),
                name: Some(code.name.clone()),
                rev: Some(1),
                host: state.code_host.clone(),
            })
        }

        async fn add_docker_credentials(&self, credentials: &DockerCredentials) -> Result<String> {
            self.check()?;
            self.state.lock().credentials.push(credentials.clone());
            Ok("Credentials added.".into())
        }
    }

    pub(crate) fn session(api: FakeApi) -> Session<FakeApi> {
        Session {
            settings: Settings {
                project_id: "p1".into(),
                token: "t1".into(),
                ..Settings::default()
            },
            api,
            project_name: "demo".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::fake::FakeApi;
    use super::*;
    use crate::cli::Format;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    fn identity() -> ConfigResolver<HashMap<String, String>> {
        ConfigResolver::new(HashMap::new()).with_overrides("p1", "t1")
    }

    #[test]
    fn lookup_knows_every_command() {
        for (name, _) in COMMANDS {
            assert!(WorkerCommand::lookup(name).is_some(), "{name}");
        }
        assert!(WorkerCommand::lookup("deploy").is_none());
    }

    #[tokio::test]
    async fn dispatch_runs_all_phases() {
        let api = FakeApi::new();
        let mut out = Vec::new();
        let mut diag = Vec::new();

        dispatch(
            "queue",
            &strings(&["mytask"]),
            &identity(),
            |_| Ok(api.clone()),
            &mut out,
            &mut diag,
            &OutputFormat::new(Format::Text),
        )
        .await
        .expect("should dispatch");

        let out = String::from_utf8(out).expect("utf8");
        assert!(out.starts_with("-----> Configuring client\n       Project 'demo' with id='p1'\n"));
        assert!(out.contains("Queued task with id='id-1'"));
        assert!(diag.is_empty());
        assert_eq!(api.state.lock().tasks.len(), 1);
    }

    #[tokio::test]
    async fn unknown_command_lists_available_ones() {
        let mut diag = Vec::new();
        let err = dispatch(
            "deploy",
            &[],
            &identity(),
            |_| Ok(FakeApi::new()),
            &mut Vec::new(),
            &mut diag,
            &OutputFormat::default(),
        )
        .await
        .expect_err("unknown");
        assert!(matches!(err, CliError::UnknownCommand(_)));
        assert!(String::from_utf8(diag).expect("utf8").contains("queue"));
    }

    #[tokio::test]
    async fn flag_error_prints_usage_and_skips_later_phases() {
        let api = FakeApi::new();
        let mut diag = Vec::new();
        let err = dispatch(
            "queue",
            &strings(&["-bogus", "mytask"]),
            &identity(),
            |_| Ok(api.clone()),
            &mut Vec::new(),
            &mut diag,
            &OutputFormat::default(),
        )
        .await
        .expect_err("bad flag");

        assert_eq!(err.exit_code(), 2);
        let diag = String::from_utf8(diag).expect("utf8");
        assert!(diag.contains("iron worker queue [OPTIONS] CODE_PACKAGE_NAME"));
        assert!(api.state.lock().tasks.is_empty());
    }

    #[tokio::test]
    async fn validation_error_stops_before_config() {
        let mut connected = false;
        let err = dispatch(
            "status",
            &[],
            &identity(),
            |_| {
                connected = true;
                Ok(FakeApi::new())
            },
            &mut Vec::new(),
            &mut Vec::new(),
            &OutputFormat::default(),
        )
        .await
        .expect_err("no task id");
        assert_eq!(err.exit_code(), 3);
        assert!(!connected);
    }

    #[tokio::test]
    async fn missing_identity_stops_before_run() {
        let api = FakeApi::new();
        let err = dispatch(
            "queue",
            &strings(&["mytask"]),
            &ConfigResolver::new(HashMap::new()),
            |_| Ok(api.clone()),
            &mut Vec::new(),
            &mut Vec::new(),
            &OutputFormat::default(),
        )
        .await
        .expect_err("no identity");
        assert!(matches!(err, CliError::Config(_)));
        assert!(api.state.lock().tasks.is_empty());
    }

    #[tokio::test]
    async fn project_lookup_failure_is_a_config_error() {
        let api = FakeApi::new();
        api.state.lock().fail_with = Some(401);
        let err = dispatch(
            "status",
            &strings(&["abc123"]),
            &identity(),
            |_| Ok(api.clone()),
            &mut Vec::new(),
            &mut Vec::new(),
            &OutputFormat::default(),
        )
        .await
        .expect_err("lookup fails");
        assert!(matches!(err, CliError::ProjectLookup(_)));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn first_id_rejects_empty_reply() {
        let err = first_id(Vec::new(), "task id").expect_err("empty");
        assert_eq!(err.exit_code(), 5);
        assert_eq!(first_id(vec!["a".into(), "b".into()], "task id").expect("id"), "a");
    }
}
