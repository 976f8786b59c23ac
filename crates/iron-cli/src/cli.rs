//! Command-line argument parsing with clap.
//!
//! The top-level [`Cli`] only knows the global options and the `worker`
//! namespace. Everything after the worker command name is handed verbatim to
//! that command, which parses it with its own flag struct through
//! [`parse_flags`]. Every call builds a fresh clap `Command`, so no flag state
//! outlives one parse.

use std::ffi::OsString;

use chrono::DateTime;
use clap::{Args, Command, CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};

use crate::error::CliError;

/// Iron.io command-line client.
#[derive(Parser, Debug, Clone)]
#[command(name = "iron")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file section to apply after the defaults.
    #[arg(long, value_name = "NAME")]
    pub env: Option<String>,

    /// Project id, overriding config files and environment.
    #[arg(long, value_name = "ID", default_value = "")]
    pub project_id: String,

    /// OAuth token, overriding config files and environment.
    #[arg(long, value_name = "TOKEN", default_value = "")]
    pub token: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,

    /// Product to operate on.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Parse the process arguments, accepting single-dash long options.
    ///
    /// # Errors
    ///
    /// Returns the clap error, including help and version requests, so the
    /// caller decides where it is printed.
    pub fn try_parse_normalized<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut argv = argv
            .into_iter()
            .map(|arg| arg.into().to_string_lossy().into_owned());
        let bin = argv.next().unwrap_or_else(|| "iron".to_string());
        let rest: Vec<String> = argv.collect();
        let normalized = normalize_flags(&Self::command(), &rest, true);
        Self::try_parse_from(std::iter::once(bin).chain(normalized))
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Progress banners and human-readable results.
    #[default]
    Text,
    /// One JSON object per command, no banners.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Queue, schedule and inspect IronWorker tasks.
    #[command(after_help = WORKER_COMMANDS)]
    Worker {
        /// Worker command to run.
        #[command(subcommand)]
        command: WorkerInvocation,
    },
}

const WORKER_COMMANDS: &str = "\
Commands:
  upload    Upload a code package from a docker image
  queue     Queue a task
  schedule  Schedule a task
  status    Print the status of a task
  log       Print the log of a task
  login     Store docker registry credentials";

/// A worker command name followed by its raw arguments.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum WorkerInvocation {
    /// Any worker command.
    #[command(external_subcommand)]
    Command(Vec<String>),
}

impl WorkerInvocation {
    /// Command name and the arguments that follow it.
    #[must_use]
    pub fn split(&self) -> (&str, &[String]) {
        let Self::Command(argv) = self;
        match argv.split_first() {
            Some((name, args)) => (name.as_str(), args),
            None => ("", &[]),
        }
    }
}

// ============================================================================
// Per-command flags
// ============================================================================

/// Options shared by `queue` and `schedule`.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitFlags {
    /// Payload to pass to the task.
    #[arg(long, default_value = "")]
    pub payload: String,

    /// File whose contents are the payload; wins over --payload.
    #[arg(long, value_name = "FILE", default_value = "")]
    pub payload_file: String,

    /// Priority queue to run the task in (0, 1 or 2).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
    pub priority: Option<u8>,

    /// Maximum run time in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Delay before the task becomes runnable, in seconds.
    #[arg(long, value_name = "SECONDS")]
    pub delay: Option<u64>,

    /// Cluster to run the task on.
    #[arg(long, default_value = "")]
    pub cluster: String,
}

/// `iron worker queue` flags.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "queue", override_usage = "iron worker queue [OPTIONS] CODE_PACKAGE_NAME")]
pub struct QueueFlags {
    /// Common submission options.
    #[command(flatten)]
    pub submit: SubmitFlags,

    /// Wait for the task to finish and print its log.
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds.
    #[arg(long, value_name = "SECONDS", requires = "wait")]
    pub wait_timeout: Option<u64>,

    /// Positional arguments.
    #[arg(value_name = "CODE_PACKAGE_NAME")]
    pub args: Vec<String>,
}

/// `iron worker schedule` flags.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "schedule", override_usage = "iron worker schedule [OPTIONS] CODE_PACKAGE_NAME")]
pub struct ScheduleFlags {
    /// Common submission options.
    #[command(flatten)]
    pub submit: SubmitFlags,

    /// Maximum number of concurrently running tasks.
    #[arg(long)]
    pub max_concurrency: Option<u64>,

    /// Seconds between runs.
    #[arg(long, value_name = "SECONDS")]
    pub run_every: Option<u64>,

    /// Total number of runs.
    #[arg(long)]
    pub run_times: Option<u64>,

    /// First run not before this RFC3339 time.
    #[arg(long, value_name = "TIME", default_value = "", value_parser = rfc3339_or_empty)]
    pub start_at: String,

    /// No runs after this RFC3339 time.
    #[arg(long, value_name = "TIME", default_value = "", value_parser = rfc3339_or_empty)]
    pub end_at: String,

    /// Positional arguments.
    #[arg(value_name = "CODE_PACKAGE_NAME")]
    pub args: Vec<String>,
}

/// `iron worker status` and `iron worker log` take only a task id.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(name = "task")]
pub struct TaskIdFlags {
    /// Positional arguments.
    #[arg(value_name = "TASK_ID")]
    pub args: Vec<String>,
}

/// `iron worker upload` flags.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "upload",
    override_usage = "iron worker upload [--zip my.zip] --name NAME [OPTIONS] some/image[:tag] [command...]"
)]
pub struct UploadFlags {
    /// Name of the code package.
    #[arg(long, default_value = "")]
    pub name: String,

    /// Configuration made available to every task.
    #[arg(long, default_value = "")]
    pub config: String,

    /// File whose contents are the configuration; wins over --config.
    #[arg(long, value_name = "FILE", default_value = "")]
    pub config_file: String,

    /// Maximum number of concurrently running tasks.
    #[arg(long)]
    pub max_concurrency: Option<u64>,

    /// Automatic retries on failure.
    #[arg(long)]
    pub retries: Option<u64>,

    /// Seconds between retries.
    #[arg(long, value_name = "SECONDS")]
    pub retries_delay: Option<u64>,

    /// Zip archive to attach to the package.
    #[arg(long, value_name = "FILE", default_value = "")]
    pub zip: String,

    /// Host name for a long-running service.
    #[arg(long, default_value = "")]
    pub host: String,

    /// Image followed by the command to run in it.
    #[arg(value_name = "IMAGE", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// `iron worker login` flags.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(
    name = "login",
    override_usage = "iron worker login --username --password --email --auth --repo-url"
)]
pub struct LoginFlags {
    /// Docker registry user name.
    #[arg(long, default_value = "")]
    pub username: String,

    /// Docker registry password.
    #[arg(long, default_value = "")]
    pub password: String,

    /// Docker registry account email.
    #[arg(long, default_value = "")]
    pub email: String,

    /// Base64 `username:password` token, instead of --username/--password.
    #[arg(long, default_value = "")]
    pub auth: String,

    /// Registry URL.
    #[arg(long, value_name = "URL", default_value = "")]
    pub repo_url: String,

    /// Positional arguments.
    #[arg(hide = true)]
    pub args: Vec<String>,
}

fn rfc3339_or_empty(value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Ok(String::new());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|_| value.to_string())
        .map_err(|e| format!("expected an RFC3339 time like 2030-01-01T00:00:00Z: {e}"))
}

// ============================================================================
// Parsing helpers
// ============================================================================

/// Parse one command's arguments into its flag struct.
///
/// `stop_at_positional` makes everything after the first positional argument
/// verbatim, for commands whose trailing arguments belong to someone else.
///
/// # Errors
///
/// Returns [`CliError::HelpRequested`] or [`CliError::Parse`].
pub fn parse_flags<T>(args: &[String], stop_at_positional: bool) -> Result<T, CliError>
where
    T: CommandFactory + FromArgMatches,
{
    let mut cmd = T::command();
    let normalized = normalize_flags(&cmd, args, stop_at_positional);
    let bin = cmd.get_name().to_string();
    let matches = cmd.try_get_matches_from_mut(std::iter::once(bin).chain(normalized))?;
    Ok(T::from_arg_matches(&matches)?)
}

/// Rewrite `-name` into `--name` for every long option `cmd` declares.
///
/// Short flags, unknown options and option values are left untouched, so
/// clap still reports what it does not recognize. Parsing of options stops at
/// `--`.
#[must_use]
pub fn normalize_flags(cmd: &Command, args: &[String], stop_at_positional: bool) -> Vec<String> {
    let takes_value = |name: &str| {
        cmd.get_arguments()
            .find(|a| a.get_long() == Some(name))
            .map(|a| a.get_action().takes_values())
    };

    let mut out = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--" {
            out.push(arg.clone());
            out.extend(iter.by_ref().cloned());
            break;
        }

        let long = arg
            .strip_prefix("--")
            .or_else(|| arg.strip_prefix('-').filter(|rest| rest.len() > 1));
        let Some(long) = long else {
            out.push(arg.clone());
            if stop_at_positional && !arg.starts_with('-') {
                out.extend(iter.by_ref().cloned());
                break;
            }
            continue;
        };

        let (name, inline_value) = match long.split_once('=') {
            Some((name, _)) => (name, true),
            None => (long, false),
        };
        let known = if name == "help" || name == "version" {
            Some(false)
        } else {
            takes_value(name)
        };
        match known {
            Some(needs_value) => {
                let value = if needs_value && !inline_value { iter.next() } else { None };
                // Joined so clap never reads a value like `-1` as a flag.
                match value {
                    Some(value) => out.push(format!("--{long}={value}")),
                    None => out.push(format!("--{long}")),
                }
            }
            None => out.push(arg.clone()),
        }
    }
    out
}
