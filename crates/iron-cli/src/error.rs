//! CLI error types.

use std::path::PathBuf;

use iron_worker::ApiError;
use thiserror::Error;

/// CLI-specific errors.
///
/// Every lifecycle phase returns one of these to the dispatcher; the variant
/// decides the process exit code.
#[derive(Debug, Error)]
pub enum CliError {
    /// `-h`/`--help` was given; usage has been printed.
    #[error("help requested")]
    HelpRequested,

    /// Malformed or unknown flag.
    #[error("{0}")]
    Parse(String),

    /// No command with this name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Arity, required-field or cross-field violation.
    #[error("{0}")]
    Validation(String),

    /// A referenced file could not be read or does not exist.
    #[error("{}: {source}", .path.display())]
    File {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Identity could not be established.
    #[error("configuration error: {0}")]
    Config(String),

    /// The project lookup done while configuring the client failed.
    #[error("could not reach project: {0}")]
    ProjectLookup(#[source] ApiError),

    /// The submission, status or log call failed.
    #[error(transparent)]
    Remote(#[from] ApiError),

    /// The background wait ended without delivering a log.
    #[error("stopped waiting for task {0}: no log was delivered")]
    WaitClosed(String),

    /// `--wait-timeout` elapsed.
    #[error("timed out after {secs}s waiting for task {task_id}")]
    WaitTimedOut {
        /// Task being waited on.
        task_id: String,
        /// Configured deadline.
        secs: u64,
    },

    /// Docker registry rejected the credentials or was unreachable.
    #[error("docker repo auth failed: {0}")]
    CredentialProbe(String),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Creates a `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a `Config` error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a `File` error.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::HelpRequested | Self::Parse(_) | Self::UnknownCommand(_) => 2,
            Self::Validation(_) | Self::File { .. } => 3,
            Self::Config(_) | Self::ProjectLookup(_) => 4,
            Self::Remote(_) | Self::WaitClosed(_) | Self::WaitTimedOut { .. } => 5,
            Self::CredentialProbe(_) => 6,
            Self::Format(_) | Self::Io(_) => 1,
        }
    }

    /// Whether the dispatcher should print usage for this error.
    #[must_use]
    pub const fn wants_usage(&self) -> bool {
        matches!(self, Self::HelpRequested | Self::Parse(_))
    }
}

impl From<clap::Error> for CliError {
    fn from(err: clap::Error) -> Self {
        use clap::error::ErrorKind;

        match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                Self::HelpRequested
            }
            _ => {
                let rendered = err.render().to_string();
                let first = rendered.lines().next().unwrap_or_default();
                Self::Parse(first.trim_start_matches("error: ").to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_config() {
        let err = CliError::config("did not find token in any config files or env variables");
        assert_eq!(
            err.to_string(),
            "configuration error: did not find token in any config files or env variables"
        );
    }

    #[test]
    fn cli_error_display_file() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let err = CliError::file("/tmp/payload.json", io_err);
        assert_eq!(err.to_string(), "/tmp/payload.json: No such file");
    }

    #[test]
    fn remote_error_is_transparent() {
        let err = CliError::from(ApiError::status(400, "bad payload"));
        assert_eq!(err.to_string(), "400: bad payload");
    }

    #[test]
    fn exit_codes_distinguish_phases() {
        assert_eq!(CliError::Parse("x".into()).exit_code(), 2);
        assert_eq!(CliError::validation("x").exit_code(), 3);
        assert_eq!(CliError::config("x").exit_code(), 4);
        assert_eq!(CliError::Remote(ApiError::status(500, "x")).exit_code(), 5);
        assert_eq!(CliError::CredentialProbe("x".into()).exit_code(), 6);
        assert_eq!(
            CliError::from(std::io::Error::other("broken pipe")).exit_code(),
            1
        );
    }

    #[test]
    fn usage_only_for_flag_errors() {
        assert!(CliError::HelpRequested.wants_usage());
        assert!(CliError::Parse("x".into()).wants_usage());
        assert!(!CliError::validation("x").wants_usage());
    }

    #[test]
    fn clap_errors_keep_only_the_message_line() {
        let err = clap::Command::new("queue")
            .try_get_matches_from(["queue", "--bogus"])
            .expect_err("unknown flag");
        let msg = match CliError::from(err) {
            CliError::Parse(msg) => msg,
            other => format!("not a parse error: {other:?}"),
        };
        assert!(msg.contains("--bogus"));
        assert!(!msg.starts_with("error:"));
        assert!(!msg.contains('\n'));
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }
}
