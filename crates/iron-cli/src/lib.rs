//! # iron-cli
//!
//! Command-line client for IronWorker.
//!
//! Provides `iron worker` commands for:
//! - Uploading code packages
//! - Queueing and scheduling tasks
//! - Inspecting task status and logs
//! - Storing docker registry credentials
//!
//! # Architecture
//!
//! Every worker command is driven through the same phases by
//! [`commands::dispatch`]: flags, arguments, client configuration, run. The
//! remote calls go through [`iron_worker::WorkerApi`].
//!
//! ```text
//! argv ─► Cli ─► WorkerCommand::lookup ─► flags ─► args ─► config ─► run
//!                                                            │        │
//!                                                      ConfigResolver WorkerApi
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, WorkerInvocation};
pub use commands::{Phases, WorkerCommand, dispatch};
pub use config::{ConfigResolver, EnvSource, ProcessEnv, Session};
pub use error::CliError;
pub use output::OutputFormat;
