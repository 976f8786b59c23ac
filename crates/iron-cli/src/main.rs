//! `iron` binary entrypoint.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::error::ErrorKind;
use tracing_subscriber::EnvFilter;

use iron_cli::cli::{Cli, Commands};
use iron_cli::{CliError, ConfigResolver, OutputFormat, dispatch};
use iron_worker::HttpWorkerClient;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = match Cli::try_parse_normalized(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.kind() == ErrorKind::DisplayVersion {
                print!("{e}");
                0
            } else {
                eprint!("{}", e.render());
                2
            };
            return ExitCode::from(code);
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !matches!(e, CliError::HelpRequested) {
                eprintln!("error: {e}");
            }
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let output = OutputFormat::new(cli.format);
    let resolver = ConfigResolver::from_process()
        .with_env_name(cli.env)
        .with_overrides(cli.project_id, cli.token);

    let Commands::Worker { command } = &cli.command;
    let (name, args) = command.split();

    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let result = dispatch(
        name,
        args,
        &resolver,
        HttpWorkerClient::new,
        &mut stdout,
        &mut stderr,
        &output,
    )
    .await;
    stdout.flush()?;
    result
}
