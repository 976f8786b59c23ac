//! `iron worker upload`: register a code package built from a docker image.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use iron_worker::{Code, WorkerApi};
use tracing::{debug, info};

use super::payload::{non_empty, positive, read_file};
use super::{Phases, render_usage};
use crate::cli::{UploadFlags, parse_flags};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{OutputFormat, UploadedCode};

const USAGE: &str =
    "iron worker upload [--zip my.zip] --name NAME [OPTIONS] some/image[:tag] [command...]";

/// Upload command executor.
#[derive(Debug, Clone, Default)]
pub struct UploadCommand {
    flags: UploadFlags,
    code: Option<Code>,
    archive: Option<PathBuf>,
}

impl UploadCommand {
    /// The code package built by the args phase.
    #[must_use]
    pub const fn code(&self) -> Option<&Code> {
        self.code.as_ref()
    }
}

/// Check an archive path: the extension first, then that it exists.
///
/// # Errors
///
/// Returns [`CliError::Validation`] for a non-`.zip` path, without touching
/// the filesystem, and [`CliError::File`] if the file is missing.
pub fn check_archive(path: &str) -> Result<PathBuf, CliError> {
    if !path.ends_with(".zip") {
        return Err(CliError::validation(format!(
            "file extension must be .zip, got: {path}"
        )));
    }
    fs::metadata(path).map_err(|e| CliError::file(path, e))?;
    Ok(PathBuf::from(path))
}

impl Phases for UploadCommand {
    fn flags(&mut self, args: &[String]) -> Result<(), CliError> {
        self.flags = parse_flags(args, true)?;
        Ok(())
    }

    async fn args(&mut self) -> Result<(), CliError> {
        let flags = &self.flags;
        let Some((image, command)) = flags.args.split_first() else {
            return Err(CliError::validation(
                "upload takes at least one argument. see iron worker upload -h",
            ));
        };
        if flags.name.is_empty() {
            return Err(CliError::validation("must specify -name for your worker"));
        }

        let archive = if flags.zip.is_empty() {
            None
        } else {
            Some(check_archive(&flags.zip)?)
        };

        let config = if flags.config_file.is_empty() {
            non_empty(&flags.config)
        } else {
            Some(read_file(&flags.config_file)?)
        };

        let code = Code {
            name: flags.name.clone(),
            image: image.clone(),
            command: non_empty(command.join(" ").trim()),
            max_concurrency: positive(flags.max_concurrency),
            retries: positive(flags.retries),
            retries_delay: positive(flags.retries_delay),
            config,
            host: non_empty(&flags.host),
        };
        debug!(name = %code.name, image = %code.image, "code package built");

        self.code = Some(code);
        self.archive = archive;
        Ok(())
    }

    fn usage(&self) -> String {
        render_usage::<UploadFlags>("upload", USAGE)
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
        let Some(code) = &self.code else {
            return Err(CliError::validation("upload: arguments were not validated"));
        };

        output.banner(out, &format!("Uploading worker '{}'", code.name))?;
        let info = session.api.upload_code(code, self.archive.as_deref()).await?;
        info!(code_id = %info.id, "code package uploaded");

        let uploaded = UploadedCode {
            url: session.dashboard_url("code", &info.id),
            host: info.host.filter(|h| !h.is_empty()),
            id: info.id,
        };
        output.write(out, &uploaded)
    }
}
