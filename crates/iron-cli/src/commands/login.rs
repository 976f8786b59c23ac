//! `iron worker login`: store docker registry credentials with the project.
//!
//! The credentials are checked against the registry itself before anything is
//! sent to the worker service.

use std::io::Write;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use iron_worker::{DockerCredentials, WorkerApi};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::{Phases, render_usage};
use crate::cli::{LoginFlags, parse_flags};
use crate::config::Session;
use crate::error::CliError;
use crate::output::{OutputFormat, StoredCredentials};

/// Docker Hub, used when no registry URL is given.
pub const DEFAULT_REGISTRY_URL: &str = "https://index.docker.io/v1/";

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

const USAGE: &str = "iron worker login --username --password --email --auth --repo-url";

/// Login command executor.
#[derive(Debug, Clone, Default)]
pub struct LoginCommand {
    flags: LoginFlags,
    credentials: Option<DockerCredentials>,
}

impl LoginCommand {
    /// The credentials built by the args phase.
    #[must_use]
    pub const fn credentials(&self) -> Option<&DockerCredentials> {
        self.credentials.as_ref()
    }
}

/// Whether the given combination of credential inputs is usable.
///
/// Nothing at all is fine. Otherwise an email is required, together with
/// either an auth token or both a username and a password.
#[must_use]
pub fn credentials_complete(
    email: &str,
    auth: &str,
    url: &str,
    username: &str,
    password: &str,
) -> bool {
    let any = [email, auth, url, username, password]
        .iter()
        .any(|v| !v.is_empty());
    if !any {
        return true;
    }
    !email.is_empty() && (!auth.is_empty() || (!username.is_empty() && !password.is_empty()))
}

/// `base64(username:password)` when both are present.
#[must_use]
pub fn derive_auth(username: &str, password: &str) -> Option<String> {
    (!username.is_empty() && !password.is_empty())
        .then(|| STANDARD.encode(format!("{username}:{password}")))
}

/// The registry endpoint the credentials are checked against.
#[must_use]
pub fn probe_url(registry: &str) -> String {
    if registry.ends_with('/') {
        format!("{registry}users/")
    } else {
        format!("{registry}/users/")
    }
}

/// Authenticate against the registry.
///
/// # Errors
///
/// Returns [`CliError::CredentialProbe`] if the registry cannot be reached or
/// answers with a non-success status.
pub async fn probe_registry(http: &reqwest::Client, registry: &str, auth: &str) -> Result<(), CliError> {
    let url = probe_url(registry);
    debug!(%url, "probing docker registry");

    let response = http
        .get(&url)
        .header(ACCEPT, "application/json")
        .header(ACCEPT_ENCODING, "gzip/deflate")
        .header(AUTHORIZATION, format!("Basic {auth}"))
        .header(CONTENT_TYPE, "application/json")
        .send()
        .await
        .map_err(|e| CliError::CredentialProbe(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CliError::CredentialProbe(format!("{url} answered {status}")));
    }
    Ok(())
}

impl Phases for LoginCommand {
    fn flags(&mut self, args: &[String]) -> Result<(), CliError> {
        self.flags = parse_flags(args, false)?;
        Ok(())
    }

    async fn args(&mut self) -> Result<(), CliError> {
        let f = &self.flags;
        if !f.args.is_empty() {
            return Err(CliError::validation("login takes no arguments"));
        }
        if !credentials_complete(&f.email, &f.auth, &f.repo_url, &f.username, &f.password) {
            return Err(CliError::validation(
                "you should set both repo-email and repo-auth or repo-email and repo-pass/repo-username",
            ));
        }

        let auth = derive_auth(&f.username, &f.password).unwrap_or_else(|| f.auth.clone());
        let url = if f.repo_url.is_empty() {
            DEFAULT_REGISTRY_URL.to_string()
        } else {
            f.repo_url.clone()
        };

        let http = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(|e| CliError::CredentialProbe(e.to_string()))?;
        probe_registry(&http, &url, &auth).await?;

        self.credentials = Some(DockerCredentials {
            url,
            auth,
            email: f.email.clone(),
        });
        Ok(())
    }

    fn usage(&self) -> String {
        render_usage::<LoginFlags>("login", USAGE)
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
        let Some(credentials) = &self.credentials else {
            return Err(CliError::validation("login: arguments were not validated"));
        };

        output.banner(out, "Storing docker repo credentials")?;
        let msg = session.api.add_docker_credentials(credentials).await?;
        let stored = StoredCredentials {
            url: credentials.url.clone(),
            msg,
        };
        output.write(out, &stored)
    }
}
