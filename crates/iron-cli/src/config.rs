//! Connection profile resolution and the configured client session.
//!
//! Layers are applied lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. `~/.iron.json`,
//! 3. `./iron.json`,
//! 4. `IRON_<KEY>` then `IRON_WORKER_<KEY>` environment variables,
//! 5. `--project-id` / `--token` when non-empty.
//!
//! Inside a config file the top-level keys apply first, then the
//! `iron_worker` section, then the `--env` section (top level, then inside
//! `iron_worker`).

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use iron_worker::{Settings, WorkerApi};
use serde_json::Value;
use tracing::debug;

use crate::error::CliError;
use crate::output::OutputFormat;

/// Config file section and environment prefix of this product.
pub const PRODUCT: &str = "iron_worker";

/// Local config file name.
pub const LOCAL_CONFIG_FILE: &str = "iron.json";

/// Global config file name, relative to the home directory.
pub const GLOBAL_CONFIG_FILE: &str = ".iron.json";

/// Base of dashboard links.
pub const DASHBOARD_BASE: &str = "https://hud.iron.io/tq/projects";

/// Suffix appended to dashboard links.
pub const DASHBOARD_SUFFIX: &str = "?ref=cli";

const KEYS: [&str; 6] = ["token", "project_id", "host", "scheme", "port", "api_version"];

/// Source of environment variables.
pub trait EnvSource {
    /// Value of `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Builds the [`Settings`] for one invocation.
#[derive(Debug, Clone)]
pub struct ConfigResolver<E = ProcessEnv> {
    env: E,
    env_name: Option<String>,
    project_id: String,
    token: String,
    files: Vec<PathBuf>,
}

impl ConfigResolver<ProcessEnv> {
    /// Resolver over the process environment and the standard config files.
    #[must_use]
    pub fn from_process() -> Self {
        let mut files = Vec::with_capacity(2);
        if let Some(home) = dirs::home_dir() {
            files.push(home.join(GLOBAL_CONFIG_FILE));
        }
        files.push(PathBuf::from(LOCAL_CONFIG_FILE));
        Self::new(ProcessEnv).with_config_files(files)
    }
}

impl<E: EnvSource> ConfigResolver<E> {
    /// Resolver over `env` with no config files.
    #[must_use]
    pub const fn new(env: E) -> Self {
        Self {
            env,
            env_name: None,
            project_id: String::new(),
            token: String::new(),
            files: Vec::new(),
        }
    }

    /// Config files to read, lowest precedence first.
    #[must_use]
    pub fn with_config_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    /// Named section applied after the product section.
    #[must_use]
    pub fn with_env_name(mut self, env_name: Option<String>) -> Self {
        self.env_name = env_name.filter(|n| !n.is_empty());
        self
    }

    /// Command-line identity overrides; empty values are ignored.
    #[must_use]
    pub fn with_overrides(mut self, project_id: impl Into<String>, token: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self.token = token.into();
        self
    }

    /// Resolve the connection profile.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Config`] for unreadable or malformed config files,
    /// invalid values, or a missing project id or token.
    pub fn resolve(&self) -> Result<Settings, CliError> {
        let mut settings = Settings::default();

        for path in &self.files {
            self.apply_file(&mut settings, path)?;
        }

        for key in KEYS {
            let upper = key.to_uppercase();
            for var in [format!("IRON_{upper}"), format!("IRON_WORKER_{upper}")] {
                if let Some(value) = self.env.var(&var).filter(|v| !v.is_empty()) {
                    debug!(var = %var, "applying environment variable");
                    set(&mut settings, key, value)?;
                }
            }
        }

        if !self.project_id.is_empty() {
            settings.project_id.clone_from(&self.project_id);
        }
        if !self.token.is_empty() {
            settings.token.clone_from(&self.token);
        }

        if settings.project_id.is_empty() {
            return Err(CliError::config(
                "did not find project id in any config files or env variables",
            ));
        }
        if settings.token.is_empty() {
            return Err(CliError::config(
                "did not find token in any config files or env variables",
            ));
        }
        Ok(settings)
    }

    fn apply_file(&self, settings: &mut Settings, path: &Path) -> Result<(), CliError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(CliError::config(format!("{}: {e}", path.display()))),
        };
        let doc: Value = serde_json::from_str(&raw)
            .map_err(|e| CliError::config(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "applying config file");

        apply_section(settings, &doc)?;
        let product = doc.get(PRODUCT);
        if let Some(section) = product {
            apply_section(settings, section)?;
        }
        if let Some(name) = &self.env_name {
            if let Some(section) = doc.get(name) {
                apply_section(settings, section)?;
            }
            if let Some(section) = product.and_then(|p| p.get(name)) {
                apply_section(settings, section)?;
            }
        }
        Ok(())
    }
}

fn apply_section(settings: &mut Settings, section: &Value) -> Result<(), CliError> {
    let Some(map) = section.as_object() else {
        return Ok(());
    };
    for key in KEYS {
        let value = match map.get(key) {
            None => continue,
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(_) => return Err(CliError::config(format!("{key} must be a string or a number"))),
        };
        set(settings, key, value)?;
    }
    Ok(())
}

fn set(settings: &mut Settings, key: &str, value: String) -> Result<(), CliError> {
    match key {
        "token" => settings.token = value,
        "project_id" => settings.project_id = value,
        "host" => settings.host = value,
        "scheme" => settings.scheme = value,
        "api_version" => settings.api_version = value,
        "port" => {
            settings.port = value
                .parse()
                .map_err(|_| CliError::config(format!("invalid port: {value}")))?;
        }
        _ => {}
    }
    Ok(())
}

// ============================================================================
// Session
// ============================================================================

/// A connected client with its resolved profile and project name.
#[derive(Debug, Clone)]
pub struct Session<A> {
    /// Resolved connection profile.
    pub settings: Settings,
    /// Worker API client.
    pub api: A,
    /// Human-readable project name.
    pub project_name: String,
}

impl<A: WorkerApi> Session<A> {
    /// Look up the project name, printing the configuration banner.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ProjectLookup`] if the lookup fails.
    pub async fn establish<W: Write>(
        settings: Settings,
        api: A,
        out: &mut W,
        output: &OutputFormat,
    ) -> Result<Self, CliError> {
        output.banner(out, "Configuring client")?;
        let project_name = api.project_name().await.map_err(CliError::ProjectLookup)?;
        output.detail(
            out,
            &format!("Project '{project_name}' with id='{}'", settings.project_id),
        )?;
        Ok(Self {
            settings,
            api,
            project_name,
        })
    }

    /// Dashboard link for a resource of this project.
    #[must_use]
    pub fn dashboard_url(&self, resource: &str, id: &str) -> String {
        format!(
            "{DASHBOARD_BASE}/{}/{resource}/{id}{DASHBOARD_SUFFIX}",
            self.settings.project_id
        )
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write config");
        path
    }

    #[test]
    fn defaults_with_env_identity() {
        let settings = ConfigResolver::new(env(&[("IRON_TOKEN", "t"), ("IRON_PROJECT_ID", "p")]))
            .resolve()
            .expect("should resolve");
        assert_eq!(settings.project_id, "p");
        assert_eq!(settings.token, "t");
        assert_eq!(settings.host, iron_worker::settings::DEFAULT_HOST);
        assert_eq!(settings.port, 443);
    }

    #[test]
    fn missing_project_id_and_token_are_reported_separately() {
        let err = ConfigResolver::new(env(&[("IRON_TOKEN", "t")]))
            .resolve()
            .expect_err("no project");
        assert!(err.to_string().contains("did not find project id"));

        let err = ConfigResolver::new(env(&[("IRON_PROJECT_ID", "p")]))
            .resolve()
            .expect_err("no token");
        assert!(err.to_string().contains("did not find token"));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn flags_win_over_environment() {
        let settings = ConfigResolver::new(env(&[("IRON_TOKEN", "t"), ("IRON_PROJECT_ID", "p")]))
            .with_overrides("flag-p", "")
            .resolve()
            .expect("should resolve");
        assert_eq!(settings.project_id, "flag-p");
        assert_eq!(settings.token, "t");
    }

    #[test]
    fn product_env_vars_win_over_generic_ones() {
        let settings = ConfigResolver::new(env(&[
            ("IRON_TOKEN", "generic"),
            ("IRON_WORKER_TOKEN", "worker"),
            ("IRON_PROJECT_ID", "p"),
            ("IRON_PORT", "8080"),
            ("IRON_SCHEME", "http"),
        ]))
        .resolve()
        .expect("should resolve");
        assert_eq!(settings.token, "worker");
        assert_eq!(settings.api_root(), format!("http://{}:8080/2", settings.host));
    }

    #[test]
    fn local_file_overrides_global_and_sections_layer() {
        let dir = TempDir::new().expect("tempdir");
        let global = write(
            &dir,
            "global.json",
            r#"{"token": "global-token", "project_id": "global-project", "host": "a.example"}"#,
        );
        let local = write(
            &dir,
            "local.json",
            r#"{
                "project_id": "local-project",
                "iron_worker": {"host": "worker.example", "staging": {"port": 8443}},
                "staging": {"token": "staging-token"}
            }"#,
        );

        let settings = ConfigResolver::new(HashMap::new())
            .with_config_files(vec![global, local])
            .with_env_name(Some("staging".into()))
            .resolve()
            .expect("should resolve");
        assert_eq!(settings.project_id, "local-project");
        assert_eq!(settings.token, "staging-token");
        assert_eq!(settings.host, "worker.example");
        assert_eq!(settings.port, 8443);
    }

    #[test]
    fn env_section_ignored_without_env_name() {
        let dir = TempDir::new().expect("tempdir");
        let file = write(
            &dir,
            "iron.json",
            r#"{"token": "t", "project_id": "p", "staging": {"token": "other"}}"#,
        );
        let settings = ConfigResolver::new(HashMap::new())
            .with_config_files(vec![file])
            .resolve()
            .expect("should resolve");
        assert_eq!(settings.token, "t");
    }

    #[test]
    fn missing_files_are_skipped() {
        let dir = TempDir::new().expect("tempdir");
        let settings = ConfigResolver::new(env(&[("IRON_TOKEN", "t"), ("IRON_PROJECT_ID", "p")]))
            .with_config_files(vec![dir.path().join("absent.json")])
            .resolve()
            .expect("should resolve");
        assert_eq!(settings.token, "t");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().expect("tempdir");
        let file = write(&dir, "iron.json", "{not json");
        let err = ConfigResolver::new(HashMap::new())
            .with_config_files(vec![file])
            .resolve()
            .expect_err("malformed");
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn invalid_port_is_a_config_error() {
        let err = ConfigResolver::new(env(&[
            ("IRON_TOKEN", "t"),
            ("IRON_PROJECT_ID", "p"),
            ("IRON_PORT", "https"),
        ]))
        .resolve()
        .expect_err("bad port");
        assert!(err.to_string().contains("invalid port"));
    }
}
