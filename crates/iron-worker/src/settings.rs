//! Connection profile for the worker API.

/// Default API scheme.
pub const DEFAULT_SCHEME: &str = "https";

/// Default worker API host.
pub const DEFAULT_HOST: &str = "worker-aws-us-east-1.iron.io";

/// Default API port.
pub const DEFAULT_PORT: u16 = 443;

/// Default API version path segment.
pub const DEFAULT_API_VERSION: &str = "2";

/// Resolved {endpoint, project id, token} used to address the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// URL scheme (`https` or `http`).
    pub scheme: String,
    /// API host name.
    pub host: String,
    /// API port.
    pub port: u16,
    /// API version path segment.
    pub api_version: String,
    /// Project identifier.
    pub project_id: String,
    /// OAuth token.
    pub token: String,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scheme: DEFAULT_SCHEME.into(),
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            api_version: DEFAULT_API_VERSION.into(),
            project_id: String::new(),
            token: String::new(),
            user_agent: concat!("iron-worker-rs/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl Settings {
    /// Versioned API root, e.g. `https://host:443/2`.
    #[must_use]
    pub fn api_root(&self) -> String {
        format!(
            "{}://{}:{}/{}",
            self.scheme, self.host, self.port, self.api_version
        )
    }

    /// Project-scoped API root, e.g. `https://host:443/2/projects/<id>`.
    #[must_use]
    pub fn project_url(&self) -> String {
        format!("{}/projects/{}", self.api_root(), self.project_id)
    }
}
