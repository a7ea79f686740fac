//! Console configuration, read from `backoffice.toml`.
//!
//! Layered: file → environment → CLI flags.
//!
//! ```toml
//! [api]
//! base_url = "http://127.0.0.1:8000"
//! test_user = "admin@example.com"
//! timeout_secs = 15
//!
//! [server]
//! port = 3142
//! dev = false
//! ```
//!
//! `BACKOFFICE_API_URL`, `BACKOFFICE_TEST_USER` and `BACKOFFICE_API_TOKEN`
//! override the `[api]` values when set.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::client::RequestContext;

pub const CONFIG_FILE: &str = "backoffice.toml";
pub const ENV_API_URL: &str = "BACKOFFICE_API_URL";
pub const ENV_TEST_USER: &str = "BACKOFFICE_TEST_USER";
pub const ENV_API_TOKEN: &str = "BACKOFFICE_API_TOKEN";

/// REST API connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Development identity sent as `x-test-user`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            test_user: None,
            token: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Console HTTP server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub dev: bool,
}

fn default_port() -> u16 {
    3142
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            dev: false,
        }
    }
}

/// Root of `backoffice.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub server: ServerSection,
}

impl ConsoleToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse backoffice.toml")
    }

    /// Load `backoffice.toml` from `dir`, or defaults if there is none.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the configuration file: `explicit`, then `./backoffice.toml`,
    /// then the user config directory. Returns the path that was used.
    pub fn discover(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let candidates = [Some(PathBuf::from(CONFIG_FILE)), user_config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }
        Ok((Self::default(), None))
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize backoffice.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// API base URL, with the environment taking precedence.
    pub fn base_url(&self) -> String {
        env_value(ENV_API_URL).unwrap_or_else(|| self.api.base_url.clone())
    }

    pub fn test_user(&self) -> Option<String> {
        env_value(ENV_TEST_USER).or_else(|| self.api.test_user.clone())
    }

    pub fn token(&self) -> Option<String> {
        env_value(ENV_API_TOKEN).or_else(|| self.api.token.clone())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Request context for every API call of this process.
    pub fn request_context(&self) -> Result<RequestContext> {
        let mut ctx = RequestContext::new(&self.base_url())
            .context("Invalid [api] base_url")?
            .with_timeout(self.timeout());
        if let Some(user) = self.test_user() {
            ctx = ctx.with_test_user(user);
        }
        if let Some(token) = self.token() {
            ctx = ctx.with_token(token);
        }
        Ok(ctx)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = RequestContext::new(&self.base_url()) {
            warnings.push(e.to_string());
        }
        if self.api.timeout_secs == 0 {
            warnings.push("[api] timeout_secs is 0: every request will time out".to_string());
        }
        if self.server.port == 0 {
            warnings.push("[server] port is 0: the console will bind a random port".to_string());
        }
        if self.test_user().is_none() && self.token().is_none() {
            warnings.push(
                "Neither test_user nor token is set: requests are sent without identity"
                    .to_string(),
            );
        }

        warnings
    }
}

/// `<config dir>/backoffice/backoffice.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("backoffice").join(CONFIG_FILE))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
