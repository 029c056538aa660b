//! Configuration - Type-safe, validated config

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::core::{API_URL, Credentials, Error, Result};

/// Environment variable holding the private key
pub const ENV_PRIVATE_KEY: &str = "ICOBENCH_PRIVATE_KEY";

/// Environment variable holding the public key
pub const ENV_PUBLIC_KEY: &str = "ICOBENCH_PUBLIC_KEY";

/// Environment variable overriding the API root
pub const ENV_BASE_URI: &str = "ICOBENCH_BASE_URI";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key pair
    pub credentials: CredentialsConfig,

    /// HTTP transport settings
    pub transport: TransportOptions,

    /// Fallback tracing filter when RUST_LOG is unset
    pub log_level: String,
}

/// Key pair as written in the config file (loaded from env if not provided)
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub private_key: Option<String>,
    pub public_key: Option<String>,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Options passed through to the HTTP transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    /// API root every action path is resolved against
    pub base_uri: String,

    /// Whole-request timeout in seconds (none = no timeout)
    pub timeout_secs: Option<u64>,

    /// Connect timeout in seconds
    pub connect_timeout_secs: Option<u64>,

    /// Proxy URL applied to all requests
    pub proxy: Option<String>,

    /// Ignore proxies from the environment (HTTP_PROXY and friends)
    pub no_proxy: bool,

    /// User-Agent header override
    pub user_agent: Option<String>,

    /// Skip TLS certificate verification
    pub accept_invalid_certs: bool,
}

impl TransportOptions {
    pub fn with_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            base_uri: API_URL.to_string(),
            timeout_secs: None,
            connect_timeout_secs: None,
            proxy: None,
            no_proxy: false,
            user_agent: None,
            accept_invalid_certs: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: CredentialsConfig::default(),
            transport: TransportOptions::default(),
            log_level: "info,icobench=debug".to_string(),
        }
    }
}

impl Config {
    /// Load from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load from the default location, falling back to defaults when no
    /// file exists. A file that exists but does not parse is an error.
    pub fn load_default() -> Result<Self> {
        Self::load_first(&[
            Path::new("icobench.toml"),
            Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/icobench.toml")),
        ])
    }

    fn load_first(candidates: &[&Path]) -> Result<Self> {
        for path in candidates {
            if !path.is_file() {
                continue;
            }
            let cfg = Self::load(path)?;
            tracing::info!("Loaded config from {}", path.display());
            return Ok(cfg);
        }

        tracing::debug!("No icobench.toml found, using defaults");
        Ok(Self::default())
    }

    /// Fill unset credentials and the base URI from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Same as [`Config::with_env`] with an explicit variable lookup.
    ///
    /// Values already present in the file win over the environment, except
    /// the base URI which the environment overrides when set.
    pub fn with_env_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.credentials.private_key.is_none() {
            self.credentials.private_key = lookup(ENV_PRIVATE_KEY);
        }
        if self.credentials.public_key.is_none() {
            self.credentials.public_key = lookup(ENV_PUBLIC_KEY);
        }
        if let Some(base_uri) = lookup(ENV_BASE_URI).filter(|v| !v.is_empty()) {
            self.transport.base_uri = base_uri;
        }
        self
    }

    /// Validated key pair
    pub fn credentials(&self) -> Result<Credentials> {
        let private_key = self.credentials.private_key.clone().ok_or_else(|| {
            Error::Config(format!("private key not set (config or {})", ENV_PRIVATE_KEY))
        })?;
        let public_key = self.credentials.public_key.clone().ok_or_else(|| {
            Error::Config(format!("public key not set (config or {})", ENV_PUBLIC_KEY))
        })?;
        Credentials::new(private_key, public_key)
    }
}
