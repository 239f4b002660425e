//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables
//! 2. `sessionkit.toml` configuration file
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the configuration file expands to the environment value.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{Error, Result};

/// Default configuration file name
pub const CONFIG_FILE: &str = "sessionkit.toml";

/// SameSite attribute of the session cookie
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSitePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

/// Identifier transport settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CookieSettings {
    /// Cookie name
    pub name: String,

    pub path: String,

    pub domain: Option<String>,

    /// Max-Age in seconds; `None` makes a browser-session cookie
    pub max_age_secs: Option<u64>,

    pub secure: bool,

    pub http_only: bool,

    pub same_site: SameSitePolicy,

    /// HMAC secret for signing the cookie value (unsigned when absent)
    #[serde(skip_serializing)]
    pub secret: Option<String>,

    /// Re-send the cookie whenever the session was modified, refreshing its expiry
    pub always_save: bool,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            name: default_cookie_name(),
            path: "/".to_string(),
            domain: None,
            max_age_secs: Some(default_max_age()),
            secure: false,
            http_only: true,
            same_site: SameSitePolicy::default(),
            secret: None,
            always_save: false,
        }
    }
}

fn default_cookie_name() -> String {
    "sk_session".to_string()
}

fn default_max_age() -> u64 {
    14 * 24 * 60 * 60
}

/// Store backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Path to SQLite database file
    pub db_path: String,

    /// Idle timeout for the memory backend, in seconds
    pub ttl_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_path: default_db_path(),
            ttl_secs: None,
        }
    }
}

impl StoreConfig {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(Duration::seconds)
    }
}

fn default_db_path() -> String {
    "data/sessions.db".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port for the HTTP server
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SessionConfig {
    pub cookie: CookieSettings,
    pub store: StoreConfig,
    pub server: ServerConfig,
}

impl SessionConfig {
    /// Expand `${VAR_NAME}` references to environment values
    ///
    /// Unknown variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Parse TOML text, expanding environment references first
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let expanded = Self::expand_env_vars(content);
        let mut config: Self = toml::from_str(&expanded)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        // An unset ${SESSION_SECRET} expands to "", which must not become a signing key
        config.cookie.secret = config.cookie.secret.filter(|s| !s.trim().is_empty());
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from `./sessionkit.toml` if present, otherwise from the environment
    pub fn load() -> Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }
        Ok(Self::from_env())
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let flag = |value: String| value.to_lowercase() != "false" && value != "0";

        // Cookie
        if let Some(name) = lookup("SESSION_COOKIE_NAME") {
            self.cookie.name = name;
        }
        if let Some(secret) = lookup("SESSION_SECRET") {
            self.cookie.secret = Some(secret);
        }
        if let Some(secure) = lookup("SESSION_SECURE") {
            self.cookie.secure = flag(secure);
        }
        if let Some(max_age) = lookup("SESSION_MAX_AGE") {
            if let Ok(secs) = max_age.parse() {
                self.cookie.max_age_secs = Some(secs);
            }
        }
        if let Some(same_site) = lookup("SESSION_SAME_SITE").and_then(|v| SameSitePolicy::parse(&v)) {
            self.cookie.same_site = same_site;
        }

        // Store
        if let Some(backend) = lookup("SESSION_STORE") {
            self.store.backend = match backend.to_lowercase().as_str() {
                "sqlite" => StoreBackend::Sqlite,
                _ => StoreBackend::Memory,
            };
        }
        if let Some(path) = lookup("SESSION_DB_PATH") {
            self.store.db_path = path;
        }
        if let Some(ttl) = lookup("SESSION_TTL") {
            if let Ok(secs) = ttl.parse() {
                self.store.ttl_secs = Some(secs);
            }
        }

        // Server
        if let Some(port) = lookup("SERVER_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
    }
}
