//! # rb-config
//!
//! Layered runtime configuration for Rusty-Blog.
//!
//! Precedence, lowest first: built-in defaults, `config/default.toml`,
//! `config/local.toml`, then `RUSTY_BLOG__*` environment variables
//! (e.g. `RUSTY_BLOG__SERVER__PORT=8080`). A `.env` file is loaded first.

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "RUSTY_BLOG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub auth: AuthSettings,
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// May carry credentials for non-file backends
    pub url: SecretString,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    pub cookie_name: String,
    pub ttl_hours: i64,
    /// Mark the session cookie `Secure` (HTTPS deployments)
    pub secure_cookie: bool,
}

/// Argon2id cost parameters for new password hashes.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,
}

impl Settings {
    pub fn server_address(&self) -> (String, u16) {
        (self.server.host.clone(), self.server.port)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.session.ttl_hours <= 0 {
            return Err(ConfigError::Invalid("session.ttl_hours must be positive".into()));
        }
        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::Invalid("session.cookie_name must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        Ok(self)
    }
}

/// Loads `.env`, the config files and the environment.
pub fn load() -> Result<Settings, ConfigError> {
    if let Ok(path) = dotenvy::dotenv() {
        log::debug!("loaded environment from {}", path.display());
    }

    let builder = config::Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name("config/local").required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

    from_builder(builder)
}

/// Applies the built-in defaults underneath whatever sources `builder` carries.
pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Settings, ConfigError> {
    let settings: Settings = builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5004)?
        .set_default("database.url", "sqlite:rusty_blog.db")?
        .set_default("database.max_connections", 5)?
        .set_default("session.cookie_name", "rusty_blog_session")?
        .set_default("session.ttl_hours", 24 * 14)?
        .set_default("session.secure_cookie", false)?
        .set_default("auth.argon2_memory_kib", 19 * 1024)?
        .set_default("auth.argon2_iterations", 2)?
        .set_default("auth.argon2_parallelism", 1)?
        .set_default("log_level", "info")?
        .build()?
        .try_deserialize()?;

    settings.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;
    use secrecy::ExposeSecret;

    fn from_toml(toml: &str) -> Result<Settings, ConfigError> {
        from_builder(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults_apply_without_sources() {
        let settings = from_builder(config::Config::builder()).unwrap();
        assert_eq!(settings.server_address(), ("127.0.0.1".to_string(), 5004));
        assert_eq!(settings.database.url.expose_secret(), "sqlite:rusty_blog.db");
        assert_eq!(settings.session.cookie_name, "rusty_blog_session");
        assert_eq!(settings.session.ttl_hours, 336);
        assert!(!settings.session.secure_cookie);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_file_values_override_defaults() {
        let settings = from_toml(
            r#"
            log_level = "debug"

            [server]
            port = 8080

            [database]
            url = "sqlite::memory:"

            [session]
            secure_cookie = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.database.url.expose_secret(), "sqlite::memory:");
        assert!(settings.session.secure_cookie);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_rejects_non_positive_session_ttl() {
        let err = from_toml("[session]\nttl_hours = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let settings = from_toml("[database]\nurl = \"postgres://user:hunter2@db/blog\"\n").unwrap();
        assert!(!format!("{:?}", settings.database).contains("hunter2"));
    }
}
