//! Application configuration.
//!
//! Every value is resolved with the same priority: `config.toml` > environment
//! (including a `.env` file) > built-in default.

use serde::Deserialize;
use std::path::PathBuf;

use crate::paths;

// ==================== Defaults ====================

/// Server address to bind to
pub const SERVER_ADDR: &str = "0.0.0.0";

/// Server port
pub const DEFAULT_PORT: u16 = 3000;

/// Session lifetime: 7 days
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Development-only signing secret, used when SESSION_SECRET is unset
pub const DEV_SESSION_SECRET: &str = "my-travel-secret";

/// Largest accepted request body (form posts)
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 100 * 1024;

/// Probability threshold for expired-session cleanup (0-255, lower = less frequent)
/// Value of 25 means ~10% chance (25/256) on each session load
pub const SESSION_CLEANUP_THRESHOLD: u8 = 25;

// ==================== Environment ====================

/// Deployment environment. Only `development` exposes fault details; any
/// other name behaves as production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn parse(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

// ==================== config.toml ====================

/// Configuration file structure for config.toml
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerSection {
    pub port: Option<u16>,
    pub environment: Option<String>,
    pub public_dir: Option<String>,
    pub cookie_secure: Option<bool>,
    pub body_limit_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DatabaseSection {
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionSection {
    pub secret: Option<String>,
    pub ttl_secs: Option<i64>,
}

// ==================== Resolved configuration ====================

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub port: u16,
    pub environment: Environment,
    pub session_secret: String,
    pub session_ttl: chrono::Duration,
    pub public_dir: PathBuf,
    pub cookie_secure: bool,
    pub body_limit_bytes: usize,
}

impl Config {
    /// Load configuration from `config.toml`, `.env` and the process environment.
    pub fn load() -> Self {
        // Load .env file if present
        let _ = dotenvy::dotenv();

        let file = match std::fs::read_to_string("config.toml") {
            Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    tracing::warn!("Ignoring malformed config.toml: {}", e);
                    None
                }
            },
            Err(_) => None,
        };

        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Merge an optional config file with an environment lookup.
    pub fn resolve(file: Option<FileConfig>, env: impl Fn(&str) -> Option<String>) -> Self {
        let file = file.unwrap_or_default();

        let database_url = file
            .database
            .url
            .or_else(|| env("DATABASE_URL"))
            .unwrap_or_else(paths::default_db_path);
        let database_path = database_path_from_url(&database_url);
        tracing::info!("Using database: {}", database_path.display());

        let port = file
            .server
            .port
            .or_else(|| parse_env(&env, "PORT"))
            .unwrap_or(DEFAULT_PORT);

        let environment = file
            .server
            .environment
            .or_else(|| env("APP_ENV"))
            .map(|name| Environment::parse(&name))
            .unwrap_or(Environment::Development);

        let session_secret = match file.session.secret.or_else(|| env("SESSION_SECRET")) {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                if !environment.is_development() {
                    tracing::warn!("SESSION_SECRET is not set; falling back to the development secret");
                }
                DEV_SESSION_SECRET.to_string()
            }
        };

        let ttl_secs = file
            .session
            .ttl_secs
            .or_else(|| parse_env(&env, "SESSION_TTL_SECS"))
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);

        let public_dir = file
            .server
            .public_dir
            .or_else(|| env("PUBLIC_DIR"))
            .unwrap_or_else(|| paths::PUBLIC_DIR.to_string());

        let cookie_secure = file
            .server
            .cookie_secure
            .or_else(|| parse_env(&env, "COOKIE_SECURE"))
            .unwrap_or(false);

        let body_limit_bytes = file
            .server
            .body_limit_bytes
            .or_else(|| parse_env(&env, "BODY_LIMIT_BYTES"))
            .unwrap_or(DEFAULT_BODY_LIMIT_BYTES);

        Config {
            database_path,
            port,
            environment,
            session_secret,
            session_ttl: chrono::Duration::seconds(ttl_secs),
            public_dir: PathBuf::from(public_dir),
            cookie_secure,
            body_limit_bytes,
        }
    }

    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", SERVER_ADDR, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = env(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={}", key, raw);
            None
        }
    }
}

/// Accepts either a bare path or a `sqlite://` URL.
fn database_path_from_url(url: &str) -> PathBuf {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(None, env_of(&[]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.session_secret, DEV_SESSION_SECRET);
        assert_eq!(config.session_ttl, chrono::Duration::days(7));
        assert_eq!(config.public_dir, PathBuf::from("public"));
        assert!(config.database_path.ends_with("mytravel.db"));
        assert!(!config.cookie_secure);
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = Config::resolve(
            None,
            env_of(&[
                ("PORT", "8080"),
                ("APP_ENV", "production"),
                ("DATABASE_URL", "sqlite:///tmp/travel.db"),
                ("SESSION_SECRET", "s3cret"),
                ("SESSION_TTL_SECS", "60"),
            ]),
        );
        assert_eq!(config.port, 8080);
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.database_path, PathBuf::from("/tmp/travel.db"));
        assert_eq!(config.session_secret, "s3cret");
        assert_eq!(config.session_ttl, chrono::Duration::seconds(60));
    }

    #[test]
    fn test_file_overrides_env() {
        let file: FileConfig = toml::from_str(
            r#"
            [server]
            port = 4000

            [database]
            url = "travel.db"
            "#,
        )
        .unwrap();
        let config = Config::resolve(
            Some(file),
            env_of(&[("PORT", "8080"), ("DATABASE_URL", "other.db")]),
        );
        assert_eq!(config.port, 4000);
        assert_eq!(config.database_path, PathBuf::from("travel.db"));
    }

    #[test]
    fn test_unparsable_env_falls_back() {
        let config = Config::resolve(None, env_of(&[("PORT", "not-a-port"), ("SESSION_TTL_SECS", "-5")]));
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.session_ttl, chrono::Duration::seconds(DEFAULT_SESSION_TTL_SECS));
    }

    #[test]
    fn test_environment_parse() {
        assert!(Environment::parse("development").is_development());
        assert!(Environment::parse(" Development ").is_development());
        assert!(!Environment::parse("production").is_development());
        assert!(!Environment::parse("test").is_development());
    }

    #[test]
    fn test_bind_addr() {
        let config = Config::resolve(None, env_of(&[("PORT", "3100")]));
        assert_eq!(config.bind_addr(), "0.0.0.0:3100");
    }
}
