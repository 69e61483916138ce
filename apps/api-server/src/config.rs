//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quill_infra::{JwtConfig, PasswordConfig, RateLimitConfig};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: Option<DatabaseSettings>,
    /// Public base URL; stored files are served under `{app_url}/storage/`.
    pub app_url: String,
    /// Root of the public disk.
    pub storage_path: PathBuf,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub rate_limit: RateLimitConfig,
    pub redis_url: Option<String>,
    pub json_logs: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Apply pending migrations on startup.
    pub run_migrations: bool,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| lookup(key).and_then(|v| parse::<u64>(&v));
        let flag = |key: &str| {
            lookup(key).is_some_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        };

        let database = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .map(|url| DatabaseSettings {
                url,
                max_connections: lookup("DB_MAX_CONNECTIONS")
                    .and_then(|v| parse(&v))
                    .unwrap_or(20),
                min_connections: lookup("DB_MIN_CONNECTIONS")
                    .and_then(|v| parse(&v))
                    .unwrap_or(2),
                run_migrations: flag("RUN_MIGRATIONS"),
            });

        let port = lookup("PORT").and_then(|v| parse(&v)).unwrap_or(8080);
        let app_url = lookup("APP_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let defaults = JwtConfig::default();
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").unwrap_or(defaults.secret),
            expiration_hours: lookup("JWT_EXPIRATION_HOURS")
                .and_then(|v| parse(&v))
                .unwrap_or(defaults.expiration_hours),
            issuer: lookup("JWT_ISSUER").unwrap_or(defaults.issuer),
        };

        let costs = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: lookup("PASSWORD_MEMORY_KIB")
                .and_then(|v| parse(&v))
                .unwrap_or(costs.memory_kib),
            iterations: lookup("PASSWORD_ITERATIONS")
                .and_then(|v| parse(&v))
                .unwrap_or(costs.iterations),
            parallelism: costs.parallelism,
        };

        let limits = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: lookup("RATE_LIMIT_MAX_REQUESTS")
                .and_then(|v| parse(&v))
                .unwrap_or(limits.max_requests),
            window: parsed("RATE_LIMIT_WINDOW_SECS")
                .map(Duration::from_secs)
                .unwrap_or(limits.window),
        };

        Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database,
            app_url,
            storage_path: lookup("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("storage/app/public")),
            jwt,
            password,
            rate_limit,
            redis_url: lookup("REDIS_URL").filter(|url| !url.is_empty()),
            json_logs: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        }
    }
}

fn parse<T: FromStr>(value: &str) -> Option<T> {
    value.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config(&[]);

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert!(config.database.is_none());
        assert_eq!(config.app_url, "http://localhost:8080");
        assert_eq!(config.jwt.expiration_hours, 24);
        assert_eq!(config.password, PasswordConfig::default());
        assert!(!config.json_logs);
    }

    #[test]
    fn reads_database_and_limits() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/quill"),
            ("DB_MAX_CONNECTIONS", "50"),
            ("RUN_MIGRATIONS", "true"),
            ("RATE_LIMIT_MAX_REQUESTS", "3"),
            ("RATE_LIMIT_WINDOW_SECS", "30"),
            ("APP_URL", "https://blog.example.com/"),
            ("LOG_FORMAT", "JSON"),
            ("PASSWORD_MEMORY_KIB", "65536"),
            ("PASSWORD_ITERATIONS", "3"),
        ]);

        let db = config.database.unwrap();
        assert_eq!(db.max_connections, 50);
        assert_eq!(db.min_connections, 2);
        assert!(db.run_migrations);
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window, Duration::from_secs(30));
        assert_eq!(config.app_url, "https://blog.example.com");
        assert!(config.json_logs);
        assert_eq!(config.password.memory_kib, 65536);
        assert_eq!(config.password.iterations, 3);
    }

    #[test]
    fn garbage_numbers_fall_back() {
        let config = config(&[("PORT", "eighty"), ("JWT_EXPIRATION_HOURS", "-")]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt.expiration_hours, 24);
    }
}
