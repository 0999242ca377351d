use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub admin: AdminCredentials,
    pub uploads: UploadConfig,
    pub notify: NotifyConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// None only when the process runs against the in-memory store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub max_request_size_bytes: usize,
    pub expose_error_details: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub cors_origins: Vec<String>,
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

/// The single admin identity tokens are issued against.
#[derive(Clone, Serialize, Deserialize)]
pub struct AdminCredentials {
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub dir: PathBuf,
    pub public_base: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub webhook_url: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from the process environment. Secrets have no
    /// defaults; a missing one is a startup error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let mut config = Self::preset(
            environment,
            required("JWT_SECRET")?,
            AdminCredentials {
                email: required("ADMIN_EMAIL")?,
                password: required("ADMIN_PASSWORD")?,
            },
        );
        config.database.url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        config.with_env_overrides()
    }

    /// Fails when the configured store needs a database URL that is absent.
    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database
            .url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(v) = env::var("PORT") {
            self.server.port = parse("PORT", &v)?;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = parse("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = parse("API_MAX_REQUEST_SIZE_BYTES", &v)?;
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parse("SECURITY_JWT_EXPIRY_HOURS", &v)?;
        }
        if let Ok(v) = env::var("UPLOAD_DIR") {
            self.uploads.dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("UPLOAD_PUBLIC_BASE") {
            self.uploads.public_base = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("NOTIFY_WEBHOOK_URL") {
            self.notify.webhook_url = Some(v).filter(|v| !v.is_empty());
        }

        Ok(self)
    }

    /// Environment defaults. Secrets are always supplied by the caller.
    pub fn preset(environment: Environment, jwt_secret: String, admin: AdminCredentials) -> Self {
        let (max_connections, connection_timeout, cors_origins, jwt_expiry_hours, expose) =
            match environment {
                Environment::Development => (
                    5,
                    30,
                    vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                    24 * 30,
                    true,
                ),
                Environment::Staging => (10, 10, vec![], 24 * 7, true),
                Environment::Production => (20, 5, vec![], 24, false),
            };

        Self {
            environment,
            server: ServerConfig { port: 5000 },
            database: DatabaseConfig {
                url: None,
                max_connections,
                connection_timeout,
            },
            api: ApiConfig {
                // 10MB image plus multipart overhead
                max_request_size_bytes: 12 * 1024 * 1024,
                expose_error_details: expose,
            },
            security: SecurityConfig {
                cors_origins,
                jwt_secret,
                jwt_expiry_hours,
            },
            admin,
            uploads: UploadConfig {
                dir: PathBuf::from("uploads"),
                public_base: "/uploads".to_string(),
            },
            notify: NotifyConfig::default(),
        }
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> AdminCredentials {
        AdminCredentials {
            email: "admin@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn development_preset_exposes_error_details() {
        let config = AppConfig::preset(Environment::Development, "s".into(), admin());
        assert!(config.api.expose_error_details);
        assert!(!config.is_production());
        assert!(config.database_url().is_err());
    }

    #[test]
    fn production_preset_hides_error_details() {
        let config = AppConfig::preset(Environment::Production, "s".into(), admin());
        assert!(!config.api.expose_error_details);
        assert_eq!(config.security.jwt_expiry_hours, 24);
    }

    #[test]
    fn debug_output_redacts_password() {
        let rendered = format!("{:?}", admin());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("admin@example.com"));
    }

    #[test]
    fn rejects_unparseable_numbers() {
        assert!(parse::<u16>("PORT", "eighty").is_err());
        assert_eq!(parse::<u16>("PORT", " 8080 ").unwrap(), 8080);
    }
}
