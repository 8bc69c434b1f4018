use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DB_FILE: &str = "leads.db";
const CONFIG_DIR: &str = "config";

/// Application configuration structure with validation
///
/// Unknown keys are ignored so unrelated `APP__*` variables in the process
/// environment cannot block startup.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Application environment: "development", "production" or "test"
    #[validate(custom = "validate_environment")]
    pub environment: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Database connection URL (`sqlite://...` or `postgres://...`)
    #[serde(default)]
    pub database_url: Option<String>,

    /// SQLite file used when no database URL is configured outside production
    #[serde(default = "default_db_file")]
    #[validate(length(min = 1))]
    pub db_file: String,

    /// Use TLS for Postgres connections
    #[serde(default)]
    pub db_tls: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format
    #[serde(default)]
    pub log_json: bool,

    /// CORS: comma-separated list of allowed origins; permissive when unset
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Maximum request body size in bytes
    #[serde(default = "default_max_body_size")]
    #[validate(range(min = 1))]
    pub max_body_size: usize,
}

/// Where leads are stored, resolved from the configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageTarget {
    /// Embedded file-backed database
    Sqlite { url: String },
    /// Networked database server
    Postgres { url: String, tls: bool },
}

impl StorageTarget {
    /// Connection URL handed to the driver.
    ///
    /// For Postgres the TLS toggle becomes an `sslmode` parameter unless the
    /// URL already carries one.
    pub fn connection_url(&self) -> String {
        match self {
            Self::Sqlite { url } => url.clone(),
            Self::Postgres { url, tls } => {
                if url.contains("sslmode=") {
                    return url.clone();
                }
                let mode = if *tls { "require" } else { "disable" };
                let separator = if url.contains('?') { '&' } else { '?' };
                format!("{url}{separator}sslmode={mode}")
            }
        }
    }

    /// Short backend name for logs
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Sqlite { .. } => "sqlite",
            Self::Postgres { .. } => "postgres",
        }
    }
}

impl AppConfig {
    /// Creates a configuration with defaults for everything but the
    /// environment and database location
    pub fn new(environment: String, database_url: Option<String>) -> Self {
        Self {
            environment,
            host: DEFAULT_HOST.to_string(),
            port: default_port(),
            database_url,
            db_file: default_db_file(),
            db_tls: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            log_level: default_log_level(),
            log_json: false,
            cors_allowed_origins: None,
            max_body_size: default_max_body_size(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Parsed CORS origins, empty when none are configured
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolves the storage backend.
    ///
    /// An explicit database URL always wins. Without one, production refuses to
    /// start and every other environment falls back to the SQLite file in
    /// `db_file`.
    pub fn storage_target(&self) -> Result<StorageTarget, AppConfigError> {
        match self.database_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => {
                if url.starts_with("sqlite:") {
                    Ok(StorageTarget::Sqlite {
                        url: url.to_string(),
                    })
                } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
                    Ok(StorageTarget::Postgres {
                        url: url.to_string(),
                        tls: self.db_tls,
                    })
                } else {
                    Err(AppConfigError::Storage(format!(
                        "unsupported database URL scheme in '{}'; expected sqlite: or postgres://",
                        redact_url(url)
                    )))
                }
            }
            _ if self.is_production() => Err(AppConfigError::Storage(
                "database_url is required in production; set DATABASE_URL or APP__DATABASE_URL"
                    .to_string(),
            )),
            _ => Ok(StorageTarget::Sqlite {
                url: format!("sqlite://{}?mode=rwc", self.db_file),
            }),
        }
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections must not exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if let Err(storage_err) = self.storage_target() {
            let mut err = ValidationError::new("database_url");
            err.message = Some(storage_err.to_string().into());
            errors.add("database_url", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Storage configuration error: {0}")]
    Storage(String),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_file() -> String {
    DEFAULT_DB_FILE.to_string()
}

fn default_db_max_connections() -> u32 {
    10
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_max_body_size() -> usize {
    1024 * 1024
}

fn validate_environment(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "development" | "production" | "test" => Ok(()),
        _ => {
            let mut err = ValidationError::new("environment");
            err.message = Some("Must be one of: development, production, test".into());
            Err(err)
        }
    }
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Strips credentials from a connection URL before it reaches a log line
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

fn filter_directive(level: &str) -> String {
    env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("lead_capture_api={},tower_http=debug", level))
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_directive = filter_directive(level);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Plain subscriber for the window before the configured one is installed
pub fn bootstrap_subscriber() -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter_directive(
            DEFAULT_LOG_LEVEL,
        )))
        .finish()
}

/// Runs [`load_config`] with `subscriber` receiving its log lines.
///
/// The global subscriber depends on the loaded configuration, so it cannot
/// exist yet while loading.
pub fn load_config_logged<S>(subscriber: S) -> Result<AppConfig, AppConfigError>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::with_default(subscriber, load_config)
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
/// 5. Plain `PORT` and `DATABASE_URL`, as set by most hosting platforms
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let port_override = env::var("PORT")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            p.trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::Message(format!("invalid PORT '{}': {}", p, e)))
        })
        .transpose()?;
    let database_url_override = env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    let config = Config::builder()
        .set_default("environment", run_env.as_str())?
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("db_file", DEFAULT_DB_FILE)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .set_override_option("port", port_override.map(i64::from))?
        .set_override_option("database_url", database_url_override)?
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::{Arc, Mutex};

    fn base_config(environment: &str, url: Option<&str>) -> AppConfig {
        AppConfig::new(environment.into(), url.map(str::to_string))
    }

    #[test]
    fn development_without_url_uses_sqlite_file() {
        let mut cfg = base_config("development", None);
        cfg.db_file = "data/dev-leads.db".into();
        assert_eq!(
            cfg.storage_target().unwrap(),
            StorageTarget::Sqlite {
                url: "sqlite://data/dev-leads.db?mode=rwc".into()
            }
        );
    }

    #[test]
    fn production_requires_database_url() {
        let cfg = base_config("production", None);
        assert_matches!(cfg.storage_target(), Err(AppConfigError::Storage(_)));
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn production_with_postgres_url_passes() {
        let mut cfg = base_config("production", Some("postgres://app:pw@db:5432/leads"));
        cfg.db_tls = true;
        assert!(cfg.validate_additional_constraints().is_ok());
        assert_matches!(
            cfg.storage_target(),
            Ok(StorageTarget::Postgres { tls: true, .. })
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let cfg = base_config("development", Some("mysql://root@localhost/leads"));
        assert_matches!(cfg.storage_target(), Err(AppConfigError::Storage(_)));
    }

    #[test]
    fn blank_url_falls_back_to_sqlite_outside_production() {
        let cfg = base_config("test", Some("   "));
        assert_matches!(cfg.storage_target(), Ok(StorageTarget::Sqlite { .. }));
    }

    #[test]
    fn postgres_tls_toggle_sets_sslmode() {
        let on = StorageTarget::Postgres {
            url: "postgres://db/leads".into(),
            tls: true,
        };
        let off = StorageTarget::Postgres {
            url: "postgres://db/leads?application_name=leads".into(),
            tls: false,
        };
        let explicit = StorageTarget::Postgres {
            url: "postgres://db/leads?sslmode=verify-full".into(),
            tls: false,
        };
        assert_eq!(on.connection_url(), "postgres://db/leads?sslmode=require");
        assert_eq!(
            off.connection_url(),
            "postgres://db/leads?application_name=leads&sslmode=disable"
        );
        assert_eq!(
            explicit.connection_url(),
            "postgres://db/leads?sslmode=verify-full"
        );
    }

    #[test]
    fn min_connections_cannot_exceed_max() {
        let mut cfg = base_config("development", None);
        cfg.db_min_connections = 20;
        cfg.db_max_connections = 5;
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn derived_validation_rejects_unknown_environment_and_level() {
        let mut cfg = base_config("staging", None);
        cfg.log_level = "loud".into();
        let errors = cfg.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("environment"));
        assert!(errors.field_errors().contains_key("log_level"));
    }

    #[test]
    fn cors_origins_are_trimmed() {
        let mut cfg = base_config("development", None);
        cfg.cors_allowed_origins = Some(" https://a.example , ,https://b.example".into());
        assert_eq!(
            cfg.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn unrelated_keys_do_not_break_deserialization() {
        let config = Config::builder()
            .set_default("environment", "test")
            .unwrap()
            .set_default("host", DEFAULT_HOST)
            .unwrap()
            .set_override("feature_flags", "beta")
            .unwrap()
            .build()
            .unwrap();

        let cfg: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(cfg.environment, "test");
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.db_file, DEFAULT_DB_FILE);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn loading_logs_reach_the_given_subscriber() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        // The outcome depends on the process environment; only the log line matters here.
        let _ = load_config_logged(subscriber);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("Loading configuration for environment"));
    }

    #[test]
    fn redact_url_hides_credentials() {
        assert_eq!(
            redact_url("postgres://app:secret@db:5432/leads"),
            "postgres://***@db:5432/leads"
        );
        assert_eq!(redact_url("sqlite://leads.db"), "sqlite://leads.db");
    }
}
