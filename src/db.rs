use crate::config::{redact_url, AppConfig, StorageTarget};
use crate::errors::AppError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::time::Duration;
use tracing::{debug, error, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Configuration for database connection
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
    /// Idle timeout duration
    pub idle_timeout: Duration,
    /// Acquire connection timeout
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl DbConfig {
    /// Pool settings from the application config, pointed at `target`
    pub fn for_target(cfg: &AppConfig, target: &StorageTarget) -> Self {
        Self {
            url: target.connection_url(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Establishes a connection pool to the database with default pool settings
///
/// # Errors
/// Returns an `AppError` if the connection cannot be established
pub async fn establish_connection(database_url: &str) -> Result<DbPool, AppError> {
    let config = DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    };

    establish_connection_with_config(&config).await
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns an `AppError` if the connection cannot be established
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, AppError> {
    debug!(
        url = %redact_url(&config.url),
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Configuring database connection"
    );

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(true);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection establishment failed: {}", e);
        AppError::DatabaseError(e)
    })?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Establish DB pool for the storage target selected by the configuration
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, AppError> {
    let target = cfg
        .storage_target()
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    info!(backend = target.backend_name(), "Selected storage backend");

    establish_connection_with_config(&DbConfig::for_target(cfg, &target)).await
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), AppError> {
    debug!("Checking database connection");
    let start = std::time::Instant::now();

    let result = pool.ping().await.map_err(AppError::DatabaseError);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => debug!("Database connection check successful in {:?}", elapsed),
        Err(e) => error!(
            "Database connection check failed after {:?}: {}",
            elapsed, e
        ),
    }

    result
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), AppError> {
    info!("Closing database connection pool");

    pool.close().await.map_err(AppError::DatabaseError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectionTrait, DbBackend};

    #[tokio::test]
    async fn connects_to_sqlite_and_pings() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("ping.db").display());

        let pool = establish_connection(&url).await.unwrap();
        assert_eq!(pool.get_database_backend(), DbBackend::Sqlite);
        assert!(check_connection(&pool).await.is_ok());
        close_pool(pool).await.unwrap();
    }

    #[tokio::test]
    async fn app_config_selects_sqlite_file_in_development() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = AppConfig::new("development".into(), None);
        cfg.db_file = dir.path().join("dev.db").display().to_string();

        let pool = establish_connection_from_app_config(&cfg).await.unwrap();
        assert_eq!(pool.get_database_backend(), DbBackend::Sqlite);
        assert!(dir.path().join("dev.db").exists());
    }

    #[tokio::test]
    async fn production_without_url_fails_before_connecting() {
        let cfg = AppConfig::new("production".into(), None);
        match establish_connection_from_app_config(&cfg).await {
            Err(AppError::InternalError(_)) => {}
            other => panic!("expected a configuration error, got {:?}", other.err()),
        }
    }
}
