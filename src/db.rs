use crate::config::MigratorConfig;
use crate::errors::MigrationError;
use metrics::{counter, gauge};
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

impl DbConfig {
    /// Pool settings for the source store described by `cfg`.
    pub fn source(cfg: &MigratorConfig) -> Self {
        Self::with_url(cfg, &cfg.source_database_url)
    }

    /// Pool settings for a SQL-backed target store described by `cfg`.
    pub fn target(cfg: &MigratorConfig) -> Self {
        Self::with_url(cfg, &cfg.target_database_url)
    }

    fn with_url(cfg: &MigratorConfig, url: &str) -> Self {
        let mut db_cfg = Self {
            url: url.to_string(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        };
        // Every pooled connection to an in-memory SQLite database sees its own
        // empty database, so the pool must hold exactly one.
        if is_sqlite_memory(url) {
            db_cfg.max_connections = 1;
            db_cfg.min_connections = 1;
        }
        db_cfg
    }
}

fn is_sqlite_memory(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}

/// Establishes a connection pool to the database with custom configuration
///
/// # Errors
/// Returns a `MigrationError` if the connection cannot be established
pub async fn establish_connection_with_config(
    config: &DbConfig,
) -> Result<DbPool, MigrationError> {
    debug!("Configuring database connection with: {:?}", config);

    let mut opt = ConnectOptions::new(config.url.clone());

    opt.max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(config.connect_timeout)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .sqlx_logging(false);

    gauge!("migrator_db.max_connections", config.max_connections as f64);

    info!(
        "Connecting to database with max_connections={}",
        config.max_connections
    );

    let db_pool = Database::connect(opt).await.map_err(|e| {
        error!("Database connection failed: {}", e);
        counter!("migrator_db.connection_failures", 1);
        MigrationError::Database(e)
    })?;

    info!("Database connection pool established successfully");

    Ok(db_pool)
}

/// Checks if the database connection is active
pub async fn check_connection(pool: &DbPool) -> Result<(), MigrationError> {
    debug!("Checking database connection");
    let start = std::time::Instant::now();

    let result = pool.ping().await.map_err(MigrationError::Database);

    let elapsed = start.elapsed();
    match &result {
        Ok(_) => {
            debug!("Database connection check successful in {:?}", elapsed);
            gauge!("migrator_db.connection_latency", elapsed.as_millis() as f64);
        }
        Err(e) => {
            error!(
                "Database connection check failed after {:?}: {}",
                elapsed, e
            );
            counter!("migrator_db.connection_failures", 1);
        }
    }

    result
}

/// Closes the database connection pool
pub async fn close_pool(pool: DbPool) -> Result<(), MigrationError> {
    info!("Closing database connection pool");

    pool.close().await.map_err(MigrationError::Database)
}
