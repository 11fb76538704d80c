use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_BATCH_SIZE: u64 = 500;

/// Environment variables carrying the two connection strings.
pub const SOURCE_URL_ENV: &str = "SOURCE_DATABASE_URL";
pub const TARGET_URL_ENV: &str = "TARGET_DATABASE_URL";

/// Scheme selecting the in-process document store.
pub const MEMORY_TARGET_SCHEME: &str = "memory://";

/// Migration engine configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MigratorConfig {
    /// Relational store the engine reads from
    #[validate(custom = "validate_url")]
    pub source_database_url: String,

    /// Document store the engine writes to (`memory://` for a dry run)
    #[validate(custom = "validate_url")]
    pub target_database_url: String,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Rows read per extractor page and documents per bulk insert
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1, max = 10000))]
    pub batch_size: u64,

    /// Skip a phase whose primary collection already holds documents
    #[serde(default = "default_true_bool")]
    pub skip_existing: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
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
}

impl MigratorConfig {
    /// Creates a configuration with defaults for everything but the two stores.
    pub fn new(source_database_url: String, target_database_url: String) -> Self {
        Self {
            source_database_url,
            target_database_url,
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            batch_size: default_batch_size(),
            skip_existing: default_true_bool(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// True when the target is the in-process store.
    pub fn uses_memory_target(&self) -> bool {
        self.target_database_url.starts_with(MEMORY_TARGET_SCHEME)
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

fn default_true_bool() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    8
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
    30
}

fn config_file(config_dir: &Path, name: &str) -> String {
    config_dir.join(name).to_string_lossy().into_owned()
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

fn validate_url(url: &str) -> Result<(), ValidationError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("database_url");
        err.message = Some(
            format!("Connection string is required; set {SOURCE_URL_ENV} and {TARGET_URL_ENV}")
                .into(),
        );
        return Err(err);
    }
    if !trimmed.contains("://") && !trimmed.starts_with("sqlite:") {
        let mut err = ValidationError::new("database_url");
        err.message = Some("Connection string must include a scheme".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("commerce_migrator={},sqlx=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

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

/// Loads migrator configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
/// 5. SOURCE_DATABASE_URL / TARGET_DATABASE_URL
pub fn load_config() -> Result<MigratorConfig, AppConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Same as [`load_config`] with an explicit config directory. Runs before
/// tracing is initialized, so problems are reported through the returned error.
pub fn load_config_from(config_dir: &Path) -> Result<MigratorConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    let config = Config::builder()
        .set_default("source_database_url", "")?
        .set_default("target_database_url", "")?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("batch_size", DEFAULT_BATCH_SIZE as i64)?
        .add_source(File::with_name(&config_file(config_dir, "default")).required(false))
        .add_source(File::with_name(&config_file(config_dir, &run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .set_override_option("source_database_url", env::var(SOURCE_URL_ENV).ok())?
        .set_override_option("target_database_url", env::var(TARGET_URL_ENV).ok())?
        .build()?;

    let migrator_config: MigratorConfig = config.try_deserialize()?;

    migrator_config.validate()?;
    Ok(migrator_config)
}
