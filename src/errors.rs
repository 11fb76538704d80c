use sea_orm::error::DbErr;
use serde::Serialize;
use std::error::Error as StdError;

/// Errors raised by a target document store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Target store unavailable: {0}")]
    Unavailable(String),

    /// An unordered bulk insert committed some documents but not all of them.
    #[error("Bulk write error: {inserted} of {attempted} documents inserted ({message})")]
    BulkWrite {
        inserted: u64,
        attempted: u64,
        message: String,
    },

    #[error("Target database error: {0}")]
    Database(#[from] DbErr),

    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the store itself is gone, as opposed to a single write being rejected.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(err) => is_connection_error(err),
            StoreError::BulkWrite { .. } | StoreError::Serialization(_) => false,
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Store error: {0}")]
    Store(
        #[from]
        #[serde(skip)]
        StoreError,
    ),

    #[error("Transform error for {entity} #{key}: {message}")]
    Transform {
        entity: String,
        key: String,
        message: String,
    },

    #[error(
        "CRITICAL: verification failed for {entity} ({check}): source count {source_count} != target count {target_count}"
    )]
    VerificationFailed {
        entity: String,
        check: String,
        source_count: u64,
        target_count: u64,
    },

    #[error("Illegal status transition for {phase}: {from} cannot accept {event}")]
    IllegalTransition {
        phase: String,
        from: String,
        event: String,
    },

    #[error("Phase {phase} is {state}; reset its status and clear its collections before rerunning")]
    ResetRequired { phase: String, state: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<serde_json::Error> for MigrationError {
    fn from(err: serde_json::Error) -> Self {
        MigrationError::Serialization(err.to_string())
    }
}

impl From<crate::config::AppConfigError> for MigrationError {
    fn from(err: crate::config::AppConfigError) -> Self {
        MigrationError::Config(err.to_string())
    }
}

impl MigrationError {
    pub fn transform(entity: &str, key: impl ToString, message: impl Into<String>) -> Self {
        MigrationError::Transform {
            entity: entity.to_string(),
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Fatal errors terminate the phase; everything else is absorbed and counted
    /// by the row or batch loop that observed it.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Database(err) => is_connection_error(err),
            Self::Store(err) => err.is_connection_failure(),
            Self::VerificationFailed { .. }
            | Self::IllegalTransition { .. }
            | Self::ResetRequired { .. }
            | Self::Config(_) => true,
            Self::Transform { .. } | Self::Serialization(_) | Self::Other(_) => false,
        }
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::VerificationFailed { .. })
    }

    /// Renders the error and its source chain, one cause per line. Causes
    /// already spelled out by the line before them are left out.
    pub fn error_chain(&self) -> String {
        let mut previous = self.to_string();
        let mut chain = previous.clone();
        let mut source = self.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !previous.contains(&text) {
                chain.push_str("\ncaused by: ");
                chain.push_str(&text);
            }
            previous = text;
            source = cause.source();
        }
        chain
    }
}

pub(crate) fn is_connection_error(err: &DbErr) -> bool {
    matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_))
}
