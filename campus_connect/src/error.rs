//! Campus Connect - Error Types

use thiserror::Error;

use crate::biometrics::CredentialFailure;

/// Result type for campus operations
pub type CampusResult<T> = Result<T, CampusError>;

/// Campus error types
#[derive(Error, Debug)]
pub enum CampusError {
    // ═══════════════════════════════════════════════════════════════
    // AUTHENTICATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Not authenticated - unlock the app first")]
    NotAuthenticated,

    #[error("Credential check failed: {0}")]
    Credential(#[from] CredentialFailure),

    // ═══════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unsupported store schema version {found} (newest known: {supported})")]
    SchemaTooNew { found: i64, supported: i64 },

    #[error("Legacy favorites unreadable: {0}")]
    LegacyFormat(String),

    #[error("Unknown favorite kind: {0}")]
    UnknownKind(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════
    // CONFIG / SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl CampusError {
    /// Errors the user can clear by retrying or switching credential method
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            CampusError::NotAuthenticated | CampusError::Credential(_)
        )
    }
}

impl From<rusqlite::Error> for CampusError {
    fn from(e: rusqlite::Error) -> Self {
        CampusError::DatabaseError(e.to_string())
    }
}

impl From<serde_json::Error> for CampusError {
    fn from(e: serde_json::Error) -> Self {
        CampusError::SerializationError(e.to_string())
    }
}
