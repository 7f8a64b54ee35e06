//! Database-specific error types and conversions.

use flockwise_core::error::FarmError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Cannot reach SurrealDB at {url}: {source}")]
    Connection {
        url: String,
        #[source]
        source: surrealdb::Error,
    },

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Unique constraint {constraint} violated on {entity}")]
    Constraint { entity: String, constraint: String },

    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Malformed {entity} row: {message}")]
    Decode { entity: String, message: String },

    #[error("Password hashing failed: {0}")]
    Hash(String),
}

impl DbError {
    /// Map a failed statement to [`DbError::Constraint`] when it was
    /// rejected by a unique index, otherwise keep the SurrealDB error.
    pub fn classify(entity: &str, err: surrealdb::Error) -> Self {
        match unique_index_name(&err.to_string()) {
            Some(constraint) => DbError::Constraint {
                entity: entity.into(),
                constraint,
            },
            None => DbError::Surreal(err),
        }
    }

    pub(crate) fn decode(entity: &str, message: impl Into<String>) -> Self {
        DbError::Decode {
            entity: entity.into(),
            message: message.into(),
        }
    }
}

/// Extract the index name from a SurrealDB unique violation message,
/// e.g. ``Database index `idx_batch_number` already contains ...``.
fn unique_index_name(message: &str) -> Option<String> {
    if !message.contains("already contains") {
        return None;
    }
    let start = message.find("index `")? + "index `".len();
    let len = message[start..].find('`')?;
    Some(message[start..start + len].to_string())
}

impl From<DbError> for FarmError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => FarmError::NotFound { entity, id },
            DbError::Constraint { entity, constraint } => {
                FarmError::ConstraintViolation { entity, constraint }
            }
            DbError::Conflict { entity, id } => FarmError::Conflict { entity, id },
            other => FarmError::Database(other.to_string()),
        }
    }
}
