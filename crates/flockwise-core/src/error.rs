//! Error types for the Flockwise system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FarmError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Constraint violated on {entity}: {constraint}")]
    ConstraintViolation { entity: String, constraint: String },

    #[error("Invalid batch transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Tenant context missing")]
    TenantContextMissing,

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Concurrent modification of {entity} {id}")]
    Conflict { entity: String, id: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type FarmResult<T> = Result<T, FarmError>;
