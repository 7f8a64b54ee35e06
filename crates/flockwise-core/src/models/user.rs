//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user may belong to several teams. The team the user is currently
/// working in is stored on the user and acts as the ambient tenant
/// context when a request does not name one explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// `None` while onboarding, before the user has joined a team.
    pub current_team_id: Option<Uuid>,
    /// Platform operators that may run cross-tenant queries.
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    /// Raw password (will be hashed with Argon2id before storage).
    pub password: String,
    pub is_super_admin: bool,
}
