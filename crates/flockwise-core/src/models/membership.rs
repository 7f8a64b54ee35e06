//! Team membership: the User x Team association.
//!
//! The role lives on the membership, not on the user, so the same user
//! can be an owner in one team and a viewer in another.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TeamRole {
    Owner,
    Manager,
    Worker,
    Viewer,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Owner => "Owner",
            TeamRole::Manager => "Manager",
            TeamRole::Worker => "Worker",
            TeamRole::Viewer => "Viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Owner" => Some(TeamRole::Owner),
            "Manager" => Some(TeamRole::Manager),
            "Worker" => Some(TeamRole::Worker),
            "Viewer" => Some(TeamRole::Viewer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub role: TeamRole,
}
