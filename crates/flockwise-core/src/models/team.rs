//! Team (tenant) domain model.
//!
//! A team is an isolated customer organization. Every batch, daily log
//! and expense belongs to exactly one team and is never visible to
//! another team outside of an explicit admin bypass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "Free",
            SubscriptionTier::Pro => "Pro",
            SubscriptionTier::Enterprise => "Enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Free" => Some(SubscriptionTier::Free),
            "Pro" => Some(SubscriptionTier::Pro),
            "Enterprise" => Some(SubscriptionTier::Enterprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    /// Human-readable name.
    pub name: String,
    /// URL-safe unique identifier (e.g., `green-valley-farm`).
    pub slug: String,
    pub subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTeam {
    pub name: String,
    pub slug: String,
    pub subscription_tier: Option<SubscriptionTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub subscription_tier: Option<SubscriptionTier>,
}
