//! Batch domain model.
//!
//! A batch is one production cohort of livestock tracked from intake to
//! closure. Its status moves strictly forward through
//! `Planned -> Active -> Harvesting -> Closed`.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenancy::TenantOwned;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BatchStatus {
    Planned,
    Active,
    Harvesting,
    Closed,
}

/// Every legal `(from, to)` pair. Anything not listed is rejected,
/// including self-transitions.
const TRANSITIONS: &[(BatchStatus, BatchStatus)] = &[
    (BatchStatus::Planned, BatchStatus::Active),
    (BatchStatus::Active, BatchStatus::Harvesting),
    (BatchStatus::Harvesting, BatchStatus::Closed),
];

/// `(label, color)` per status, indexed by discriminant.
const PRESENTATION: [(&str, &str); 4] = [
    ("Planned", "gray"),
    ("Active", "success"),
    ("Harvesting", "warning"),
    ("Closed", "danger"),
];

impl BatchStatus {
    pub const ALL: [BatchStatus; 4] = [
        BatchStatus::Planned,
        BatchStatus::Active,
        BatchStatus::Harvesting,
        BatchStatus::Closed,
    ];

    pub fn can_transition_to(self, target: BatchStatus) -> bool {
        TRANSITIONS.contains(&(self, target))
    }

    /// The single status reachable from `self`, if any.
    pub fn next(self) -> Option<BatchStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, _)| *from == self)
            .map(|(_, to)| *to)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    pub fn label(self) -> &'static str {
        PRESENTATION[self as usize].0
    }

    /// Badge color used by the admin panel.
    pub fn color(self) -> &'static str {
        PRESENTATION[self as usize].1
    }

    pub fn as_str(self) -> &'static str {
        self.label()
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    /// Unique within the owning team.
    pub batch_number: String,
    pub start_date: NaiveDate,
    pub expected_end_date: Option<NaiveDate>,
    /// Set only on the transition into `Closed`.
    pub actual_end_date: Option<NaiveDate>,
    pub status: BatchStatus,
    /// Head count at intake. Never changes after creation.
    pub initial_quantity: u32,
    /// Head count alive. Always `<= initial_quantity`.
    pub current_quantity: u32,
    pub target_weight_kg: Option<f64>,
    pub average_weight_kg: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    /// Days between intake and closure, or `as_of` while still open.
    pub fn age_in_days(&self, as_of: NaiveDate) -> i64 {
        let end = self.actual_end_date.unwrap_or(as_of);
        (end - self.start_date).num_days()
    }
}

impl TenantOwned for Batch {
    const TABLE: &'static str = "batch";

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBatch {
    pub tenant_id: Uuid,
    pub name: String,
    pub batch_number: String,
    pub start_date: NaiveDate,
    pub expected_end_date: Option<NaiveDate>,
    pub initial_quantity: u32,
    pub target_weight_kg: Option<f64>,
}

/// Optional filters for batch listing.
#[derive(Debug, Clone, Default)]
pub struct BatchFilter {
    pub status: Option<BatchStatus>,
}

/// The fields a lifecycle operation may change, persisted only if the
/// stored status and live count still equal the values they were
/// derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleUpdate {
    pub expected_status: BatchStatus,
    pub expected_quantity: u32,
    pub status: BatchStatus,
    pub current_quantity: u32,
    pub actual_end_date: Option<NaiveDate>,
    pub average_weight_kg: Option<f64>,
}

impl LifecycleUpdate {
    /// Capture the lifecycle fields of `after`, guarded by the state of
    /// `before` as it was loaded.
    pub fn between(before: &Batch, after: &Batch) -> Self {
        Self {
            expected_status: before.status,
            expected_quantity: before.current_quantity,
            status: after.status,
            current_quantity: after.current_quantity,
            actual_end_date: after.actual_end_date,
            average_weight_kg: after.average_weight_kg,
        }
    }
}
