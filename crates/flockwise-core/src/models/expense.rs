//! Expense domain model.
//!
//! An expense is either general team overhead or allocated to a single
//! batch. Allocation is a weak reference: deleting the expense never
//! touches the batch.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenancy::TenantOwned;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Allocation {
    #[default]
    General,
    Batch(Uuid),
}

impl Allocation {
    pub fn batch_id(&self) -> Option<Uuid> {
        match self {
            Allocation::General => None,
            Allocation::Batch(id) => Some(*id),
        }
    }
}

impl From<Option<Uuid>> for Allocation {
    fn from(batch_id: Option<Uuid>) -> Self {
        batch_id.map_or(Allocation::General, Allocation::Batch)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub description: String,
    /// Minor currency units.
    pub amount_cents: i64,
    pub incurred_on: NaiveDate,
    pub allocation: Allocation,
    pub created_at: DateTime<Utc>,
}

impl TenantOwned for Expense {
    const TABLE: &'static str = "expense";

    fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpense {
    pub tenant_id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    pub incurred_on: NaiveDate,
    pub allocation: Allocation,
}
