//! Harvest count discrepancy detection.
//!
//! Only decides *that* a shortfall exists; delivering an alert is the
//! job of a notifier in the service layer.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub tenant_id: Uuid,
    pub batch_id: Uuid,
    pub expected_quantity: u32,
    pub actual_quantity: u32,
}

impl Discrepancy {
    pub fn shortfall(&self) -> u32 {
        self.expected_quantity.saturating_sub(self.actual_quantity)
    }
}

/// Returns a discrepancy when `actual` falls short of `expected` by
/// more than `tolerance` head.
pub fn detect(
    tenant_id: Uuid,
    batch_id: Uuid,
    expected_quantity: u32,
    actual_quantity: u32,
    tolerance: u32,
) -> Option<Discrepancy> {
    if expected_quantity <= actual_quantity {
        return None;
    }
    if expected_quantity - actual_quantity <= tolerance {
        return None;
    }
    Some(Discrepancy {
        tenant_id,
        batch_id,
        expected_quantity,
        actual_quantity,
    })
}
