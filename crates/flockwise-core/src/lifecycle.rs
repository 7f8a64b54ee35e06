//! Batch lifecycle state machine.
//!
//! These functions mutate an in-memory [`Batch`] and never touch
//! storage; the service layer persists the result atomically. Every
//! operation validates first and mutates second, so a failed call
//! leaves the batch untouched.

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::FarmError;
use crate::models::batch::{Batch, BatchStatus};

#[derive(Debug, Error, PartialEq)]
pub enum LifecycleError {
    #[error("cannot move batch from {from} to {to}")]
    InvalidTransition { from: BatchStatus, to: BatchStatus },

    #[error("quantity {requested} exceeds initial quantity {initial}")]
    QuantityExceedsInitial { requested: u32, initial: u32 },

    #[error("average weight must be a positive number of kilograms, got {0}")]
    InvalidWeight(f64),
}

impl From<LifecycleError> for FarmError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { from, to } => FarmError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            },
            other => FarmError::Validation {
                message: other.to_string(),
            },
        }
    }
}

/// Result of applying a day's mortality to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MortalityOutcome {
    pub previous_quantity: u32,
    pub current_quantity: u32,
    /// Deaths that could not be subtracted because stock hit zero.
    pub excess: u32,
}

/// Move `batch` to `target` if the state table allows it.
///
/// `actual_end_date` is set to `today` only on entry into `Closed`.
pub fn transition(
    batch: &mut Batch,
    target: BatchStatus,
    today: NaiveDate,
) -> Result<(), LifecycleError> {
    if !batch.status.can_transition_to(target) {
        return Err(LifecycleError::InvalidTransition {
            from: batch.status,
            to: target,
        });
    }

    batch.status = target;
    if target == BatchStatus::Closed {
        batch.actual_end_date = Some(today);
    }
    Ok(())
}

/// Subtract a day's deaths from the live count, clamping at zero.
pub fn record_mortality(batch: &mut Batch, mortality_count: u32) -> MortalityOutcome {
    let previous = batch.current_quantity;
    let current = previous.saturating_sub(mortality_count);
    batch.current_quantity = current;
    MortalityOutcome {
        previous_quantity: previous,
        current_quantity: current,
        excess: mortality_count.saturating_sub(previous),
    }
}

/// Record the final average weight and close a harvesting batch.
pub fn close_batch(
    batch: &mut Batch,
    final_average_weight_kg: f64,
    today: NaiveDate,
) -> Result<(), LifecycleError> {
    if batch.status != BatchStatus::Harvesting {
        return Err(LifecycleError::InvalidTransition {
            from: batch.status,
            to: BatchStatus::Closed,
        });
    }
    if !final_average_weight_kg.is_finite() || final_average_weight_kg <= 0.0 {
        return Err(LifecycleError::InvalidWeight(final_average_weight_kg));
    }

    transition(batch, BatchStatus::Closed, today)?;
    batch.average_weight_kg = Some(final_average_weight_kg);
    Ok(())
}

/// Overwrite the live count after a physical recount.
pub fn correct_quantity(batch: &mut Batch, quantity: u32) -> Result<(), LifecycleError> {
    if quantity > batch.initial_quantity {
        return Err(LifecycleError::QuantityExceedsInitial {
            requested: quantity,
            initial: batch.initial_quantity,
        });
    }
    batch.current_quantity = quantity;
    Ok(())
}
