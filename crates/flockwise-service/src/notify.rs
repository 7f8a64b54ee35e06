//! Delivery seam for harvest discrepancies.

use flockwise_core::discrepancy::Discrepancy;
use flockwise_core::error::FarmResult;
use tracing::warn;

/// Receives discrepancies detected during harvest reconciliation.
///
/// Implementations decide how the alert leaves the process (mail,
/// queue, webhook). The service only calls `notify` once per detected
/// shortfall.
pub trait DiscrepancyNotifier: Send + Sync {
    fn notify(&self, discrepancy: &Discrepancy) -> impl Future<Output = FarmResult<()>> + Send;
}

/// Default notifier: emits a structured warning and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl DiscrepancyNotifier for TracingNotifier {
    async fn notify(&self, discrepancy: &Discrepancy) -> FarmResult<()> {
        warn!(
            tenant_id = %discrepancy.tenant_id,
            batch_id = %discrepancy.batch_id,
            expected = discrepancy.expected_quantity,
            actual = discrepancy.actual_quantity,
            shortfall = discrepancy.shortfall(),
            "Harvest count discrepancy"
        );
        Ok(())
    }
}
