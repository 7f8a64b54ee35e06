//! Flockwise Service: batch lifecycle orchestration, team-context
//! authorization and harvest reconciliation on top of the repository
//! traits.

pub mod batch;
pub mod config;
pub mod notify;
pub mod team_context;

pub use batch::BatchService;
pub use config::{OpsConfig, OverMortalityPolicy};
pub use notify::{DiscrepancyNotifier, TracingNotifier};
pub use team_context::TeamContextService;
