//! Flockwise Core. Domain models, repository traits and the pure
//! business rules of batch production, with no I/O.

pub mod discrepancy;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod models;
pub mod repository;
pub mod tenancy;
