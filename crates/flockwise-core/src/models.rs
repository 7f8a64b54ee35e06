//! Domain models for Flockwise.
//!
//! Teams and users are global. Everything a team owns carries a
//! `tenant_id` and implements [`crate::tenancy::TenantOwned`].

pub mod batch;
pub mod daily_log;
pub mod expense;
pub mod membership;
pub mod team;
pub mod user;
