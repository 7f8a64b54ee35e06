//! Operational configuration for the service layer.

/// What to do with a daily log whose mortality exceeds the live count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverMortalityPolicy {
    /// Accept the log and clamp the live count at zero.
    #[default]
    Clamp,
    /// Refuse the log as a data-entry error.
    Reject,
}

impl OverMortalityPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clamp => "clamp",
            Self::Reject => "reject",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" => Some(Self::Clamp),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Configuration for [`crate::BatchService`].
#[derive(Debug, Clone)]
pub struct OpsConfig {
    /// Page size used when a listing call does not pass one (default: 50).
    pub default_page_size: u64,
    pub over_mortality_policy: OverMortalityPolicy,
    /// Harvest shortfall, in head, tolerated before a discrepancy is
    /// raised (default: 0).
    pub discrepancy_tolerance: u32,
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            over_mortality_policy: OverMortalityPolicy::Clamp,
            discrepancy_tolerance: 0,
        }
    }
}
