//! Validation options

use chrono::{DateTime, Utc};

/// How a missing recommended property is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecommendedPolicy {
    /// Not reported at all
    Ignore,
    /// Reported as a non-fatal advisory and logged
    #[default]
    Warn,
    /// Treated like a missing required property
    Error,
}

/// Options for a validation run
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub recommended: RecommendedPolicy,
    /// Fixed "now" for temporal rules; wall clock when `None`
    pub reference_time: Option<DateTime<Utc>>,
}

impl ValidateOptions {
    pub fn now(&self) -> DateTime<Utc> {
        self.reference_time.unwrap_or_else(Utc::now)
    }
}
