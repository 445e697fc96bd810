//! Shared health-reporting types used by every provider-like component.

use serde::{Deserialize, Serialize};

/// Health status ordering matches `healthy > degraded > unavailable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Unavailable,
    Degraded,
    Healthy,
}

impl HealthStatus {
    /// Combine two statuses, keeping the worse of the two.
    pub fn worst(self, other: Self) -> Self {
        self.min(other)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub status: HealthStatus,
    pub details: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_prefers_unavailable() {
        assert_eq!(
            HealthStatus::Healthy.worst(HealthStatus::Unavailable),
            HealthStatus::Unavailable
        );
    }

    #[test]
    fn worst_of_equal_is_same() {
        assert_eq!(
            HealthStatus::Degraded.worst(HealthStatus::Degraded),
            HealthStatus::Degraded
        );
    }
}
