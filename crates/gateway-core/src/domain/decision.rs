use std::time::Duration;

/// Outcome of a single admission check. Computed per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests permitted per window; [`Decision::UNLIMITED`] for the passthrough.
    pub limit: u64,
    /// Requests still available in the current window.
    pub remaining: u64,
    /// How long a denied caller should wait. Zero when allowed.
    pub retry_after: Duration,
}

impl Decision {
    /// Sentinel for "no limit applies".
    pub const UNLIMITED: u64 = u64::MAX;

    pub fn allow(limit: u64, remaining: u64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            retry_after: Duration::ZERO,
        }
    }

    pub fn deny(limit: u64, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            retry_after,
        }
    }

    /// Decision returned when no admission control is applied.
    pub fn unlimited() -> Self {
        Self::allow(Self::UNLIMITED, Self::UNLIMITED)
    }

    pub fn is_unlimited(&self) -> bool {
        self.limit == Self::UNLIMITED
    }

    pub fn retry_after_millis(&self) -> u64 {
        u64::try_from(self.retry_after.as_millis()).unwrap_or(u64::MAX)
    }

    /// Retry delay in whole seconds, rounded up, for the `Retry-After` header.
    pub fn retry_after_secs_ceil(&self) -> u64 {
        self.retry_after_millis().div_ceil(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_rounds_up_to_whole_seconds() {
        let decision = Decision::deny(10, Duration::from_millis(1));
        assert_eq!(decision.retry_after_millis(), 1);
        assert_eq!(decision.retry_after_secs_ceil(), 1);

        let decision = Decision::deny(10, Duration::from_millis(2000));
        assert_eq!(decision.retry_after_secs_ceil(), 2);

        let decision = Decision::deny(10, Duration::from_millis(2001));
        assert_eq!(decision.retry_after_secs_ceil(), 3);
    }

    #[test]
    fn test_unlimited_decision() {
        let decision = Decision::unlimited();
        assert!(decision.allowed);
        assert!(decision.is_unlimited());
        assert_eq!(decision.retry_after, Duration::ZERO);
    }
}
