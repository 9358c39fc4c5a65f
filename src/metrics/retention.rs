use std::time::Duration;

use crate::error::ConfigError;

/// Bounds on the snapshot history.
///
/// `buffer_cap` is enforced on every record; `retention` is enforced only
/// when a cleanup sweep runs, once per `cleanup_interval`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub buffer_cap: usize,
    pub retention: Duration,
    pub cleanup_interval: Duration,
}

impl RetentionPolicy {
    pub fn new(
        buffer_cap: usize,
        retention: Duration,
        cleanup_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if buffer_cap == 0 {
            return Err(ConfigError::Invalid {
                field: "history.buffer_cap",
                reason: "must be greater than 0".to_string(),
            });
        }
        if retention.is_zero() {
            return Err(ConfigError::Invalid {
                field: "history.retention_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        if cleanup_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "history.cleanup_interval_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(Self {
            buffer_cap,
            retention,
            cleanup_interval,
        })
    }

    /// Whether a sweep is due given the time since the previous one.
    pub fn cleanup_due(&self, since_last_cleanup: Duration) -> bool {
        since_last_cleanup > self.cleanup_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_bounds() {
        let secs = Duration::from_secs;
        assert!(RetentionPolicy::new(0, secs(5), secs(60)).is_err());
        assert!(RetentionPolicy::new(3, Duration::ZERO, secs(60)).is_err());
        assert!(RetentionPolicy::new(3, secs(5), Duration::ZERO).is_err());
        assert!(RetentionPolicy::new(3, secs(5), secs(60)).is_ok());
    }

    #[test]
    fn cleanup_due_only_after_interval_elapsed() {
        let policy =
            RetentionPolicy::new(10, Duration::from_secs(300), Duration::from_secs(60)).unwrap();
        assert!(!policy.cleanup_due(Duration::from_secs(59)));
        assert!(!policy.cleanup_due(Duration::from_secs(60)));
        assert!(policy.cleanup_due(Duration::from_secs(61)));
    }
}
