use std::time::Duration;
use tokio::time::Instant;

/// A value paired with the instant after which it must be rebuilt.
///
/// Holders check [`ExpiringIndex::is_expired`] before trusting `value`.
#[derive(Debug, Clone)]
pub struct ExpiringIndex<T> {
    pub value: T,
    pub expires_at: Instant,
}

impl<T> ExpiringIndex<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at < now
    }

    /// The value, if it is still within its window.
    pub fn fresh(&self) -> Option<&T> {
        (!self.is_expired(Instant::now())).then_some(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fresh_until_ttl_elapses() {
        let entry = ExpiringIndex::new(42, Duration::from_secs(10));
        assert_eq!(entry.fresh(), Some(&42));

        tokio::time::advance(Duration::from_secs(9)).await;
        assert_eq!(entry.fresh(), Some(&42));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!entry.is_expired(Instant::now()));
        assert_eq!(entry.fresh(), Some(&42));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.is_expired(Instant::now()));
        assert_eq!(entry.fresh(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_expires_once_time_moves() {
        let entry = ExpiringIndex::new("x", Duration::ZERO);
        assert_eq!(entry.fresh(), Some(&"x"));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(entry.fresh().is_none());
    }
}
