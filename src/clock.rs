use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

// Time source for the cache and the rate limiter
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

// Real clock, just Instant::now()
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub(crate) fn system() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockClock;
    use std::time::Duration;

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(5));
        assert!(clock.now() > t1);
    }

    #[test]
    fn mock_clock_clones_share_time() {
        let clock = MockClock::default();
        let other = clock.clone();
        let start = clock.now();

        other.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), start + Duration::from_secs(90));
    }
}
