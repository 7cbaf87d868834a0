use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

/// Single wall-clock abstraction used everywhere `Utc::now()` would
/// otherwise be called directly, so tests can inject a virtual clock to
/// exercise `balance_at` replay and idempotency/lease expiry deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test-only clock that only advances when told to.
pub struct FrozenClock(Mutex<DateTime<Utc>>);

impl FrozenClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self(Mutex::new(at))
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.0.lock().expect("frozen clock poisoned");
        *guard += by;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut guard = self.0.lock().expect("frozen clock poisoned");
        *guard = at;
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("frozen clock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_clock_only_moves_when_advanced() {
        let start = Utc::now();
        let clock = FrozenClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), start + Duration::minutes(5));
    }
}
