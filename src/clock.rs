//! Time sources used to judge token expiry.
//!
//! Code crash if there is a physical inconsistency (unrecoverable state).

/// Port for getting the current time.
pub trait Clock: Send + Sync {
    /// Get the current Unix timestamp in seconds.
    fn now(&self) -> u64;

    /// Get the current Unix timestamp in milliseconds.
    fn now_millis(&self) -> u128;
}

/// System clock using the OS time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_secs()
    }

    fn now_millis(&self) -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_millis()
    }
}

/// Clock frozen at a given second.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    timestamp: u64,
}

impl FixedClock {
    pub fn new(timestamp: u64) -> Self {
        Self { timestamp }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.timestamp
    }

    fn now_millis(&self) -> u128 {
        u128::from(self.timestamp) * 1000
    }
}
