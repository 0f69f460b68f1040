use std::fmt::Debug;

pub trait TimeProvider: Send + Sync + Debug {
    fn now(&self) -> i64; // Returns the current time as a Unix UTC timestamp
}

#[derive(Debug)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}
