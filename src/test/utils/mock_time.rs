use crate::time::TimeProvider;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

#[derive(Debug)]
pub struct MockTimeProvider {
    current_time: Arc<AtomicI64>,
}

impl MockTimeProvider {
    pub fn new(start_time: i64) -> Self {
        Self { current_time: Arc::new(AtomicI64::new(start_time)) }
    }

    pub fn advance_time(&self, seconds: i64) {
        self.current_time.fetch_add(seconds, Ordering::SeqCst);
    }

    pub fn set(&self, new_time: i64) {
        self.current_time.store(new_time, Ordering::SeqCst)
    }
}

impl TimeProvider for MockTimeProvider {
    fn now(&self) -> i64 {
        self.current_time.load(Ordering::SeqCst)
    }
}
