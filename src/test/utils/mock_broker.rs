use crate::error::AppError;
use crate::mqtt::Broker;
use async_trait::async_trait;
use mockall::mock;
use std::sync::{Arc, Mutex};
use tracing::trace;

mock! {
    pub Broker {}

    #[async_trait]
    impl Broker for Broker {
        async fn subscribe(&self, topic: &str) -> Result<(), AppError>;
        async fn publish(&self, topic: &str, payload: String) -> Result<(), AppError>;
        async fn disconnect(&self) -> Result<(), AppError>;
    }
}

/// Topic/payload pairs seen by a recording broker, in publish order.
pub type Published = Arc<Mutex<Vec<(String, String)>>>;

/// Broker that accepts every call and records what gets published.
pub fn recording_broker() -> (Arc<MockBroker>, Published) {
    let published: Published = Arc::new(Mutex::new(vec![]));
    let mut broker = MockBroker::new();
    broker.expect_subscribe().times(0..).returning(|topic| {
        trace!("Mocked subscribe to {}", topic);
        Ok(())
    });
    let sink = published.clone();
    broker.expect_publish().times(0..).returning(move |topic, payload| {
        trace!("Mocked publish to {}: {}", topic, payload);
        if let Ok(mut published) = sink.lock() {
            published.push((topic.to_owned(), payload));
        }
        Ok(())
    });
    broker.expect_disconnect().times(0..).returning(|| Ok(()));
    (Arc::new(broker), published)
}
