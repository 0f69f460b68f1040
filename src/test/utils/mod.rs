pub mod mock_broker;
pub mod mock_store;
pub mod mock_time;

use crate::{
    api::ApiState,
    db::Store,
    error::AppError,
    ingest::{correlator::Correlator, register_topics, router::MessageRouter, translator::PumpTranslator},
    mqtt::Broker,
};
use mock_time::MockTimeProvider;
use std::sync::Arc;

/// Router over `store` with the three standard topics registered (not yet connected).
pub async fn set_router(store: Arc<dyn Store>, broker: Arc<dyn Broker>) -> Result<MessageRouter, AppError> {
    let mut router = MessageRouter::new(Correlator::new(store.clone()), PumpTranslator::new(store), broker);
    register_topics(&mut router).await?;
    Ok(router)
}

/// HTTP state reading from `store` with the clock frozen at `start_time`.
pub fn set_api_state(store: Arc<dyn Store>, start_time: i64) -> (ApiState, Arc<MockTimeProvider>) {
    let time_provider = Arc::new(MockTimeProvider::new(start_time));
    (ApiState::new(store, time_provider.clone()), time_provider)
}
