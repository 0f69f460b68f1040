pub mod mqtt_mon;
pub mod session;

use crate::{config::Mqtt, error::AppError};
use async_trait::async_trait;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use std::time::Duration;
use tracing::{debug, info};

/// Request queue between the client handle and the event loop.
pub const REQUEST_CAPACITY: usize = 100;

pub const SUBSCRIBE_QOS: QoS = QoS::AtLeastOnce;
pub const PUBLISH_QOS: QoS = QoS::AtMostOnce;

/// What the message router needs from the broker connection.
#[async_trait]
pub trait Broker: Send + Sync {
    async fn subscribe(&self, topic: &str) -> Result<(), AppError>;
    async fn publish(&self, topic: &str, payload: String) -> Result<(), AppError>;
    async fn disconnect(&self) -> Result<(), AppError>;
}

pub struct MqttBroker {
    client: AsyncClient,
}

impl MqttBroker {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Broker for MqttBroker {
    async fn subscribe(&self, topic: &str) -> Result<(), AppError> {
        info!(topic, "Subscribing.");
        self.client.subscribe(topic, SUBSCRIBE_QOS).await?;
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: String) -> Result<(), AppError> {
        debug!(topic, payload = payload.as_str(), "Publishing.");
        self.client.publish(topic, PUBLISH_QOS, false, payload.into_bytes()).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AppError> {
        self.client.disconnect().await?;
        Ok(())
    }
}

/// Builds the client handle and its event loop. Nothing touches the network until the
/// event loop is polled.
pub fn client_conn(cfg: &Mqtt) -> (AsyncClient, EventLoop) {
    info!(broker = cfg.broker.as_str(), port = cfg.port, client_id = cfg.client_id.as_str(), "Preparing MQTT connection.");
    let mut mqttoptions = MqttOptions::new(cfg.client_id.clone(), cfg.broker.clone(), cfg.port);
    mqttoptions.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs.max(5)));
    mqttoptions.set_clean_session(true);

    AsyncClient::new(mqttoptions, REQUEST_CAPACITY)
}
