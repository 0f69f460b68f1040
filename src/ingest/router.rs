use super::{correlator::Correlator, ds::DerivedEvent, translator::PumpTranslator};
use crate::{error::AppError, mqtt::Broker};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    Temperature,
    Humidity,
    MotorDuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// No handler for the topic; the message was dropped.
    Unrouted,
    /// The handler returned an error; the message was dropped.
    Failed,
}

/// Maps exact topic names to handlers and runs them one message at a time.
///
/// The router owns the correlator and the translator, and tracks whether the broker
/// connection is live so late registrations can subscribe immediately.
pub struct MessageRouter {
    routes: HashMap<String, Handler>,
    correlator: Correlator,
    translator: PumpTranslator,
    broker: Arc<dyn Broker>,
    connected: bool,
}

impl MessageRouter {
    pub fn new(correlator: Correlator, translator: PumpTranslator, broker: Arc<dyn Broker>) -> Self {
        Self { routes: HashMap::new(), correlator, translator, broker, connected: false }
    }

    pub fn correlator(&self) -> &Correlator {
        &self.correlator
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Registered topics, sorted.
    pub fn topics(&self) -> Vec<&str> {
        let mut topics: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        topics.sort_unstable();
        topics
    }

    /// Last registration for a topic wins. While connected, only this topic is subscribed.
    pub async fn register(&mut self, topic: &str, handler: Handler) -> Result<(), AppError> {
        if let Some(previous) = self.routes.insert(topic.to_owned(), handler) {
            debug!(topic, ?previous, ?handler, "Handler replaced.");
        }
        if self.connected {
            self.broker.subscribe(topic).await?;
        }
        Ok(())
    }

    /// Entry into the connected state: every registered topic is subscribed again.
    pub async fn on_connected(&mut self) {
        self.connected = true;
        for topic in self.topics().into_iter().map(str::to_owned).collect::<Vec<_>>() {
            if let Err(e) = self.broker.subscribe(&topic).await {
                error!(topic = topic.as_str(), error = %e, "Subscription failed.");
            }
        }
    }

    pub fn on_disconnected(&mut self) {
        self.connected = false;
    }

    pub async fn shutdown(&mut self) {
        if self.connected {
            if let Err(e) = self.broker.disconnect().await {
                warn!(error = %e, "Disconnect request failed.");
            }
        }
        self.connected = false;
    }

    /// Runs the handler registered for `topic`. Handler errors are logged and swallowed so
    /// the next message is processed normally.
    pub async fn dispatch(&mut self, topic: &str, payload: &[u8]) -> Dispatch {
        let Some(handler) = self.routes.get(topic).copied() else {
            debug!(topic, "No handler registered, message dropped.");
            return Dispatch::Unrouted;
        };
        trace!(topic, payload = %String::from_utf8_lossy(payload), "Message received.");

        let derived: Result<Option<DerivedEvent>, AppError> = match handler {
            Handler::Temperature => self.correlator.on_temperature(payload).await.map(|_| None),
            Handler::Humidity => self.correlator.on_humidity(payload).await.map(|_| None),
            Handler::MotorDuration => self.translator.on_motor_duration(payload).await.map(|(_, event)| Some(event)),
        };

        match derived {
            Ok(Some(event)) => {
                if let Err(e) = self.broker.publish(event.topic, event.payload).await {
                    error!(topic = event.topic, error = %e, "Derived event not published.");
                }
                Dispatch::Handled
            }
            Ok(None) => Dispatch::Handled,
            Err(AppError::ParseError(e)) => {
                warn!(topic, error = %e, "Malformed payload, message dropped.");
                Dispatch::Failed
            }
            Err(e) => {
                error!(topic, error = %e, "Handler failed, message dropped.");
                Dispatch::Failed
            }
        }
    }
}
