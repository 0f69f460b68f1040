use super::session::{ReconnectPolicy, Session};
use crate::{error::AppError, ingest::router::MessageRouter};
use backoff::{backoff::Backoff, ExponentialBackoff};
use rumqttc::{ConnectReturnCode, ConnectionError, Event, EventLoop, Outgoing, Packet};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, trace, warn};

/// Upper bound on draining the event loop after a DISCONNECT request.
const DISCONNECT_DRAIN: Duration = Duration::from_secs(2);

#[derive(Debug)]
pub enum Flow {
    Continue,
    /// Connection failed; wait this long before the next attempt.
    Retry(Duration),
    /// Reconnect window exhausted.
    GiveUp(AppError),
}

/// Reacts to broker events: drives the connection state machine and hands incoming
/// publishes to the router, one at a time in arrival order.
pub struct Monitor {
    router: MessageRouter,
    session: Session,
    backoff: ExponentialBackoff,
}

impl Monitor {
    pub fn new(router: MessageRouter, policy: ReconnectPolicy) -> Self {
        Self { router, session: Session::default(), backoff: policy.backoff() }
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn handle_event(&mut self, event: Result<Event, ConnectionError>) -> Flow {
        self.session.connecting();
        match event {
            Ok(Event::Incoming(Packet::ConnAck(ack))) if ack.code == ConnectReturnCode::Success => {
                if self.session.connected() {
                    info!(session_present = ack.session_present, "Connected to broker.");
                    self.backoff.reset();
                    self.router.on_connected().await;
                }
                Flow::Continue
            }
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                warn!(code = ?ack.code, "Broker refused connection.");
                Flow::Continue
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                self.router.dispatch(&publish.topic, &publish.payload).await;
                Flow::Continue
            }
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                debug!(pkid = ack.pkid, codes = ?ack.return_codes, "Subscription confirmed.");
                Flow::Continue
            }
            Ok(notification) => {
                trace!(?notification, "Notification.");
                Flow::Continue
            }
            Err(e) => {
                self.router.on_disconnected();
                if self.session.dropped() {
                    warn!(error = %e, "Connection to broker lost.");
                    self.backoff.reset();
                } else {
                    error!(error = %e, "Broker connection attempt failed.");
                }
                match self.backoff.next_backoff() {
                    Some(delay) => Flow::Retry(delay),
                    None => Flow::GiveUp(AppError::ConnectionError(e)),
                }
            }
        }
    }

    /// Clean shutdown: asks the broker to disconnect and flushes the request out.
    pub async fn shutdown(&mut self, event_loop: &mut EventLoop) {
        let was_connected = self.session.shutdown();
        self.router.shutdown().await;
        if !was_connected {
            info!("Ingestion stopped before a broker connection was established.");
            return;
        }
        let drain = async {
            loop {
                match event_loop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        if tokio::time::timeout(DISCONNECT_DRAIN, drain).await.is_err() {
            warn!("Broker did not acknowledge disconnect in time.");
        }
        info!("Disconnected from broker.");
    }
}

/// Message loop. Runs until `stop_signal` flips to true (or its sender goes away), or
/// until reconnecting has been failing for longer than the policy allows.
pub async fn monitor_mqtt(
    mut monitor: Monitor, mut event_loop: EventLoop, mut stop_signal: watch::Receiver<bool>,
) -> Result<(), AppError> {
    info!("Starting ingestion loop.");
    loop {
        let flow = tokio::select! {
            changed = stop_signal.changed() => {
                if changed.is_err() || *stop_signal.borrow() {
                    break;
                }
                continue;
            }
            event = event_loop.poll() => monitor.handle_event(event).await,
        };

        match flow {
            Flow::Continue => {}
            Flow::Retry(delay) => {
                info!(delay_ms = delay.as_millis() as u64, "Reconnecting to broker.");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop_signal.changed() => {}
                }
                if *stop_signal.borrow() {
                    break;
                }
            }
            Flow::GiveUp(e) => {
                error!(error = %e, "Giving up on broker connection.");
                return Err(e);
            }
        }
    }
    monitor.shutdown(&mut event_loop).await;
    info!("Ending ingestion loop.");
    Ok(())
}
