use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::{fmt, time::Duration};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            ConnState::Disconnected => "disconnected",
            ConnState::Connecting => "connecting",
            ConnState::Connected => "connected",
        };
        f.write_str(state)
    }
}

/// Broker connection lifecycle: Disconnected -> Connecting -> Connected -> Disconnected.
#[derive(Debug, Default)]
pub struct Session {
    state: ConnState,
}

impl Session {
    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnState::Connected
    }

    pub fn connecting(&mut self) {
        if self.state == ConnState::Disconnected {
            self.state = ConnState::Connecting;
        }
    }

    /// Returns true on entry into `Connected`, the moment subscriptions must be renewed.
    pub fn connected(&mut self) -> bool {
        let entered = self.state != ConnState::Connected;
        self.state = ConnState::Connected;
        entered
    }

    /// Connection lost or attempt failed. Returns true when an established connection dropped.
    pub fn dropped(&mut self) -> bool {
        let was_connected = self.is_connected();
        self.state = ConnState::Disconnected;
        was_connected
    }

    /// Clean shutdown. Returns true when a live connection is being closed.
    pub fn shutdown(&mut self) -> bool {
        self.dropped()
    }
}

/// Reconnect delays: exponential from `initial`, capped at `max_interval`, and abandoned
/// once failures have lasted `give_up_after` (never, when `None`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max_interval: Duration,
    pub give_up_after: Option<Duration>,
}

impl ReconnectPolicy {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial)
            .with_max_interval(self.max_interval.max(self.initial))
            .with_max_elapsed_time(self.give_up_after)
            .build()
    }
}
