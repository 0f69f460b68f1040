use super::{FLOW_RATE, TOPIC_LITERS_CONSUMED};
use crate::{
    db::{Field, COL_HUMIDITY, COL_LITERS, COL_RUN_TIME, COL_TEMPERATURE},
    utils::format_decimal,
};
use rusqlite::types::Value;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub temperature: f64, // °C
    pub humidity: f64,    // % RH
}

impl SensorReading {
    pub fn fields(&self) -> [Field; 2] {
        [(COL_TEMPERATURE, Value::Real(self.temperature)), (COL_HUMIDITY, Value::Real(self.humidity))]
    }
}

/// One motor run. `liters` is always derived from the duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpActivation {
    duration_secs: f64,
    liters: f64,
}

impl PumpActivation {
    pub fn from_duration(duration_secs: f64) -> Self {
        Self { duration_secs, liters: duration_secs * FLOW_RATE }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn liters(&self) -> f64 {
        self.liters
    }

    pub fn fields(&self) -> [Field; 2] {
        [(COL_RUN_TIME, Value::Real(self.duration_secs)), (COL_LITERS, Value::Real(self.liters))]
    }
}

/// Outbound message computed from an inbound one.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedEvent {
    pub topic: &'static str,
    pub payload: String,
}

impl DerivedEvent {
    pub fn liters_consumed(liters: f64) -> Self {
        Self { topic: TOPIC_LITERS_CONSUMED, payload: format_decimal(liters) }
    }
}

/// Unpaired halves of a sensor reading. At most one value of each kind is held.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PendingReadings {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl PendingReadings {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none()
    }
}
