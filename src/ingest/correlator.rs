use super::{
    ds::{PendingReadings, SensorReading},
    parse_reading,
};
use crate::{
    db::{insert_blocking, Store, SENSOR_TABLE},
    error::AppError,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Pairs independently arriving temperature and humidity values into one sensor row.
///
/// A newer value of the same kind replaces an unpaired older one. Once both halves are
/// present the pending state is cleared before the write is attempted, so a failed
/// insert loses that pair instead of leaving it behind for the next arrival.
pub struct Correlator {
    pending: PendingReadings,
    store: Arc<dyn Store>,
}

impl Correlator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { pending: PendingReadings::default(), store }
    }

    pub fn pending(&self) -> PendingReadings {
        self.pending
    }

    pub async fn on_temperature(&mut self, payload: &[u8]) -> Result<Option<SensorReading>, AppError> {
        let value = parse_reading(payload)?;
        if let Some(old) = self.pending.temperature.replace(value) {
            debug!(discarded = old, temperature = value, "Unpaired temperature replaced.");
        }
        self.try_pair().await
    }

    pub async fn on_humidity(&mut self, payload: &[u8]) -> Result<Option<SensorReading>, AppError> {
        let value = parse_reading(payload)?;
        if let Some(old) = self.pending.humidity.replace(value) {
            debug!(discarded = old, humidity = value, "Unpaired humidity replaced.");
        }
        self.try_pair().await
    }

    async fn try_pair(&mut self) -> Result<Option<SensorReading>, AppError> {
        let PendingReadings { temperature: Some(temperature), humidity: Some(humidity) } = self.pending else {
            return Ok(None);
        };
        self.pending = PendingReadings::default();

        let reading = SensorReading { temperature, humidity };
        insert_blocking(self.store.clone(), SENSOR_TABLE, reading.fields().to_vec()).await?;
        info!(temperature, humidity, "Sensor reading stored.");
        Ok(Some(reading))
    }
}
