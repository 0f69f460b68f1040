pub mod correlator;
pub mod ds;
pub mod router;
pub mod translator;

use crate::error::AppError;
use router::{Handler, MessageRouter};
use std::str;

pub const TOPIC_TEMPERATURE: &str = "bomba_agua_mqtt/temperatura";
pub const TOPIC_HUMIDITY: &str = "bomba_agua_mqtt/humedad";
pub const TOPIC_MOTOR_TIME: &str = "bomba_agua_mqtt/tiempo_motor";
pub const TOPIC_LITERS_CONSUMED: &str = "bomba_agua_mqtt/litros_consumidos";

/// liters / second
pub const FLOW_RATE: f64 = 15.0;

/// Reads a UTF-8 decimal payload. Anything that is not a finite number is rejected.
pub fn parse_reading(payload: &[u8]) -> Result<f64, AppError> {
    let text = str::from_utf8(payload).map_err(|e| AppError::ParseError(format!("payload is not UTF-8: {}", e)))?;
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AppError::ParseError(format!("'{}' is not a finite number", text))),
    }
}

/// Routes the three sensor/actuator topics to their handlers.
pub async fn register_topics(router: &mut MessageRouter) -> Result<(), AppError> {
    router.register(TOPIC_TEMPERATURE, Handler::Temperature).await?;
    router.register(TOPIC_HUMIDITY, Handler::Humidity).await?;
    router.register(TOPIC_MOTOR_TIME, Handler::MotorDuration).await?;
    Ok(())
}
