use super::{
    ds::{DerivedEvent, PumpActivation},
    parse_reading,
};
use crate::{
    db::{insert_blocking, Store, PUMP_TABLE},
    error::AppError,
};
use std::sync::Arc;
use tracing::info;

/// Turns a motor-run duration into a stored activation and a "liters consumed" event.
/// The event is only produced once the activation has been written.
pub struct PumpTranslator {
    store: Arc<dyn Store>,
}

impl PumpTranslator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn on_motor_duration(&self, payload: &[u8]) -> Result<(PumpActivation, DerivedEvent), AppError> {
        let activation = PumpActivation::from_duration(parse_reading(payload)?);
        if !activation.liters().is_finite() {
            return Err(AppError::ParseError(format!(
                "duration {} s is out of range",
                activation.duration_secs()
            )));
        }
        insert_blocking(self.store.clone(), PUMP_TABLE, activation.fields().to_vec()).await?;
        info!(
            event = "pump_activation",
            duration_secs = activation.duration_secs(),
            liters = activation.liters(),
        );
        Ok((activation, DerivedEvent::liters_consumed(activation.liters())))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        ingest::{FLOW_RATE, TOPIC_LITERS_CONSUMED},
        test::utils::mock_store::MockStore,
    };
    use rusqlite::types::Value;

    fn accepting_store() -> Arc<MockStore> {
        let mut store = MockStore::new();
        store.expect_insert().withf(|table, _| table == PUMP_TABLE).returning(|_, _| Ok(()));
        Arc::new(store)
    }

    #[tokio::test]
    async fn two_seconds_is_thirty_liters() {
        let mut store = MockStore::new();
        store
            .expect_insert()
            .withf(|table, fields| {
                table == PUMP_TABLE
                    && fields.to_vec() == vec![("tiempo_total", Value::Real(2.0)), ("litros", Value::Real(30.0))]
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let translator = PumpTranslator::new(Arc::new(store));

        let (activation, event) = translator.on_motor_duration(b"2.0").await.unwrap();
        assert_eq!(activation.duration_secs(), 2.0);
        assert_eq!(activation.liters(), 30.0);
        assert_eq!(event, DerivedEvent { topic: TOPIC_LITERS_CONSUMED, payload: "30.0".to_owned() });
    }

    #[tokio::test]
    async fn liters_always_derive_from_duration() {
        let translator = PumpTranslator::new(accepting_store());
        for d in [0.0, 0.1, 1.0, 3.25, 12.5, 600.0] {
            let (activation, event) = translator.on_motor_duration(d.to_string().as_bytes()).await.unwrap();
            assert_eq!(activation.liters(), d * FLOW_RATE);
            assert_eq!(event.payload.parse::<f64>().unwrap(), d * FLOW_RATE);
            assert!(event.payload.contains('.'));
        }
    }

    #[tokio::test]
    async fn malformed_duration_touches_nothing() {
        let translator = PumpTranslator::new(Arc::new(MockStore::new()));
        assert!(matches!(translator.on_motor_duration(b"dos").await, Err(AppError::ParseError(_))));
    }

    #[tokio::test]
    async fn overflowing_duration_is_rejected_before_the_store() {
        // no expectations: an insert would fail the test
        let translator = PumpTranslator::new(Arc::new(MockStore::new()));
        for payload in [&b"1e308"[..], b"-1.7e308"] {
            assert!(matches!(translator.on_motor_duration(payload).await, Err(AppError::ParseError(_))));
        }
    }

    #[tokio::test]
    async fn no_event_when_persistence_fails() {
        let mut store = MockStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_, _| Err(AppError::DatabaseError(rusqlite::Error::QueryReturnedNoRows)));
        let translator = PumpTranslator::new(Arc::new(store));
        assert!(matches!(translator.on_motor_duration(b"1.5").await, Err(AppError::DatabaseError(_))));
    }
}
