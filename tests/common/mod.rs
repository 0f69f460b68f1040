#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::Request,
    Router,
};
use bomba::{
    db::{SqliteStore, Store, COL_HUMIDITY, COL_LITERS, COL_RUN_TIME, COL_TEMPERATURE, COL_TIMESTAMP, PUMP_TABLE, SENSOR_TABLE},
    utils::db_timestamp,
};
use hyper::StatusCode;
use rusqlite::types::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Fresh database in a temp dir. Keep the `TempDir` alive for as long as the store is used.
pub fn temp_store() -> (TempDir, Arc<SqliteStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::new(dir.path().join("bomba.db")).unwrap();
    (dir, Arc::new(store))
}

fn opt(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::Real)
}

pub fn insert_activation(store: &SqliteStore, at: i64, tiempo_total: Option<f64>, litros: Option<f64>) {
    store
        .insert(
            PUMP_TABLE,
            &[
                (COL_TIMESTAMP, Value::Text(db_timestamp(at))),
                (COL_RUN_TIME, opt(tiempo_total)),
                (COL_LITERS, opt(litros)),
            ],
        )
        .unwrap();
}

pub fn insert_sensor(store: &SqliteStore, at: i64, temperatura: f64, humedad: f64) {
    store
        .insert(
            SENSOR_TABLE,
            &[
                (COL_TIMESTAMP, Value::Text(db_timestamp(at))),
                (COL_TEMPERATURE, Value::Real(temperatura)),
                (COL_HUMIDITY, Value::Real(humedad)),
            ],
        )
        .unwrap();
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}
