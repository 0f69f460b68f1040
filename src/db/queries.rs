//! Aggregate reads behind the HTTP routes. Each function issues exactly one query.

use super::{Row, Store};
use crate::{
    error::AppError,
    ingest::FLOW_RATE,
    utils::{db_date, db_timestamp, sod, SECS_PER_DAY},
};
use rusqlite::types::Value;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

pub const SENSOR_HISTORY_LIMIT: i64 = 20;
pub const ACTIVATION_HISTORY_LIMIT: i64 = 10;
pub const PUMP_ON_WINDOW_SECS: i64 = 30;
pub const DAILY_HISTORY_DAYS: i64 = 7;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemperatureSample {
    pub temperatura: f64,
    pub fecha_hora: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HumiditySample {
    pub humedad: f64,
    pub fecha_hora: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DailyLiters {
    pub dia: String,
    pub litros: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Activation {
    pub fecha_hora: String,
    pub tiempo_total: Option<f64>,
    pub litros: Option<f64>,
}

fn decode<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, AppError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(serde_json::Value::Object(row)).map_err(AppError::from))
        .collect()
}

/// First column of the first row as a number; an empty result or NULL reads as 0.
fn scalar(rows: &[Row], column: &str) -> f64 {
    rows.first().and_then(|row| row.get(column)).and_then(serde_json::Value::as_f64).unwrap_or(0.0)
}

pub fn recent_temperatures(store: &dyn Store) -> Result<Vec<TemperatureSample>, AppError> {
    let rows = store.query(
        "SELECT temperatura, fecha_hora FROM sensor ORDER BY fecha_hora DESC, rowid DESC LIMIT ?1",
        &[Value::Integer(SENSOR_HISTORY_LIMIT)],
    )?;
    decode(rows)
}

pub fn recent_humidity(store: &dyn Store) -> Result<Vec<HumiditySample>, AppError> {
    let rows = store.query(
        "SELECT humedad, fecha_hora FROM sensor ORDER BY fecha_hora DESC, rowid DESC LIMIT ?1",
        &[Value::Integer(SENSOR_HISTORY_LIMIT)],
    )?;
    decode(rows)
}

/// Liters recomputed from accumulated motor run time.
pub fn liters_from_run_time(store: &dyn Store) -> Result<f64, AppError> {
    let rows = store.query(
        "SELECT COALESCE(SUM(tiempo_total), 0) AS total_tiempo FROM bomba WHERE tiempo_total IS NOT NULL",
        &[],
    )?;
    Ok(scalar(&rows, "total_tiempo") * FLOW_RATE)
}

pub fn total_liters(store: &dyn Store) -> Result<f64, AppError> {
    let rows = store.query("SELECT COALESCE(SUM(litros), 0) AS total_litros FROM bomba", &[])?;
    Ok(scalar(&rows, "total_litros"))
}

pub fn liters_since(store: &dyn Store, since: i64) -> Result<f64, AppError> {
    let rows = store.query(
        "SELECT COALESCE(SUM(litros), 0) AS total_litros FROM bomba WHERE fecha_hora >= ?1",
        &[Value::Text(db_timestamp(since))],
    )?;
    Ok(scalar(&rows, "total_litros"))
}

pub fn liters_last_day(store: &dyn Store, now: i64) -> Result<f64, AppError> {
    liters_since(store, now - SECS_PER_DAY)
}

/// Per-day totals for the `DAILY_HISTORY_DAYS` calendar days (UTC) ending today, oldest first.
/// Days without activations are absent.
pub fn daily_liters(store: &dyn Store, now: i64) -> Result<Vec<DailyLiters>, AppError> {
    let first_day = sod(now) - (DAILY_HISTORY_DAYS - 1) * SECS_PER_DAY;
    let rows = store.query(
        "SELECT date(fecha_hora) AS dia, COALESCE(SUM(litros), 0) AS litros
         FROM bomba
         WHERE fecha_hora >= ?1
         GROUP BY dia
         ORDER BY dia ASC",
        &[Value::Text(db_timestamp(first_day))],
    )?;
    let days = decode::<DailyLiters>(rows)?;
    let today = db_date(now);
    Ok(days.into_iter().filter(|d| d.dia <= today).collect())
}

/// The pump counts as running while an activation was logged within the last
/// `PUMP_ON_WINDOW_SECS` seconds.
pub fn pump_running(store: &dyn Store, now: i64) -> Result<bool, AppError> {
    let rows = store.query(
        "SELECT EXISTS(SELECT 1 FROM bomba WHERE fecha_hora >= ?1) AS encendida",
        &[Value::Text(db_timestamp(now - PUMP_ON_WINDOW_SECS))],
    )?;
    Ok(scalar(&rows, "encendida") != 0.0)
}

pub fn recent_activations(store: &dyn Store) -> Result<Vec<Activation>, AppError> {
    let rows = store.query(
        "SELECT fecha_hora, tiempo_total, litros FROM bomba ORDER BY fecha_hora DESC, rowid DESC LIMIT ?1",
        &[Value::Integer(ACTIVATION_HISTORY_LIMIT)],
    )?;
    decode(rows)
}
