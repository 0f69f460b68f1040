use crate::{
    db::{
        queries::{self, Activation, DailyLiters, HumiditySample, TemperatureSample},
        Store,
    },
    error::AppError,
    time::TimeProvider,
};
use axum::{extract::State, routing::get, Json, Router};
use axum_server::Handle;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::watch;
use tracing::info;

/// How long in-flight requests get to finish once shutdown starts.
const GRACE_PERIOD: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct ApiState {
    store: Arc<dyn Store>,
    time_provider: Arc<dyn TimeProvider>,
}

impl ApiState {
    pub fn new(store: Arc<dyn Store>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { store, time_provider }
    }

    /// Runs a store read off the async workers. Each call uses its own database connection.
    async fn read<R, F>(&self, f: F) -> Result<R, AppError>
    where
        R: Send + 'static,
        F: FnOnce(&dyn Store, i64) -> Result<R, AppError> + Send + 'static,
    {
        let store = self.store.clone();
        let now = self.time_provider.now();
        tokio::task::spawn_blocking(move || f(store.as_ref(), now)).await?
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LitrosConsumidos {
    pub litros_consumidos: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LitrosTotales {
    pub litros_totales: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LitrosUltimoDia {
    pub litros_ultimo_dia: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EstadoBomba {
    pub bomba_encendida: bool,
}

pub async fn get_temperatures(State(state): State<ApiState>) -> Result<Json<Vec<TemperatureSample>>, AppError> {
    Ok(Json(state.read(|store, _| queries::recent_temperatures(store)).await?))
}

pub async fn get_humidity(State(state): State<ApiState>) -> Result<Json<Vec<HumiditySample>>, AppError> {
    Ok(Json(state.read(|store, _| queries::recent_humidity(store)).await?))
}

/// Volume recomputed from motor run time, independent of the stored `litros` column.
pub async fn get_liters_consumed(State(state): State<ApiState>) -> Result<Json<LitrosConsumidos>, AppError> {
    let litros_consumidos = state.read(|store, _| queries::liters_from_run_time(store)).await?;
    Ok(Json(LitrosConsumidos { litros_consumidos }))
}

pub async fn get_total_liters(State(state): State<ApiState>) -> Result<Json<LitrosTotales>, AppError> {
    let litros_totales = state.read(|store, _| queries::total_liters(store)).await?;
    Ok(Json(LitrosTotales { litros_totales }))
}

pub async fn get_liters_last_day(State(state): State<ApiState>) -> Result<Json<LitrosUltimoDia>, AppError> {
    let litros_ultimo_dia = state.read(queries::liters_last_day).await?;
    Ok(Json(LitrosUltimoDia { litros_ultimo_dia }))
}

pub async fn get_daily_liters(State(state): State<ApiState>) -> Result<Json<Vec<DailyLiters>>, AppError> {
    Ok(Json(state.read(queries::daily_liters).await?))
}

pub async fn get_pump_state(State(state): State<ApiState>) -> Result<Json<EstadoBomba>, AppError> {
    let bomba_encendida = state.read(queries::pump_running).await?;
    Ok(Json(EstadoBomba { bomba_encendida }))
}

pub async fn get_activations(State(state): State<ApiState>) -> Result<Json<Vec<Activation>>, AppError> {
    Ok(Json(state.read(|store, _| queries::recent_activations(store)).await?))
}

pub fn app(state: ApiState) -> Router {
    Router::new()
        .route("/temperatura", get(get_temperatures))
        .route("/humedad", get(get_humidity))
        .route("/litros_consumidos", get(get_liters_consumed))
        .route("/litros_totales", get(get_total_liters))
        .route("/litros_ultimo_dia", get(get_liters_last_day))
        .route("/litros_ultimos_7_dias", get(get_daily_liters))
        .route("/estado_bomba", get(get_pump_state))
        .route("/activaciones", get(get_activations))
        .with_state(state)
}

/// Serves the read API until `stop_signal` turns true, then drains in-flight requests.
pub async fn run_web_server(
    state: ApiState, addr: SocketAddr, mut stop_signal: watch::Receiver<bool>,
) -> Result<(), AppError> {
    let handle = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        // a dropped sender also means shutdown
        _ = stop_signal.wait_for(|stop| *stop).await;
        info!("Stopping HTTP server.");
        shutdown.graceful_shutdown(Some(GRACE_PERIOD));
    });

    info!(%addr, "Starting HTTP server.");
    axum_server::bind(addr).handle(handle).serve(app(state).into_make_service()).await?;
    info!("HTTP server stopped.");
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::utils::{mock_store::MockStore, set_api_state};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    async fn get_json(state: ApiState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app(state).oneshot(Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn store_failure_is_a_500_with_error_body() {
        let mut store = MockStore::new();
        store
            .expect_query()
            .returning(|_, _| Err(AppError::DatabaseError(rusqlite::Error::QueryReturnedNoRows)));
        let (state, _) = set_api_state(Arc::new(store), 1_700_000_000);

        let (status, body) = get_json(state, "/litros_totales").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().starts_with("Database error"));
    }

    #[tokio::test]
    async fn pump_state_reads_at_current_time() {
        let mut store = MockStore::new();
        store.expect_query().times(1).returning(|_, _| {
            let mut row = serde_json::Map::new();
            row.insert("encendida".into(), json!(0));
            Ok(vec![row])
        });
        let (state, _) = set_api_state(Arc::new(store), 1_700_000_000);

        let (status, body) = get_json(state, "/estado_bomba").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"bomba_encendida": false}));
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let (state, _) = set_api_state(Arc::new(MockStore::new()), 0);
        let response = app(state).oneshot(Request::get("/riego").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
