use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("Row decoding error: {0}")]
    DecodeError(#[from] serde_json::Error),
    #[error("MQTT error: {0}")]
    MQTTError(#[from] rumqttc::ClientError),
    #[error("MQTT connection error: {0}")]
    ConnectionError(#[from] rumqttc::ConnectionError),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Task error: {0}")]
    TaskError(#[from] tokio::task::JoinError),
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed.");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
