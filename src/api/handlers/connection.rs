use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::config::Config;
use crate::models::{ConnectionConfig, ConnectionId};
use crate::services::{
    ConnectionService, DatabaseAdapter, LlmClient, QueryService, SchemaService,
    TranslationService,
};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub connections: Arc<ConnectionService>,
    pub schema: Arc<SchemaService>,
    pub queries: Arc<QueryService>,
}

impl AppState {
    /// Wire the services around one database adapter and one LLM client
    pub fn new(config: Config, db: Arc<dyn DatabaseAdapter>, llm: Arc<dyn LlmClient>) -> Self {
        let connections = Arc::new(ConnectionService::new(db.clone()));
        let schema = Arc::new(SchemaService::new(db.clone()));
        let translator = Arc::new(TranslationService::new(
            llm,
            config.llm.model.clone(),
            config.llm.timeout(),
        ));
        let queries = Arc::new(QueryService::new(
            connections.clone(),
            db,
            schema.clone(),
            translator,
        ));

        Self {
            config,
            connections,
            schema,
            queries,
        }
    }
}

/// Either a compact `host[:port]/database` target or discrete fields
#[derive(Deserialize)]
pub struct ConnectRequest {
    pub target: Option<String>,
    pub host: Option<String>,
    pub port: Option<u32>,
    pub database: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl ConnectRequest {
    fn into_config(self, default_port: u16) -> Result<ConnectionConfig, AppError> {
        match self.target {
            Some(target) => {
                ConnectionConfig::parse_target(&target, self.username, self.password, default_port)
            }
            None => ConnectionConfig::new(
                self.host.unwrap_or_default(),
                self.port.unwrap_or(u32::from(default_port)),
                self.database.unwrap_or_default(),
                self.username,
                self.password,
            ),
        }
    }
}

/// Connect, replacing the active connection
pub async fn connect(
    State(state): State<AppState>,
    Json(payload): Json<ConnectRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let config = payload.into_config(state.config.database.default_port)?;
    tracing::info!("Connect requested for {}", config.to_display_safe_string());

    let connection = state.connections.connect(config).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "connection": connection,
        })),
    ))
}

/// Check a configuration without touching the active connection
pub async fn test_connection(
    State(state): State<AppState>,
    Json(payload): Json<ConnectRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = payload.into_config(state.config.database.default_port)?;
    let reachable = state.connections.test_connection(&config).await;

    Ok(Json(serde_json::json!({
        "target": config.to_display_safe_string(),
        "success": reachable,
    })))
}

pub async fn active_connection(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let connection = state.connections.active_connection().await;

    Ok(Json(serde_json::json!({
        "connection": connection,
    })))
}

pub async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let id = ConnectionId::parse(&id)?;
    tracing::info!("Disconnect requested for connection: {}", id);

    let disconnected = state.connections.disconnect(id).await;

    Ok(Json(serde_json::json!({
        "connection_id": id,
        "disconnected": disconnected,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> ConnectRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_connect_request_from_target() {
        let config = request(serde_json::json!({
            "target": "db.local:6543/shop",
            "username": "analyst",
            "password": "pw"
        }))
        .into_config(5432)
        .unwrap();

        assert_eq!(config.host(), "db.local");
        assert_eq!(config.port(), 6543);
        assert_eq!(config.database(), "shop");
    }

    #[test]
    fn test_connect_request_fields_use_default_port() {
        let config = request(serde_json::json!({
            "host": "db.local",
            "database": "shop",
            "username": "analyst"
        }))
        .into_config(5432)
        .unwrap();

        assert_eq!(config.port(), 5432);
        assert_eq!(config.password(), "");
    }

    #[test]
    fn test_connect_request_requires_host() {
        let result = request(serde_json::json!({"database": "shop"})).into_config(5432);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
