use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::handlers::connection::AppState;
use crate::api::middleware::AppError;

const DEFAULT_PREVIEW_ROWS: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct SchemaParams {
    /// Comma separated table names; all tables when absent
    pub tables: Option<String>,
}

impl SchemaParams {
    fn table_names(&self) -> Option<Vec<String>> {
        let names: Vec<String> = self
            .tables
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        (!names.is_empty()).then_some(names)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PreviewParams {
    pub limit: Option<u32>,
}

/// Schema context as used for translation prompts
pub async fn get_schema(
    State(state): State<AppState>,
    Query(params): Query<SchemaParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let names = params.table_names();
    let context = state.schema.discover_schema(names.as_deref()).await?;

    Ok(Json(serde_json::json!({
        "tables": context.tables(),
        "prompt": context.to_prompt_string(),
    })))
}

pub async fn list_tables(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tables = state.schema.list_tables().await?;
    Ok(Json(serde_json::json!({ "tables": tables })))
}

pub async fn list_schemas(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let schemas = state.schema.list_schemas().await?;
    Ok(Json(serde_json::json!({ "schemas": schemas })))
}

pub async fn preview_table(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<PreviewParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_PREVIEW_ROWS);
    let result = state.schema.preview_table(&name, limit).await?;

    Ok(Json(serde_json::json!({
        "table": name,
        "result": result,
    })))
}

/// Whether natural language translation is currently possible
pub async fn llm_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let available = state.queries.translation_available().await;

    Json(serde_json::json!({
        "available": available,
        "model": state.config.llm.model,
    }))
}
