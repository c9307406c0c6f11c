use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::handlers::connection::AppState;
use crate::api::middleware::AppError;
use crate::models::{NaturalLanguageQuery, SqlStatement};

#[derive(Debug, Deserialize)]
pub struct SqlQueryRequest {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct NaturalLanguageQueryRequest {
    pub question: String,
}

/// Execute SQL against the active connection
pub async fn execute_sql(
    State(state): State<AppState>,
    Json(payload): Json<SqlQueryRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let sql = SqlStatement::new(payload.sql)?;
    let query = state.queries.execute_sql(sql).await?;

    Ok(Json(serde_json::json!({
        "query": query,
    })))
}

/// Translate a question to SQL and execute it
pub async fn execute_natural_language(
    State(state): State<AppState>,
    Json(payload): Json<NaturalLanguageQueryRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let question = NaturalLanguageQuery::new(payload.question)?;
    let query = state.queries.execute_natural_language(question).await?;

    Ok(Json(serde_json::json!({
        "query": query,
        "generated_sql": query.statement(),
    })))
}

/// Translate a question to SQL without executing it
pub async fn translate(
    State(state): State<AppState>,
    Json(payload): Json<NaturalLanguageQueryRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let question = NaturalLanguageQuery::new(payload.question)?;
    let request = state.queries.translate_only(question).await?;

    Ok(Json(serde_json::json!({
        "request_id": request.id(),
        "question": request.query(),
        "sql": request.translated_sql(),
        "status": request.status(),
    })))
}
