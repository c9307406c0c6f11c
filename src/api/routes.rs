use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::handlers::connection::AppState;
use crate::api::handlers::{connection, query, schema};

/// Create router with application state
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/connections", post(connection::connect))
        .route("/api/connections/test", post(connection::test_connection))
        .route("/api/connections/active", get(connection::active_connection))
        .route("/api/connections/{id}", delete(connection::disconnect))
        .route("/api/query", post(query::execute_sql))
        .route("/api/query/natural", post(query::execute_natural_language))
        .route("/api/query/translate", post(query::translate))
        .route("/api/schema", get(schema::get_schema))
        .route("/api/schema/tables", get(schema::list_tables))
        .route("/api/schema/schemas", get(schema::list_schemas))
        .route(
            "/api/schema/tables/{name}/preview",
            get(schema::preview_table),
        )
        .route("/api/llm/status", get(schema::llm_status))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
