use std::sync::Arc;

use crate::error::{truncate, AppError, EXCERPT_MAX_LEN};
use crate::models::{NaturalLanguageQuery, Query, SqlStatement, TranslationRequest};
use crate::services::connection_service::ConnectionService;
use crate::services::database::DatabaseAdapter;
use crate::services::schema_service::SchemaService;
use crate::services::translation_service::TranslationService;

/// Query service for executing SQL and natural language queries against the
/// active connection
pub struct QueryService {
    connections: Arc<ConnectionService>,
    db: Arc<dyn DatabaseAdapter>,
    schema: Arc<SchemaService>,
    translator: Arc<TranslationService>,
}

impl QueryService {
    pub fn new(
        connections: Arc<ConnectionService>,
        db: Arc<dyn DatabaseAdapter>,
        schema: Arc<SchemaService>,
        translator: Arc<TranslationService>,
    ) -> Self {
        Self {
            connections,
            db,
            schema,
            translator,
        }
    }

    /// Execute user-supplied SQL as-is
    pub async fn execute_sql(&self, sql: SqlStatement) -> Result<Query, AppError> {
        let connection_id = self.connections.require_active().await?;

        tracing::info!(
            connection_id = %connection_id,
            sql = %truncate(sql.as_str(), EXCERPT_MAX_LEN),
            "Executing SQL query"
        );

        self.run(Query::from_sql(connection_id, sql)).await
    }

    /// Translate a question against the live schema, then execute the result
    pub async fn execute_natural_language(
        &self,
        question: NaturalLanguageQuery,
    ) -> Result<Query, AppError> {
        let connection_id = self.connections.require_active().await?;

        tracing::info!(
            connection_id = %connection_id,
            question = %truncate(question.as_str(), EXCERPT_MAX_LEN),
            "Executing natural language query"
        );

        let request = self.translate_only(question).await?;
        let sql = request
            .translated_sql()
            .cloned()
            .ok_or_else(|| AppError::Internal("Translation finished without SQL".to_string()))?;

        let query = Query::from_natural_language(connection_id, sql, request.query().as_str());
        self.run(query).await
    }

    /// Translate without executing; the returned request carries the SQL
    pub async fn translate_only(
        &self,
        question: NaturalLanguageQuery,
    ) -> Result<TranslationRequest, AppError> {
        self.connections.require_active().await?;

        tracing::info!(
            question = %truncate(question.as_str(), EXCERPT_MAX_LEN),
            "Translating natural language query"
        );

        let schema = self.schema.discover_schema(None).await?;
        let mut request = TranslationRequest::new(question, schema);

        let translated = self
            .translator
            .translate(request.query(), request.schema_context())
            .await;

        match translated {
            Ok(sql) => {
                tracing::info!(
                    request_id = %request.id(),
                    sql = %truncate(sql.as_str(), EXCERPT_MAX_LEN),
                    "Translation completed"
                );
                request.mark_completed(sql)?;
                Ok(request)
            }
            Err(e) => {
                request.mark_failed(e.to_string());
                tracing::error!(request_id = %request.id(), error = %e, "Translation failed");
                Err(e)
            }
        }
    }

    pub async fn translation_available(&self) -> bool {
        self.translator.is_available().await
    }

    async fn run(&self, mut query: Query) -> Result<Query, AppError> {
        query.mark_executing()?;

        match self.db.execute(query.statement()).await {
            Ok(result) => {
                tracing::info!(
                    query_id = %query.id(),
                    row_count = result.row_count(),
                    execution_time_ms = result.metadata().execution_time.as_millis() as u64,
                    "Query completed"
                );
                query.mark_completed(result)?;
                Ok(query)
            }
            Err(e) => {
                query.mark_failed(e.to_string());
                tracing::error!(query_id = %query.id(), error = %e, "Query failed");
                Err(e)
            }
        }
    }
}
