use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ConnectionId, EventLog};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(Uuid);

impl QueryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Non-blank SQL text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SqlStatement(String);

impl SqlStatement {
    pub fn new(sql: impl Into<String>) -> Result<Self, AppError> {
        let sql = sql.into();
        if sql.trim().is_empty() {
            return Err(AppError::Validation(
                "SQL statement cannot be blank".to_string(),
            ));
        }
        Ok(Self(sql))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The statement with surrounding whitespace removed
    pub fn normalized(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum QueryOrigin {
    DirectSql,
    NaturalLanguage,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Pending,
    Executing,
    Completed,
    Failed,
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_millis() as u64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryMetadata {
    pub affected_rows: u64,
    #[serde(rename = "execution_time_ms", serialize_with = "serialize_millis")]
    pub execution_time: Duration,
}

/// Rows returned by a statement. Owned outright, so nothing can change
/// after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Vec<serde_json::Value>>,
    metadata: QueryMetadata,
}

impl QueryResult {
    pub fn new(
        columns: Vec<String>,
        rows: Vec<Vec<serde_json::Value>>,
        metadata: QueryMetadata,
    ) -> Self {
        Self {
            columns,
            rows,
            metadata,
        }
    }

    /// Result of a statement that produced no row set
    pub fn affected(affected_rows: u64, execution_time: Duration) -> Self {
        Self::new(
            Vec::new(),
            Vec::new(),
            QueryMetadata {
                affected_rows,
                execution_time,
            },
        )
    }

    pub fn empty(execution_time: Duration) -> Self {
        Self::affected(0, execution_time)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<serde_json::Value>] {
        &self.rows
    }

    pub fn metadata(&self) -> &QueryMetadata {
        &self.metadata
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum QueryEvent {
    QuerySubmitted {
        query_id: QueryId,
        connection_id: ConnectionId,
        statement: SqlStatement,
        origin: QueryOrigin,
        occurred_at: DateTime<Utc>,
    },
    QueryExecuted {
        query_id: QueryId,
        result: QueryResult,
        occurred_at: DateTime<Utc>,
    },
    QueryFailed {
        query_id: QueryId,
        error_message: String,
        occurred_at: DateTime<Utc>,
    },
}

impl QueryEvent {
    pub fn query_id(&self) -> QueryId {
        match self {
            QueryEvent::QuerySubmitted { query_id, .. }
            | QueryEvent::QueryExecuted { query_id, .. }
            | QueryEvent::QueryFailed { query_id, .. } => *query_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            QueryEvent::QuerySubmitted { occurred_at, .. }
            | QueryEvent::QueryExecuted { occurred_at, .. }
            | QueryEvent::QueryFailed { occurred_at, .. } => *occurred_at,
        }
    }
}

/// A statement submitted against the active connection.
///
/// Pending -> Executing -> Completed, with Failed reachable from
/// Pending or Executing.
#[derive(Debug, Clone, Serialize)]
pub struct Query {
    id: QueryId,
    connection_id: ConnectionId,
    statement: SqlStatement,
    origin: QueryOrigin,
    natural_language: Option<String>,
    status: QueryStatus,
    result: Option<QueryResult>,
    error_message: Option<String>,
    submitted_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: EventLog<QueryEvent>,
}

impl Query {
    pub fn from_sql(connection_id: ConnectionId, statement: SqlStatement) -> Self {
        Self::submit(connection_id, statement, QueryOrigin::DirectSql, None)
    }

    pub fn from_natural_language(
        connection_id: ConnectionId,
        translated: SqlStatement,
        natural_language: impl Into<String>,
    ) -> Self {
        Self::submit(
            connection_id,
            translated,
            QueryOrigin::NaturalLanguage,
            Some(natural_language.into()),
        )
    }

    fn submit(
        connection_id: ConnectionId,
        statement: SqlStatement,
        origin: QueryOrigin,
        natural_language: Option<String>,
    ) -> Self {
        let id = QueryId::generate();
        let submitted_at = Utc::now();
        let mut events = EventLog::new();
        events.record(QueryEvent::QuerySubmitted {
            query_id: id,
            connection_id,
            statement: statement.clone(),
            origin,
            occurred_at: submitted_at,
        });

        Self {
            id,
            connection_id,
            statement,
            origin,
            natural_language,
            status: QueryStatus::Pending,
            result: None,
            error_message: None,
            submitted_at,
            completed_at: None,
            events,
        }
    }

    pub fn mark_executing(&mut self) -> Result<(), AppError> {
        if self.status != QueryStatus::Pending {
            return Err(AppError::illegal_transition("query", self.status, "start executing"));
        }
        self.status = QueryStatus::Executing;
        Ok(())
    }

    pub fn mark_completed(&mut self, result: QueryResult) -> Result<(), AppError> {
        if self.status != QueryStatus::Executing {
            return Err(AppError::illegal_transition("query", self.status, "complete"));
        }
        let now = Utc::now();
        self.status = QueryStatus::Completed;
        self.completed_at = Some(now);
        self.events.record(QueryEvent::QueryExecuted {
            query_id: self.id,
            result: result.clone(),
            occurred_at: now,
        });
        self.result = Some(result);
        Ok(())
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        let error_message = error_message.into();
        let now = Utc::now();
        self.status = QueryStatus::Failed;
        self.error_message = Some(error_message.clone());
        self.completed_at = Some(now);
        self.events.record(QueryEvent::QueryFailed {
            query_id: self.id,
            error_message,
            occurred_at: now,
        });
    }

    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn statement(&self) -> &SqlStatement {
        &self.statement
    }

    pub fn origin(&self) -> QueryOrigin {
        self.origin
    }

    pub fn natural_language(&self) -> Option<&str> {
        self.natural_language.as_deref()
    }

    pub fn status(&self) -> QueryStatus {
        self.status
    }

    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == QueryStatus::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.status == QueryStatus::Failed
    }

    pub fn events(&self) -> &[QueryEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<QueryEvent> {
        self.events.drain()
    }
}
