use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{EventLog, SchemaContext, SqlStatement};

/// Non-blank natural language question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NaturalLanguageQuery(String);

impl NaturalLanguageQuery {
    pub fn new(text: impl Into<String>) -> Result<Self, AppError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AppError::Validation(
                "Natural language query cannot be blank".to_string(),
            ));
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NaturalLanguageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationRequestId(Uuid);

impl TranslationRequestId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TranslationRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranslationStatus {
    Pending,
    Translated,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TranslationEvent {
    TranslationRequested {
        request_id: TranslationRequestId,
        query: NaturalLanguageQuery,
        schema_context: SchemaContext,
        occurred_at: DateTime<Utc>,
    },
    TranslationCompleted {
        request_id: TranslationRequestId,
        translated_sql: SqlStatement,
        occurred_at: DateTime<Utc>,
    },
    TranslationFailed {
        request_id: TranslationRequestId,
        error_message: String,
        occurred_at: DateTime<Utc>,
    },
}

impl TranslationEvent {
    pub fn request_id(&self) -> TranslationRequestId {
        match self {
            TranslationEvent::TranslationRequested { request_id, .. }
            | TranslationEvent::TranslationCompleted { request_id, .. }
            | TranslationEvent::TranslationFailed { request_id, .. } => *request_id,
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            TranslationEvent::TranslationRequested { occurred_at, .. }
            | TranslationEvent::TranslationCompleted { occurred_at, .. }
            | TranslationEvent::TranslationFailed { occurred_at, .. } => *occurred_at,
        }
    }
}

/// One natural language to SQL translation, holding the schema snapshot
/// it was made against.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationRequest {
    id: TranslationRequestId,
    query: NaturalLanguageQuery,
    schema_context: SchemaContext,
    status: TranslationStatus,
    translated_sql: Option<SqlStatement>,
    error_message: Option<String>,
    requested_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: EventLog<TranslationEvent>,
}

impl TranslationRequest {
    pub fn new(query: NaturalLanguageQuery, schema_context: SchemaContext) -> Self {
        let id = TranslationRequestId::generate();
        let requested_at = Utc::now();
        let mut events = EventLog::new();
        events.record(TranslationEvent::TranslationRequested {
            request_id: id,
            query: query.clone(),
            schema_context: schema_context.clone(),
            occurred_at: requested_at,
        });

        Self {
            id,
            query,
            schema_context,
            status: TranslationStatus::Pending,
            translated_sql: None,
            error_message: None,
            requested_at,
            completed_at: None,
            events,
        }
    }

    pub fn mark_completed(&mut self, sql: SqlStatement) -> Result<(), AppError> {
        if self.status != TranslationStatus::Pending {
            return Err(AppError::illegal_transition("translation", self.status, "complete"));
        }
        let now = Utc::now();
        self.status = TranslationStatus::Translated;
        self.completed_at = Some(now);
        self.events.record(TranslationEvent::TranslationCompleted {
            request_id: self.id,
            translated_sql: sql.clone(),
            occurred_at: now,
        });
        self.translated_sql = Some(sql);
        Ok(())
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        let error_message = error_message.into();
        let now = Utc::now();
        self.status = TranslationStatus::Failed;
        self.error_message = Some(error_message.clone());
        self.completed_at = Some(now);
        self.events.record(TranslationEvent::TranslationFailed {
            request_id: self.id,
            error_message,
            occurred_at: now,
        });
    }

    pub fn id(&self) -> TranslationRequestId {
        self.id
    }

    pub fn query(&self) -> &NaturalLanguageQuery {
        &self.query
    }

    pub fn schema_context(&self) -> &SchemaContext {
        &self.schema_context
    }

    pub fn status(&self) -> TranslationStatus {
        self.status
    }

    pub fn translated_sql(&self) -> Option<&SqlStatement> {
        self.translated_sql.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_translated(&self) -> bool {
        self.status == TranslationStatus::Translated
    }

    pub fn is_failed(&self) -> bool {
        self.status == TranslationStatus::Failed
    }

    pub fn events(&self) -> &[TranslationEvent] {
        self.events.pending()
    }

    pub fn drain_events(&mut self) -> Vec<TranslationEvent> {
        self.events.drain()
    }
}
