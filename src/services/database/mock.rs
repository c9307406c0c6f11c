//! Scripted database adapter for tests.
//!
//! Responses are matched by substring against the executed SQL, first match wins.
//! Every executed statement is recorded so tests can assert on what was sent.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{ConnectionConfig, QueryMetadata, QueryResult, SqlStatement};
use crate::services::database::adapter::DatabaseAdapter;

#[derive(Debug, Default)]
pub struct MockDatabase {
    connected: AtomicBool,
    fail_connect: AtomicBool,
    fail_disconnect: AtomicBool,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    responses: Mutex<Vec<(String, Result<QueryResult, String>)>>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start in the connected state without going through `connect`
    pub fn connected() -> Self {
        let mock = Self::new();
        mock.connected.store(true, Ordering::SeqCst);
        mock
    }

    pub fn failing_connect(self) -> Self {
        self.fail_connect.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_disconnect(self) -> Self {
        self.fail_disconnect.store(true, Ordering::SeqCst);
        self
    }

    /// Answer statements containing `pattern` with rows
    pub fn with_rows(
        self,
        pattern: &str,
        columns: &[&str],
        rows: Vec<Vec<serde_json::Value>>,
    ) -> Self {
        let result = QueryResult::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.clone(),
            QueryMetadata {
                affected_rows: rows.len() as u64,
                execution_time: Duration::from_millis(1),
            },
        );
        self.responses
            .lock()
            .unwrap()
            .push((pattern.to_string(), Ok(result)));
        self
    }

    /// Fail statements containing `pattern` with the given driver message
    pub fn with_error(self, pattern: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push((pattern.to_string(), Err(message.to_string())));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DatabaseAdapter for MockDatabase {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<(), AppError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(AppError::Internal("connection refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AppError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(AppError::Internal("socket already closed".to_string()));
        }
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<QueryResult, AppError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AppError::NotConnected);
        }
        let sql = statement.normalized().to_string();
        self.executed.lock().unwrap().push(sql.clone());

        let responses = self.responses.lock().unwrap();
        match responses.iter().find(|(pattern, _)| sql.contains(pattern.as_str())) {
            Some((_, Ok(result))) => Ok(result.clone()),
            Some((_, Err(message))) => Err(AppError::query_execution_failed(&sql, message)),
            None => Ok(QueryResult::empty(Duration::from_millis(1))),
        }
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> bool {
        !self.fail_connect.load(Ordering::SeqCst) && !config.host().is_empty()
    }

    fn database_type(&self) -> &str {
        "mock"
    }
}
