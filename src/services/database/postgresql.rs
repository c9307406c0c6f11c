// PostgreSQL adapter using a small deadpool for the active connection
use crate::error::AppError;
use crate::models::{ConnectionConfig, QueryMetadata, QueryResult, SqlStatement};
use crate::services::database::adapter::DatabaseAdapter;
use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::Type;
use tokio_postgres::{NoTls, Row};

const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

pub struct PostgreSQLAdapter {
    pool: RwLock<Option<Pool>>,
    pool_size: usize,
    query_timeout: Duration,
}

enum Outcome {
    Rows(Vec<String>, Vec<Row>),
    Affected(u64),
}

impl PostgreSQLAdapter {
    pub fn new(pool_size: usize, query_timeout: Duration) -> Self {
        Self {
            pool: RwLock::new(None),
            pool_size: pool_size.max(1),
            query_timeout,
        }
    }

    fn build_pool(&self, config: &ConnectionConfig) -> Result<Pool, AppError> {
        let mut cfg = PoolConfig::new();
        cfg.host = Some(config.host().to_string());
        cfg.port = Some(config.port());
        cfg.dbname = Some(config.database().to_string());
        cfg.user = Some(config.username().to_string());
        cfg.password = Some(config.password().to_string());
        cfg.connect_timeout = Some(self.query_timeout);
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                AppError::connection_failed(config.host(), config.port(), e)
            })?;
        pool.resize(self.pool_size);
        Ok(pool)
    }

    async fn current_pool(&self) -> Result<Pool, AppError> {
        self.pool.read().await.clone().ok_or(AppError::NotConnected)
    }

    /// Syntax errors are the caller's SQL being malformed; anything else is an
    /// execution failure
    fn execution_error(sql: &str, code: Option<&SqlState>, details: String) -> AppError {
        if code == Some(&SqlState::SYNTAX_ERROR) {
            AppError::invalid_sql(sql)
        } else {
            AppError::query_execution_failed(sql, details)
        }
    }

    /// Render a driver error with the server's code, detail and hint when present
    fn describe_error(e: &tokio_postgres::Error) -> String {
        match e.as_db_error() {
            Some(db_error) => {
                let mut details = format!("{}: {}", db_error.code().code(), db_error.message());
                if let Some(detail) = db_error.detail() {
                    details.push_str(&format!(", Detail: {}", detail));
                }
                if let Some(hint) = db_error.hint() {
                    details.push_str(&format!(", Hint: {}", hint));
                }
                details
            }
            None => e.to_string(),
        }
    }

    /// Convert one cell to JSON based on its PostgreSQL type
    fn cell_to_json(row: &Row, idx: usize, column_type: &Type) -> Value {
        match *column_type {
            Type::BOOL => row
                .try_get::<_, Option<bool>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, Value::Bool),
            Type::INT2 => row
                .try_get::<_, Option<i16>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v)),
            Type::INT4 => row
                .try_get::<_, Option<i32>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v)),
            Type::INT8 => row
                .try_get::<_, Option<i64>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v)),
            Type::OID => row
                .try_get::<_, Option<u32>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v)),
            Type::FLOAT4 => row
                .try_get::<_, Option<f32>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v)),
            Type::FLOAT8 => row
                .try_get::<_, Option<f64>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v)),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => row
                .try_get::<_, Option<String>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, Value::String),
            Type::JSON | Type::JSONB => row
                .try_get::<_, Option<Value>>(idx)
                .ok()
                .flatten()
                .unwrap_or(Value::Null),
            Type::TIMESTAMP => row
                .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v.to_string())),
            Type::TIMESTAMPTZ => row
                .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v.to_rfc3339())),
            Type::DATE => row
                .try_get::<_, Option<chrono::NaiveDate>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v.to_string())),
            Type::TIME => row
                .try_get::<_, Option<chrono::NaiveTime>>(idx)
                .ok()
                .flatten()
                .map_or(Value::Null, |v| json!(v.to_string())),
            _ => match row.try_get::<_, Option<String>>(idx) {
                Ok(Some(v)) => Value::String(v),
                Ok(None) => Value::Null,
                // Types without a text mapping are shown by name
                Err(_) => json!(format!("<{}>", column_type.name())),
            },
        }
    }

    fn rows_to_json(rows: &[Row]) -> Vec<Vec<Value>> {
        rows.iter()
            .map(|row| {
                row.columns()
                    .iter()
                    .enumerate()
                    .map(|(idx, column)| Self::cell_to_json(row, idx, column.type_()))
                    .collect()
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl DatabaseAdapter for PostgreSQLAdapter {
    async fn connect(&self, config: &ConnectionConfig) -> Result<(), AppError> {
        let pool = self.build_pool(config)?;

        // Check out a client so a bad configuration fails here, not on first query
        let _client = pool
            .get()
            .await
            .map_err(|e| AppError::connection_failed(config.host(), config.port(), e))?;

        let previous = self.pool.write().await.replace(pool);
        if let Some(previous) = previous {
            previous.close();
        }

        tracing::debug!("PostgreSQL connection established: {}", config.to_connection_url());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), AppError> {
        if let Some(pool) = self.pool.write().await.take() {
            pool.close();
            tracing::debug!("PostgreSQL connection closed");
        }
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        let Ok(pool) = self.current_pool().await else {
            return false;
        };
        let probe = async {
            let client = pool.get().await.ok()?;
            client.simple_query("SELECT 1").await.ok()
        };
        matches!(
            tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe).await,
            Ok(Some(_))
        )
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<QueryResult, AppError> {
        let pool = self.current_pool().await?;
        let sql = statement.normalized();

        let client = pool
            .get()
            .await
            .map_err(|e| AppError::query_execution_failed(sql, e))?;

        let start_time = Instant::now();
        let run = async {
            let prepared = client.prepare(sql).await?;
            if prepared.columns().is_empty() {
                let affected = client.execute(&prepared, &[]).await?;
                Ok::<_, tokio_postgres::Error>(Outcome::Affected(affected))
            } else {
                let columns = prepared
                    .columns()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect();
                let rows = client.query(&prepared, &[]).await?;
                Ok(Outcome::Rows(columns, rows))
            }
        };

        let outcome = tokio::time::timeout(self.query_timeout, run)
            .await
            .map_err(|_| {
                AppError::query_execution_failed(
                    sql,
                    format!("Query timeout after {} seconds", self.query_timeout.as_secs()),
                )
            })?
            .map_err(|e| {
                let details = Self::describe_error(&e);
                tracing::error!("Query execution error: {}", details);
                Self::execution_error(sql, e.code(), details)
            })?;
        let execution_time = start_time.elapsed();

        Ok(match outcome {
            Outcome::Affected(affected) => QueryResult::affected(affected, execution_time),
            Outcome::Rows(columns, rows) => {
                let values = Self::rows_to_json(&rows);
                QueryResult::new(
                    columns,
                    values,
                    QueryMetadata {
                        affected_rows: rows.len() as u64,
                        execution_time,
                    },
                )
            }
        })
    }

    async fn test_connection(&self, config: &ConnectionConfig) -> bool {
        let pool = match self.build_pool(config) {
            Ok(pool) => pool,
            Err(e) => {
                tracing::debug!("Connection test failed: {}", e);
                return false;
            }
        };
        let probe = async {
            let client = pool.get().await.ok()?;
            client.simple_query("SELECT 1").await.ok()
        };
        let ok = matches!(
            tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe).await,
            Ok(Some(_))
        );
        pool.close();
        ok
    }

    fn database_type(&self) -> &str {
        "postgresql"
    }
}
