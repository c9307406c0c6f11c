// Database adapter trait: the seam between the services and a concrete driver
use crate::error::AppError;
use crate::models::{ConnectionConfig, QueryResult, SqlStatement};

/// Database adapter trait - abstraction layer over one live database session.
///
/// At most one session is open per adapter; `connect` replaces any previous one.
#[async_trait::async_trait]
pub trait DatabaseAdapter: Send + Sync {
    /// Open a session for the given configuration
    async fn connect(&self, config: &ConnectionConfig) -> Result<(), AppError>;

    /// Close the current session, if any
    async fn disconnect(&self) -> Result<(), AppError>;

    /// Whether a usable session is open
    async fn is_connected(&self) -> bool;

    /// Execute a statement on the open session.
    /// Row-returning statements yield their rows; others yield the affected row count.
    /// Both report elapsed wall time.
    async fn execute(&self, statement: &SqlStatement) -> Result<QueryResult, AppError>;

    /// Try the configuration on a throwaway session
    async fn test_connection(&self, config: &ConnectionConfig) -> bool;

    /// Get database type
    fn database_type(&self) -> &str;
}
