// Database abstraction layer
pub mod adapter;
pub mod postgresql;

#[cfg(test)]
pub mod mock;

pub use adapter::DatabaseAdapter;
pub use postgresql::PostgreSQLAdapter;

use crate::config::DatabaseConfig;
use std::sync::Arc;

/// Factory function to create the database adapter from configuration
pub fn create_adapter(config: &DatabaseConfig) -> Arc<dyn DatabaseAdapter> {
    Arc::new(PostgreSQLAdapter::new(
        config.pool_size,
        config.query_timeout(),
    ))
}
