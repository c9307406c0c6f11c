pub mod connection_service;
pub mod database; // Database capability and the PostgreSQL adapter
pub mod llm_service;
pub mod query_service;
pub mod schema_service;
pub mod translation_service;

pub use connection_service::*;
pub use database::{create_adapter, DatabaseAdapter, PostgreSQLAdapter};
pub use llm_service::{LlmClient, OllamaClient};
pub use query_service::*;
pub use schema_service::*;
pub use translation_service::*;
