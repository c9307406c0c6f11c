pub mod connection;
pub mod query;
pub mod schema;

pub use connection::AppState;
