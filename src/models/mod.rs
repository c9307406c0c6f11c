pub mod connection;
pub mod events;
pub mod query;
pub mod schema;
pub mod translation;

pub use connection::*;
pub use events::*;
pub use query::*;
pub use schema::*;
pub use translation::*;
