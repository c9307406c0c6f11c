pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod validation;

pub use error::AppError;
pub use models::*;
pub use services::*;
pub use validation::*;
