pub mod identifier_guard;

pub use identifier_guard::*;
