//! Terminal commands. Each opens its own [`OracleContext`](crate::context::OracleContext)
//! and closes the vector subprocess before returning.

pub mod doctor;
pub mod import;
pub mod reindex;
pub mod search;
pub mod similar;
pub mod stats;

pub use doctor::doctor;
pub use import::import;
pub use reindex::reindex;
pub use search::search;
pub use similar::similar;
pub use stats::stats;
