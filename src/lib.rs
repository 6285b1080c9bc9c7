// Core modules
pub mod config;
pub mod exchange;
pub mod models;
pub mod report;
pub mod scheduler;

// Re-export commonly used types
pub use models::*;
pub use scheduler::{EventSink, ExecutionPlan, Phase, TwapScheduler};
