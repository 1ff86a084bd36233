pub mod app;
pub mod backend;
pub mod bridge;
pub mod config;
pub mod dlq;
pub mod domain;
pub mod error;
pub mod executor;
pub mod feed;
pub mod gate;
pub mod journal;
pub mod notifier;
pub mod orchestrator;
pub mod quote;
pub mod telemetry;

pub use error::{PayflowError, Result};
