pub mod app;
pub mod config;
pub mod console;
pub mod data;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use data::{merge_tables, TableLoader, JOIN_KEY};
pub use error::AppError;
pub use service::{AgentBridge, QueryLoop};
