// romtidy - ROM collection reconciliation
//
// This is the library crate containing the reconciliation engine and its data
// structures. The binary crate (main.rs) provides the command-line entry point.

pub mod config;
pub mod journal;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod state;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use journal::{EXIT_LOG_FAILURE, Journal, JournalError};
pub use models::{RomtidyConfig, SystemConfig, ZipPolicy};
pub use services::{Reconciler, ReconcileError, RunReport};
pub use state::RunContext;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
