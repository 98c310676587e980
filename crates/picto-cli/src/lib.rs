//! Picto CLI: interactive photo-evaluation shell and batch photo enrichment.

pub mod commands;
pub mod config;
pub mod output;
pub mod repl;

pub use commands::App;
pub use config::{load_settings, resolve_config_path};
