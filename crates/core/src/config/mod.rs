//! Configuration management for the addon manager

mod settings;

// Re-export main types
pub use settings::{CONFIG_FILE_NAME, Config};
