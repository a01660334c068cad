/// Database configuration and connection management
pub mod database;

/// Ledger, budget and permission settings from config.toml
pub mod settings;
