/// Database configuration and connection management
pub mod database;

/// Store configuration (sync settings and seed catalog) loading from config.toml
pub mod store;
