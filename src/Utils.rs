//! different utility modules used throughout the project
/// TOML configuration with defaults for every field
pub mod config;
/// terminal and file logger
pub mod logger;
