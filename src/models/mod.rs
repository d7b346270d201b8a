//! Data models and structures for the latency probe

pub mod config;

// Re-export main model types
pub use config::Config;
