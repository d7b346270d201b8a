//! Type definitions and aliases

use std::str::FromStr;
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// What the requester does with a latency sample when the channel is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SendPolicy {
    /// Wait for the consumer to make room; the tick loop stalls meanwhile
    #[default]
    Block,
    /// Drop the sample that does not fit and keep ticking
    DropNewest,
}

impl SendPolicy {
    /// Name used in configuration files and environment variables
    pub fn as_str(&self) -> &'static str {
        match self {
            SendPolicy::Block => "block",
            SendPolicy::DropNewest => "drop-newest",
        }
    }
}

impl FromStr for SendPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "block" => Ok(SendPolicy::Block),
            "drop" | "drop-newest" | "drop_newest" => Ok(SendPolicy::DropNewest),
            other => Err(AppError::parse(format!("Invalid send policy: {}", other))),
        }
    }
}

/// How a single tick ended, as seen by the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Response arrived under the slow threshold
    Completed,
    /// Response arrived above the slow threshold and was logged
    Slow,
    /// Transport-level failure, logged and tolerated
    Failed,
}
