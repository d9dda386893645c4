//! Support ticket assignment configuration.

use serde::{Deserialize, Serialize};

/// Support ticket assignment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportConfig {
    /// Seconds an assigned admin has to respond before reassignment.
    #[serde(default = "default_response_deadline")]
    pub response_deadline_seconds: u64,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self {
            response_deadline_seconds: default_response_deadline(),
        }
    }
}

fn default_response_deadline() -> u64 {
    300
}
