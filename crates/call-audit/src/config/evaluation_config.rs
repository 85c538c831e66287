use crate::config::default_fail_open;

use serde::{Deserialize, Serialize};

/// Rubric evaluation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Whether an evaluation outage counts the call as satisfactory
    /// (historical behavior) or flags it for review.
    #[serde(default = "default_fail_open")]
    pub fail_open: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            fail_open: default_fail_open(),
        }
    }
}
