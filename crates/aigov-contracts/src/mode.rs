//! Execution mode of the governed workflow.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AigovError;

/// `ci` runs may use fallback evidence; `prod` runs may not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Ci,
    Prod,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Ci => "ci",
            ExecutionMode::Prod => "prod",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = AigovError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ci" => Ok(ExecutionMode::Ci),
            "prod" | "production" => Ok(ExecutionMode::Prod),
            other => Err(AigovError::ConfigError {
                reason: format!("unknown execution mode '{other}' (expected ci or prod)"),
            }),
        }
    }
}
