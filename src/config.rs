use serde::{Deserialize, Serialize};

use crate::{
    executor::Strategy,
    expression::{Resolver, case_insensitive_resolution, case_sensitive_resolution},
};

/// Session-level knobs for analysis and optimization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub case_sensitive: bool,
    pub max_iterations: usize,
    pub error_on_exceed: bool,
    pub check_once_idempotence: bool,
    pub plan_change_logging: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            max_iterations: 100,
            error_on_exceed: false,
            check_once_idempotence: false,
            plan_change_logging: false,
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn case_sensitive() -> Self {
        Self { case_sensitive: true, ..Self::default() }
    }

    pub fn strict(max_iterations: usize) -> Self {
        Self { max_iterations, error_on_exceed: true, check_once_idempotence: true, ..Self::default() }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn resolver(&self) -> Resolver {
        if self.case_sensitive { case_sensitive_resolution } else { case_insensitive_resolution }
    }

    pub fn fixed_point(&self) -> Strategy {
        Strategy::FixedPoint { max_iterations: self.max_iterations, error_on_exceed: self.error_on_exceed }
    }
}
