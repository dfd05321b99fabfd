use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the transformation engine.
///
/// Recoverable conditions (syntax diagnostics, non-termination) are not
/// errors; they travel next to a usable result as [`Warning`]s or
/// [`crate::ast::Diagnostic`]s.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Parse error: input is empty")]
    EmptyInput,

    #[error("Graph validation error: {message}")]
    GraphValidation { message: String },

    #[error("Rule load error in '{rule}': {reason}")]
    RuleLoad { rule: String, reason: String },

    #[error("Unknown rule: {rule}")]
    UnknownRule { rule: String },

    #[error("Rule '{rule}' is not applicable to this graph")]
    RuleNotApplicable { rule: String },

    #[error("Cyclic dependency involving node '{node}'")]
    CyclicDependency { node: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::GraphValidation {
            message: message.into(),
        }
    }

    pub fn rule_load(rule: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RuleLoad {
            rule: rule.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Non-fatal conditions reported alongside a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Warning {
    /// The iteration cap was hit while matches were still available.
    #[serde(rename_all = "camelCase")]
    NonTermination { iterations: usize, pending: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NonTermination {
                iterations,
                pending,
            } => write!(
                f,
                "no fixpoint after {} iterations ({} matches still pending)",
                iterations, pending
            ),
        }
    }
}
