use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("Invalid range {input:?}: {reason}")]
    InvalidRangeSyntax { input: String, reason: String },

    #[error("Invalid card notation: {0}")]
    InvalidCardSyntax(String),

    #[error("Invalid bet size token: {0}")]
    InvalidSizeSyntax(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Requested bet of {requested} exceeds remaining stack {stack}; clamped to all-in")]
    StackExhausted { requested: i32, stack: i32 },

    #[error("Strategy queried before solve() completed")]
    NotSolved,

    #[error("Normalized weights queried before cache_normalized_weights()")]
    WeightsNotCached,

    #[error("Action index {index} out of range ({limit} available)")]
    InvalidActionIndex { index: usize, limit: usize },

    #[error("No actions at the current node (terminal or chance)")]
    AtTerminalNode,

    #[error("Exploitability {exploitability:.4} did not reach target {target:.4}")]
    DidNotConverge { exploitability: f64, target: f64 },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type SolverResult<T> = Result<T, SolverError>;
