use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiskParityError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (objective: {last_objective})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_objective: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Degenerate allocation: {0}")]
    DegenerateAllocation(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RiskParityError {
    fn from(e: serde_json::Error) -> Self {
        RiskParityError::SerializationError(e.to_string())
    }
}
