use thiserror::Error;

/// Every way a calculation request can fail. The first four are problems with the
/// user's input, `Computation` covers everything the symbolic layer or the sampler
/// reports; its message is passed through unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculationError {
    /// name of the first missing field
    #[error("Required data is incomplete")]
    MissingField(String),

    #[error("Invalid function: {0}")]
    InvalidFunction(String),

    #[error("Invalid bound: {0}")]
    InvalidBound(String),

    #[error("Lower bound must be smaller than upper bound")]
    BoundOrder,

    #[error("{0}")]
    Computation(String),
}

impl CalculationError {
    /// HTTP status the web layer answers with
    pub fn status_code(&self) -> u16 {
        match self {
            CalculationError::MissingField(_)
            | CalculationError::InvalidFunction(_)
            | CalculationError::InvalidBound(_)
            | CalculationError::BoundOrder => 400,
            CalculationError::Computation(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.status_code() == 400
    }
}

pub type CalculationResult<T> = Result<T, CalculationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_status() {
        let missing = CalculationError::MissingField("upper".to_string());
        assert_eq!(missing.to_string(), "Required data is incomplete");
        assert_eq!(missing.status_code(), 400);
        assert_eq!(
            CalculationError::InvalidFunction("unknown symbol 'y'".into()).to_string(),
            "Invalid function: unknown symbol 'y'"
        );
        assert_eq!(
            CalculationError::BoundOrder.to_string(),
            "Lower bound must be smaller than upper bound"
        );
        let failed = CalculationError::Computation("the integral diverges at x = 0".into());
        assert_eq!(failed.to_string(), "the integral diverges at x = 0");
        assert_eq!(failed.status_code(), 500);
        assert!(!failed.is_client_error());
    }
}
