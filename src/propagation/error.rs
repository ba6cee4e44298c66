use thiserror::Error;

#[derive(Debug, Error)]
pub enum PropagationError {
    #[error("malformed elements for {name}: {message}")]
    MalformedElement { name: String, message: String },
    #[error("propagation oracle unavailable: {0}")]
    OracleUnavailable(String),
    #[error("invalid sample grid: {0}")]
    InvalidGrid(String),
}

impl PropagationError {
    pub fn malformed(name: &str, message: impl ToString) -> Self {
        PropagationError::MalformedElement {
            name: name.to_string(),
            message: message.to_string(),
        }
    }
}
