use thiserror::Error;

use super::types::ObjectIdentity;
use crate::propagation::PropagationError;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("sample grids differ for {object_a} / {object_b} ({len_a} vs {len_b} samples)")]
    Alignment {
        object_a: ObjectIdentity,
        object_b: ObjectIdentity,
        len_a: usize,
        len_b: usize,
    },
    #[error(transparent)]
    Propagation(#[from] PropagationError),
    #[error("scan worker failed: {0}")]
    Worker(String),
}

impl ScanError {
    /// Errors that void the whole scan rather than a single object or pair.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ScanError::Propagation(PropagationError::OracleUnavailable(_))
                | ScanError::Propagation(PropagationError::InvalidGrid(_))
                | ScanError::Worker(_)
        )
    }
}
