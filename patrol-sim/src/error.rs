use thiserror::Error;

/// Errors raised while preparing a simulation. Once a world exists, stepping
/// it cannot fail.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse {field}: {value:?}")]
    Parse { field: String, value: String },

    #[error("missing value for {0}")]
    MissingValue(String),

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("cost matrix has no rows or no columns")]
    EmptyCostMatrix,

    #[error("cost matrix row {row} has {found} entries, expected {expected}")]
    RaggedCostMatrix {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("{0}")]
    Usage(String),
}

impl SimError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
