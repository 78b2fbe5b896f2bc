use thiserror::Error;

/// Terminal failures of a scoring run. There is no partial-success mode:
/// either every wallet is scored or the run fails with one of these.
#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    /// A transaction record is malformed or missing a required field.
    #[error("data error in record {index}: {reason}")]
    Data { index: usize, reason: String },

    /// The feature matrix cannot be used to fit or apply the model.
    #[error("model error: {0}")]
    Model(String),
}

impl ScoreError {
    pub fn data(index: usize, reason: impl Into<String>) -> Self {
        Self::Data {
            index,
            reason: reason.into(),
        }
    }

    pub fn model(reason: impl Into<String>) -> Self {
        Self::Model(reason.into())
    }

    pub fn is_data(&self) -> bool {
        matches!(self, Self::Data { .. })
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }
}

pub type ScoreResult<T> = Result<T, ScoreError>;
