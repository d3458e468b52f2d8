use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("{0}")]
    Validation(String),

    /// The baseline instrument has no data for the window; fatal to the whole batch.
    #[error("No {0} data")]
    NoBaselineData(String),

    #[error("No data for {0}")]
    DataUnavailable(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Model fit failed: {0}")]
    ModelFit(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalysisError {
    /// Stage-level failures that the orchestrator folds into `DataUnavailable`.
    pub fn is_symbol_failure(&self) -> bool {
        matches!(
            self,
            AnalysisError::DataUnavailable(_)
                | AnalysisError::InsufficientData(_)
                | AnalysisError::ModelFit(_)
        )
    }
}
