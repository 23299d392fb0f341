use std::path::PathBuf;

/// Every failure the assessment pipeline can surface.
///
/// Each variant maps to a process exit code so `main` can stay a thin wrapper.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskError {
    /// The model artifact or its schema could not be loaded. Fatal at startup.
    #[error("Failed to load model '{}': {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// The aligned table does not fit the model, or the model produced garbage.
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Strict mode refused to impute these model columns.
    #[error("Missing or unusable inputs for model columns: {}", .0.join(", "))]
    MissingInputs(Vec<String>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A finished assessment could not be rendered for output.
    #[error("Output error: {0}")]
    Output(String),
}

impl RiskError {
    pub fn model_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            RiskError::InvalidInput(_) | RiskError::MissingInputs(_) | RiskError::Config(_) => 2,
            RiskError::ModelLoad { .. } => 3,
            RiskError::Inference(_) => 4,
            RiskError::Terminal(_) => 5,
            RiskError::Output(_) => 1,
        }
    }
}
