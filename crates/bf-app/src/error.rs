//! Error types for the bf-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the CLI one error interface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Project(String),

    #[error("Simulation output error: {0}")]
    Simulation(String),

    #[error("Roughness analysis failed: {0}")]
    Analysis(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("No {what} results for `{simulation_id}` in {path}")]
    ResultsNotFound {
        path: PathBuf,
        what: String,
        simulation_id: String,
    },

    #[error("{failed} of {total} simulations failed")]
    BatchFailed { failed: usize, total: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<bf_project::ProjectError> for AppError {
    fn from(err: bf_project::ProjectError) -> Self {
        AppError::Project(err.to_string())
    }
}

impl From<bf_idyno::IdynoError> for AppError {
    fn from(err: bf_idyno::IdynoError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<bf_roughness::RoughnessError> for AppError {
    fn from(err: bf_roughness::RoughnessError) -> Self {
        AppError::Analysis(err.to_string())
    }
}

impl From<bf_results::ResultsError> for AppError {
    fn from(err: bf_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
