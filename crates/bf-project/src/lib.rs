//! bf-project: YAML analysis configuration and validation.

pub mod schema;
pub mod validate;

use std::path::Path;

pub use schema::*;
pub use validate::{LATEST_VERSION, ValidationError, validate_config};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Load and validate a configuration. Relative simulation paths are
/// resolved against the directory holding `path`.
pub fn load_yaml(path: &Path) -> ProjectResult<AnalysisConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: AnalysisConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;

    if let Some(base) = path.parent() {
        for sim in &mut config.simulations {
            if sim.path.is_relative() {
                sim.path = base.join(&sim.path);
            }
        }
    }
    Ok(config)
}

pub fn save_yaml(path: &Path, config: &AnalysisConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
