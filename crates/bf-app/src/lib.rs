//! Shared application service layer for biofront.
//!
//! The CLI goes through this crate for everything: analysing simulation
//! directories with result caching, exporting cell locations, batch runs
//! over a configuration file and querying stored results.

pub mod analysis_service;
pub mod error;
pub mod locations_service;
pub mod progress;
pub mod query;

pub use analysis_service::{
    AnalysisOptions, BatchOutcome, DEFAULT_STORE_FILE, IterateFailure, RoughnessRequest,
    RoughnessResponse, SimulationOutcome, ensure_roughness, ensure_roughness_with_progress,
    run_batch, run_batch_with_progress,
};
pub use error::{AppError, AppResult};
pub use locations_service::{LOCATIONS_FILE, LocationsExport, export_cell_locations};
pub use progress::{AnalysisProgressEvent, AnalysisStage};
pub use query::{HeightBin, roughness_by_height, roughness_series};

/// Load and validate an analysis configuration.
pub fn load_config(path: &std::path::Path) -> AppResult<bf_project::AnalysisConfig> {
    Ok(bf_project::load_yaml(path)?)
}
