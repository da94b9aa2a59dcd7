//! bf-roughness: biofilm/bulk-liquid front detection and roughness.
//!
//! Pipeline for one simulation snapshot:
//! - rasterise cell locations onto an occupancy grid ([`OccupancyGrid`])
//! - mark occupied grid elements touching empty space as front
//! - reduce the per-row front density to [`RoughnessResult`]
//!
//! The grid's first axis (`i`) is the growth direction away from the
//! substratum; the second (`j`) is periodic.

pub mod analyzer;
pub mod grid;
pub mod profile;
pub mod record;

pub use analyzer::{AnalyzerConfig, BiofilmRoughnessAnalyzer, RoughnessAnalysis, compute_roughness};
pub use grid::{Neighbourhood, Occupancy, OccupancyGrid};
pub use profile::{FrontProfile, RoughnessResult};
pub use record::{
    ROUGHNESS_HEADER, ROUGHNESS_SET_NAME, cached_roughness, forget_roughness, roughness_key,
};

pub type AnalyzerResult<T> = Result<T, RoughnessError>;

#[derive(thiserror::Error, Debug)]
pub enum RoughnessError {
    #[error(transparent)]
    Core(#[from] bf_core::BfError),

    #[error(transparent)]
    Results(#[from] bf_results::ResultsError),

    #[error("No cells to analyse")]
    NoCells,

    #[error("No front cells among {occupied} occupied grid elements; roughness is undefined")]
    NoFront { occupied: usize },

    #[error("Cell at ({x}, {y}) lies outside the {n_i}x{n_j} grid")]
    OutOfDomain {
        x: f64,
        y: f64,
        n_i: usize,
        n_j: usize,
    },

    #[error("Invalid roughness record: {reason}")]
    InvalidRecord { reason: String },
}
