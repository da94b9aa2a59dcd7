//! Roughness analysis of one snapshot.

use bf_core::{BfError, ensure_finite};
use serde::{Deserialize, Serialize};

use crate::grid::{Neighbourhood, OccupancyGrid};
use crate::profile::{FrontProfile, RoughnessResult};
use crate::{AnalyzerResult, RoughnessError};

/// Domain discretisation used for rasterising cell locations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Grid element edge length, same unit as the cell locations.
    pub resolution: f64,
    pub n_i: usize,
    pub n_j: usize,
    #[serde(default)]
    pub neighbourhood: Neighbourhood,
}

impl AnalyzerConfig {
    pub fn new(resolution: f64, n_i: usize, n_j: usize) -> Self {
        Self {
            resolution,
            n_i,
            n_j,
            neighbourhood: Neighbourhood::default(),
        }
    }

    pub fn with_neighbourhood(mut self, neighbourhood: Neighbourhood) -> Self {
        self.neighbourhood = neighbourhood;
        self
    }

    fn validate(&self) -> AnalyzerResult<()> {
        ensure_finite(self.resolution, "grid resolution")?;
        if self.resolution <= 0.0 {
            return Err(BfError::InvalidArg {
                what: "grid resolution must be positive",
            }
            .into());
        }
        if self.n_i == 0 || self.n_j == 0 {
            return Err(BfError::InvalidArg {
                what: "grid dimensions must be non-zero",
            }
            .into());
        }
        Ok(())
    }
}

/// Everything computed for one snapshot, for callers that want more than
/// the headline numbers.
#[derive(Debug, Clone)]
pub struct RoughnessAnalysis {
    pub grid: OccupancyGrid,
    pub profile: FrontProfile,
    pub result: RoughnessResult,
}

#[derive(Debug, Clone)]
pub struct BiofilmRoughnessAnalyzer {
    config: AnalyzerConfig,
}

impl BiofilmRoughnessAnalyzer {
    pub fn new(config: AnalyzerConfig) -> AnalyzerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn analyze<I>(&self, locations: I) -> AnalyzerResult<RoughnessResult>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        Ok(self.analyze_detailed(locations)?.result)
    }

    pub fn analyze_detailed<I>(&self, locations: I) -> AnalyzerResult<RoughnessAnalysis>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let AnalyzerConfig {
            resolution,
            n_i,
            n_j,
            neighbourhood,
        } = self.config;

        let mut grid = OccupancyGrid::rasterize(locations, resolution, n_i, n_j)?;
        let Some(height_index) = grid.max_i_seen() else {
            return Err(RoughnessError::NoCells);
        };

        grid.classify_front(neighbourhood);
        let profile = FrontProfile::from_grid(&grid);
        let result = profile.roughness(height_index)?;

        tracing::trace!(
            occupied = grid.occupied_count(),
            p_f = result.p_f,
            sigma_f = result.sigma_f,
            "roughness computed"
        );

        Ok(RoughnessAnalysis {
            grid,
            profile,
            result,
        })
    }
}

/// One-shot roughness with the default 4-neighbour front rule.
pub fn compute_roughness<I>(
    locations: I,
    resolution: f64,
    n_i: usize,
    n_j: usize,
) -> AnalyzerResult<RoughnessResult>
where
    I: IntoIterator<Item = [f64; 2]>,
{
    BiofilmRoughnessAnalyzer::new(AnalyzerConfig::new(resolution, n_i, n_j))?.analyze(locations)
}
