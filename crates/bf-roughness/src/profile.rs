//! Front density profile and the roughness reduction.

use bf_core::{Length, ensure_finite};
use serde::{Deserialize, Serialize};

use crate::grid::OccupancyGrid;
use crate::{AnalyzerResult, RoughnessError};

/// Roughness of one snapshot's biofilm/liquid interface.
///
/// `x_f` is 1-indexed: a front lying entirely in row 0 gives `x_f == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoughnessResult {
    /// Mean absolute deviation of the front row from `x_f` (grid units).
    pub sigma_f: f64,
    /// `sigma_f / x_f`.
    pub sigma: f64,
    /// Front-density weighted mean row.
    pub x_f: f64,
    /// Total front density, `sum(Cfx)`.
    pub p_f: f64,
    /// Highest occupied row index.
    pub height_index: usize,
}

impl RoughnessResult {
    /// Physical height of the highest occupied row.
    pub fn height(&self, resolution: Length) -> Length {
        resolution * self.height_index as f64
    }
}

/// Per-row front counts and densities `Cfx[i] = front_counts[i] / n_j`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontProfile {
    pub front_counts: Vec<usize>,
    pub cfx: Vec<f64>,
    /// Occupied grid elements behind the profile.
    pub occupied: usize,
}

impl FrontProfile {
    /// Profile of an already classified grid.
    pub fn from_grid(grid: &OccupancyGrid) -> Self {
        let front_counts = grid.front_counts();
        let n_j = grid.n_j() as f64;
        let cfx = front_counts.iter().map(|&c| c as f64 / n_j).collect();
        Self {
            front_counts,
            cfx,
            occupied: grid.occupied_count(),
        }
    }

    pub fn p_f(&self) -> f64 {
        self.cfx.iter().sum()
    }

    pub fn roughness(&self, height_index: usize) -> AnalyzerResult<RoughnessResult> {
        let p_f = self.p_f();
        if p_f == 0.0 {
            return Err(RoughnessError::NoFront {
                occupied: self.occupied,
            });
        }

        let weighted = |f: &dyn Fn(f64) -> f64| -> f64 {
            self.cfx
                .iter()
                .enumerate()
                .map(|(i, &c)| f((i + 1) as f64) * c)
                .sum::<f64>()
                / p_f
        };

        let x_f = ensure_finite(weighted(&|row| row), "Xf")?;
        let sigma_f = ensure_finite(weighted(&|row| (row - x_f).abs()), "Sigmaf")?;
        let sigma = ensure_finite(sigma_f / x_f, "Sigma")?;

        Ok(RoughnessResult {
            sigma_f,
            sigma,
            x_f,
            p_f,
            height_index,
        })
    }
}
