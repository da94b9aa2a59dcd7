//! Query helpers for stored roughness results.

use std::collections::BTreeMap;
use std::path::Path;

use bf_core::mean_std;
use bf_results::ResultStore;
use bf_roughness::{RoughnessResult, roughness_key};
use serde::Serialize;

use crate::error::{AppError, AppResult};

/// Stored roughness of one simulation, sorted by iterate.
pub fn roughness_series(
    store_path: &Path,
    simulation_id: &str,
) -> AppResult<Vec<(u64, RoughnessResult)>> {
    let store = ResultStore::open_read_only(store_path)?;
    let set = store
        .find_result_set(&roughness_key(simulation_id))
        .ok_or_else(|| AppError::ResultsNotFound {
            path: store_path.to_path_buf(),
            what: "roughness".to_string(),
            simulation_id: simulation_id.to_string(),
        })?;

    let mut series = set
        .records()
        .iter()
        .map(RoughnessResult::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    series.sort_by_key(|(iterate, _)| *iterate);
    Ok(series)
}

/// Sigmaf statistics of all snapshots sharing one biofilm height.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightBin {
    pub height_index: usize,
    pub mean_sigma_f: f64,
    pub std_sigma_f: f64,
    pub count: usize,
}

/// Roughness against biofilm height. Snapshots with zero roughness (flat
/// or single-row fronts) are left out.
pub fn roughness_by_height(results: &[(u64, RoughnessResult)]) -> Vec<HeightBin> {
    let mut bins: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for (_, r) in results {
        if r.sigma_f == 0.0 {
            continue;
        }
        bins.entry(r.height_index).or_default().push(r.sigma_f);
    }

    bins.into_iter()
        .filter_map(|(height_index, values)| {
            let (mean, std) = mean_std(&values)?;
            Some(HeightBin {
                height_index,
                mean_sigma_f: mean,
                std_sigma_f: std,
                count: values.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(sigma_f: f64, height_index: usize) -> RoughnessResult {
        RoughnessResult {
            sigma_f,
            sigma: sigma_f,
            x_f: 1.0,
            p_f: 1.0,
            height_index,
        }
    }

    #[test]
    fn bins_by_height_and_skips_flat_fronts() {
        let results = [
            (0, r(0.0, 2)),
            (1, r(1.0, 2)),
            (2, r(3.0, 2)),
            (3, r(0.5, 5)),
            (4, r(0.0, 7)),
        ];
        let bins = roughness_by_height(&results);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].height_index, 2);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[0].mean_sigma_f, 2.0);
        assert_eq!(bins[0].std_sigma_f, 1.0);
        assert_eq!(bins[1].height_index, 5);
        assert_eq!(bins[1].std_sigma_f, 0.0);
    }

    #[test]
    fn no_results_no_bins() {
        assert!(roughness_by_height(&[]).is_empty());
    }
}
