use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bf_results::ResultStore;
use bf_roughness::{
    AnalyzerConfig, BiofilmRoughnessAnalyzer, Neighbourhood, ROUGHNESS_HEADER, RoughnessError,
    RoughnessResult, cached_roughness, compute_roughness, forget_roughness, roughness_key,
};
use proptest::prelude::*;

const RES: f64 = 4.0;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn centre(i: usize, j: usize) -> [f64; 2] {
    [(i as f64 + 0.5) * RES, (j as f64 + 0.5) * RES]
}

/// Columns filled from the substratum up to `heights[j]` elements.
fn columns(heights: &[usize]) -> Vec<[f64; 2]> {
    heights
        .iter()
        .enumerate()
        .flat_map(|(j, &h)| (0..h).map(move |i| centre(i, j)))
        .collect()
}

#[test]
fn isolated_cell_in_the_middle() {
    let r = compute_roughness([centre(1, 1)], RES, 3, 3).unwrap();
    assert_eq!(r.x_f, 2.0);
    assert_eq!(r.sigma_f, 0.0);
    assert_eq!(r.sigma, 0.0);
    assert!((r.p_f - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(r.height_index, 1);
}

#[test]
fn cells_across_the_periodic_edge() {
    let r = compute_roughness([centre(0, 0), centre(0, 3)], RES, 2, 4).unwrap();
    assert_eq!(r.p_f, 0.5);
    assert_eq!(r.x_f, 1.0);
}

#[test]
fn single_full_row_on_the_substratum() {
    let r = compute_roughness(columns(&[1, 1, 1, 1, 1]), RES, 2, 5).unwrap();
    assert_eq!(r.x_f, 1.0);
    assert_eq!(r.sigma_f, 0.0);
    assert_eq!(r.sigma, 0.0);
    assert_eq!(r.p_f, 1.0);
    assert_eq!(r.height_index, 0);
}

#[test]
fn step_interface_is_rough() {
    // two columns three high, two columns one high
    let r = compute_roughness(columns(&[3, 3, 1, 1]), RES, 5, 4).unwrap();
    assert!(r.sigma_f > 0.0);
    assert!(r.sigma > 0.0);
    assert_eq!(r.height_index, 2);
}

#[test]
fn empty_and_full_grids_fail() {
    assert!(matches!(
        compute_roughness(Vec::<[f64; 2]>::new(), RES, 4, 4),
        Err(RoughnessError::NoCells)
    ));
    assert!(matches!(
        compute_roughness(columns(&[2, 2, 2]), RES, 2, 3),
        Err(RoughnessError::NoFront { occupied: 6 })
    ));
}

#[test]
fn moore_rule_counts_step_corners() {
    let cells = columns(&[3, 3, 1, 1]);
    let von = compute_roughness(cells.clone(), RES, 5, 4).unwrap();
    let moore = BiofilmRoughnessAnalyzer::new(
        AnalyzerConfig::new(RES, 5, 4).with_neighbourhood(Neighbourhood::Moore),
    )
    .unwrap()
    .analyze(cells)
    .unwrap();
    assert!(moore.p_f >= von.p_f);
}

#[test]
fn results_survive_a_store_round_trip() {
    let dir = unique_temp_dir("bf_roughness_store");
    let path = dir.join("roughness.xml");
    let r = compute_roughness(columns(&[3, 2, 1, 2]), RES, 5, 4).unwrap();

    let mut store = ResultStore::open(&path).unwrap();
    let set = store
        .get_or_create_result_set(&roughness_key("sim_a"), &ROUGHNESS_HEADER)
        .unwrap();
    set.append_record(r.to_row(120)).unwrap();
    store.write().unwrap();

    let store = ResultStore::open_read_only(&path).unwrap();
    let set = store.find_result_set(&roughness_key("sim_a")).unwrap();
    let (iterate, back) = RoughnessResult::from_record(&set.records()[0]).unwrap();
    assert_eq!(iterate, 120);
    assert_eq!(back, r);
    assert_eq!(cached_roughness(set, 120), Some(r));
    assert_eq!(cached_roughness(set, 121), None);
}

#[test]
fn forgetting_iterates_leaves_the_rest_cached() {
    let dir = unique_temp_dir("bf_roughness_forget");
    let r = compute_roughness(columns(&[3, 2, 1, 2]), RES, 5, 4).unwrap();

    let mut store = ResultStore::open(dir.join("roughness.xml")).unwrap();
    let set = store
        .get_or_create_result_set(&roughness_key("sim_a"), &ROUGHNESS_HEADER)
        .unwrap();
    for iterate in [10, 20, 30] {
        set.append_record(r.to_row(iterate)).unwrap();
    }

    assert_eq!(forget_roughness(set, &[20, 99]), 1);
    assert_eq!(cached_roughness(set, 20), None);
    assert_eq!(cached_roughness(set, 10), Some(r));
    assert_eq!(cached_roughness(set, 30), Some(r));
}

proptest! {
    #[test]
    fn flat_interface_is_smooth(n_j in 1usize..12, h in 1usize..8, extra in 1usize..4) {
        let r = compute_roughness(columns(&vec![h; n_j]), RES, h + extra, n_j).unwrap();
        prop_assert_eq!(r.sigma_f, 0.0);
        prop_assert_eq!(r.sigma, 0.0);
        prop_assert_eq!(r.x_f, h as f64);
        prop_assert_eq!(r.height_index, h - 1);
    }

    #[test]
    fn outputs_are_finite_and_bounded(heights in prop::collection::vec(0usize..10, 1..16)) {
        prop_assume!(heights.iter().any(|&h| h > 0));
        let n_i = 11;
        let r = compute_roughness(columns(&heights), RES, n_i, heights.len()).unwrap();
        for v in [r.sigma_f, r.sigma, r.x_f, r.p_f] {
            prop_assert!(v.is_finite());
            prop_assert!(v >= 0.0);
        }
        prop_assert!(r.x_f >= 1.0);
        prop_assert!(r.x_f <= (r.height_index + 1) as f64);
        prop_assert_eq!(r.height_index + 1, heights.iter().copied().max().unwrap_or(0));
    }

    #[test]
    fn lateral_shift_does_not_change_roughness(
        heights in prop::collection::vec(1usize..8, 2..12),
        shift in 0usize..12,
    ) {
        let mut shifted = heights.clone();
        shifted.rotate_left(shift % heights.len());
        let a = compute_roughness(columns(&heights), RES, 9, heights.len()).unwrap();
        let b = compute_roughness(columns(&shifted), RES, 9, heights.len()).unwrap();
        prop_assert_eq!(a.height_index, b.height_index);
        prop_assert!((a.sigma_f - b.sigma_f).abs() < 1e-9);
        prop_assert!((a.x_f - b.x_f).abs() < 1e-9);
        prop_assert!((a.p_f - b.p_f).abs() < 1e-9);
    }
}
