//! Integration tests for the analysis, export and query services.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bf_app::{
    AnalysisOptions, AnalysisProgressEvent, AnalysisStage, RoughnessRequest, ensure_roughness,
    ensure_roughness_with_progress, export_cell_locations, roughness_series, run_batch,
};
use bf_project::{AnalysisConfig, IterateSelection, LocationsDef, RoughnessDef, SimulationDef};

const RES: f64 = 4.0;
const N: usize = 4;

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

/// Cells filling each column `j` from the substratum up to `heights[j]`.
fn cell_rows(heights: &[usize]) -> String {
    let mut rows = String::new();
    for (j, &h) in heights.iter().enumerate() {
        for i in 0..h {
            let x = (i as f64 + 0.5) * RES;
            let y = (j as f64 + 0.5) * RES;
            rows.push_str(&format!("0,{x:?},{y:?};\n"));
        }
    }
    rows
}

fn write_iterate(sim: &Path, iterate: u64, time: f64, heights: &[usize]) {
    let agent_dir = sim.join("agent_State");
    fs::create_dir_all(&agent_dir).unwrap();
    let xml = format!(
        r#"<idynomics><simulation iterate="{iterate}" time="{time:?}" unit="hour">
<grid resolution="{RES:?}" nI="{N}" nJ="{N}" nK="1"/>
<species name="OldieA" header="family,locationX,locationY">
{cells}</species>
</simulation></idynomics>"#,
        cells = cell_rows(heights)
    );
    fs::write(agent_dir.join(format!("agent_State({iterate}).xml")), xml).unwrap();

    let env_dir = sim.join("env_State");
    fs::create_dir_all(&env_dir).unwrap();
    let values: String = (0..N * N).map(|_| "1.0;\n").collect();
    let xml = format!(
        r#"<idynomics><simulation iterate="{iterate}" time="{time:?}" unit="hour">
<solute name="glucose" unit="g.L-1" resolution="{RES:?}" nI="{N}" nJ="{N}" nK="1">{values}</solute>
</simulation></idynomics>"#
    );
    fs::write(env_dir.join(format!("env_State({iterate}).xml")), xml).unwrap();
}

/// Iterates 0 and 1 have a front; iterate 2 fills the whole domain.
fn simulation(prefix: &str) -> PathBuf {
    let sim = unique_temp_dir(prefix).join("biofilm_run_1");
    write_iterate(&sim, 0, 0.0, &[1, 0, 0, 0]);
    write_iterate(&sim, 1, 24.0, &[3, 1, 2, 1]);
    write_iterate(&sim, 2, 48.0, &[N, N, N, N]);
    sim
}

fn request(sim: &Path, options: AnalysisOptions) -> RoughnessRequest<'_> {
    RoughnessRequest {
        simulation_path: sim,
        simulation_id: None,
        options,
    }
}

#[test]
fn first_run_computes_and_second_run_reuses_the_store() {
    let sim = simulation("bf_app_cache");

    let first = ensure_roughness(&request(&sim, AnalysisOptions::default())).unwrap();
    assert_eq!(first.simulation_id, "biofilm_run_1");
    assert_eq!(first.computed, 2);
    assert_eq!(first.loaded_from_cache, 0);
    assert_eq!(first.failures.len(), 1);
    assert_eq!(first.failures[0].iterate, 2);
    assert!(first.store_path.exists());

    let (it0, r0) = first.results[0];
    assert_eq!(it0, 0);
    assert_eq!(r0.x_f, 1.0);
    assert_eq!(r0.p_f, 0.25);
    assert_eq!(r0.height_index, 0);

    let second = ensure_roughness(&request(&sim, AnalysisOptions::default())).unwrap();
    assert_eq!(second.computed, 0);
    assert_eq!(second.loaded_from_cache, 2);
    assert_eq!(second.results, first.results);

    let series = roughness_series(&first.store_path, "biofilm_run_1").unwrap();
    assert_eq!(series, first.results);
}

#[test]
fn disabling_the_cache_recomputes() {
    let sim = simulation("bf_app_nocache");
    ensure_roughness(&request(&sim, AnalysisOptions::default())).unwrap();

    let options = AnalysisOptions {
        use_cache: false,
        ..AnalysisOptions::default()
    };
    let again = ensure_roughness(&request(&sim, options)).unwrap();
    assert_eq!(again.computed, 2);
    assert_eq!(again.loaded_from_cache, 0);

    // the dropped set is replaced, not duplicated
    let series = roughness_series(&again.store_path, "biofilm_run_1").unwrap();
    assert_eq!(series.len(), 2);
}

#[test]
fn recomputing_a_selection_keeps_other_cached_iterates() {
    let sim = simulation("bf_app_partial_nocache");
    let first = ensure_roughness(&request(&sim, AnalysisOptions::default())).unwrap();

    let options = AnalysisOptions {
        use_cache: false,
        iterates: IterateSelection::List(vec![1]),
        ..AnalysisOptions::default()
    };
    let again = ensure_roughness(&request(&sim, options)).unwrap();
    assert_eq!(again.computed, 1);
    assert_eq!(again.loaded_from_cache, 0);

    let series = roughness_series(&again.store_path, "biofilm_run_1").unwrap();
    assert_eq!(series.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(series, first.results);
}

#[test]
fn iterate_selection_limits_the_work() {
    let sim = simulation("bf_app_selection");
    let options = AnalysisOptions {
        iterates: IterateSelection::List(vec![1, 99]),
        ..AnalysisOptions::default()
    };
    let response = ensure_roughness(&request(&sim, options)).unwrap();
    assert_eq!(response.computed, 1);
    assert_eq!(response.results[0].0, 1);
    assert!(response.results[0].1.sigma_f > 0.0);

    let options = AnalysisOptions {
        iterates: IterateSelection::Last,
        ..AnalysisOptions::default()
    };
    let response = ensure_roughness(&request(&sim, options)).unwrap();
    assert!(response.results.is_empty());
    assert_eq!(response.failures.len(), 1);
}

#[test]
fn progress_reports_stages() {
    let sim = simulation("bf_app_progress");
    let mut events: Vec<AnalysisProgressEvent> = Vec::new();
    ensure_roughness_with_progress(
        &request(&sim, AnalysisOptions::default()),
        Some(&mut |e| events.push(e)),
    )
    .unwrap();

    assert!(events.iter().any(|e| e.stage == AnalysisStage::Analyzing));
    assert!(events.iter().any(|e| e.stage == AnalysisStage::SavingResults));
    let last = events.last().unwrap();
    assert_eq!(last.stage, AnalysisStage::Completed);
    assert_eq!(last.fraction_complete(), 1.0);

    let mut events: Vec<AnalysisProgressEvent> = Vec::new();
    ensure_roughness_with_progress(
        &request(&sim, AnalysisOptions::default()),
        Some(&mut |e| events.push(e)),
    )
    .unwrap();
    assert!(events.iter().any(|e| e.stage == AnalysisStage::CheckingCache));
}

#[test]
fn missing_results_are_reported() {
    let sim = simulation("bf_app_missing_results");
    let response = ensure_roughness(&request(&sim, AnalysisOptions::default())).unwrap();
    assert!(roughness_series(&response.store_path, "other_run").is_err());
}

#[test]
fn locations_export_respects_starting_time_and_is_idempotent() {
    let sim = simulation("bf_app_locations");

    let export = export_cell_locations(&sim, 24.0).unwrap();
    assert_eq!(export.exported, vec![1, 2]);
    assert_eq!(export.too_early, vec![0]);
    assert_eq!(export.cells_written, 7 + N * N);

    let again = export_cell_locations(&sim, 24.0).unwrap();
    assert!(again.exported.is_empty());
    assert_eq!(again.already_present, vec![1, 2]);

    let text = fs::read_to_string(&export.store_path).unwrap();
    assert!(text.contains(r#"name="locations""#));
    assert!(text.contains(r#"header="iterate,X,Y""#));
}

#[test]
fn batch_isolates_failing_simulations() {
    let good = simulation("bf_app_batch");
    let config = AnalysisConfig {
        version: 1,
        name: "batch".to_string(),
        store_file: "roughness.xml".to_string(),
        roughness: RoughnessDef::default(),
        locations: Some(LocationsDef { starting_time: 0.0 }),
        simulations: vec![
            SimulationDef {
                id: "missing".to_string(),
                path: good.with_file_name("does_not_exist"),
            },
            SimulationDef {
                id: "good".to_string(),
                path: good.clone(),
            },
        ],
    };

    let outcome = run_batch(&config);
    assert_eq!(outcome.simulations.len(), 2);
    assert!(!outcome.all_succeeded());
    assert_eq!(
        outcome.failed().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["missing"]
    );

    let good_outcome = &outcome.simulations[1];
    let roughness = good_outcome.roughness.as_ref().unwrap();
    assert_eq!(roughness.simulation_id, "good");
    assert_eq!(roughness.computed, 2);
    assert!(good_outcome.locations.as_ref().unwrap().is_ok());

    let series = roughness_series(&good.join("roughness.xml"), "good").unwrap();
    assert_eq!(series.len(), 2);
}
