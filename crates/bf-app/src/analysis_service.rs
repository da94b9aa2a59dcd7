//! Roughness analysis and caching service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use bf_idyno::{OutputHeader, SimulationDirectory};
use bf_project::{AnalysisConfig, IterateSelection};
use bf_results::{ResultStore, SimulationStamp};
use bf_roughness::{
    AnalyzerConfig, BiofilmRoughnessAnalyzer, Neighbourhood, ROUGHNESS_HEADER, RoughnessResult,
    cached_roughness, forget_roughness, roughness_key,
};

use crate::error::{AppError, AppResult};
use crate::locations_service::{self, LocationsExport};
use crate::progress::{AnalysisProgressEvent, AnalysisStage};

pub const DEFAULT_STORE_FILE: &str = "roughness.xml";

/// Options for roughness analysis.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub use_cache: bool,
    pub neighbourhood: Neighbourhood,
    pub iterates: IterateSelection,
    /// Store file, relative to the simulation directory.
    pub store_file: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            neighbourhood: Neighbourhood::default(),
            iterates: IterateSelection::All,
            store_file: DEFAULT_STORE_FILE.to_string(),
        }
    }
}

/// Request to analyse one simulation directory.
pub struct RoughnessRequest<'a> {
    pub simulation_path: &'a Path,
    /// Key for the stored rows; defaults to the directory name.
    pub simulation_id: Option<&'a str>,
    pub options: AnalysisOptions,
}

/// An iterate that could not be analysed.
#[derive(Debug, Clone)]
pub struct IterateFailure {
    pub iterate: u64,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RoughnessResponse {
    pub simulation_id: String,
    pub store_path: PathBuf,
    /// Results for every selected iterate that has one, sorted by iterate.
    pub results: Vec<(u64, RoughnessResult)>,
    pub computed: usize,
    pub loaded_from_cache: usize,
    pub failures: Vec<IterateFailure>,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(AnalysisProgressEvent)>,
    event: impl FnOnce() -> AnalysisProgressEvent,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(event());
    }
}

/// Analyse (or load) roughness for a simulation.
pub fn ensure_roughness(request: &RoughnessRequest) -> AppResult<RoughnessResponse> {
    ensure_roughness_with_progress(request, None)
}

/// Analyse (or load) roughness and stream progress events.
///
/// Iterates whose rows are already stored are not recomputed unless
/// `use_cache` is off. A failing iterate is reported in the response and
/// does not stop the others; the store is written once at the end.
pub fn ensure_roughness_with_progress(
    request: &RoughnessRequest,
    mut progress_cb: Option<&mut dyn FnMut(AnalysisProgressEvent)>,
) -> AppResult<RoughnessResponse> {
    let started = Instant::now();
    let options = &request.options;

    let sim = SimulationDirectory::open(request.simulation_path)?;
    let simulation_id = request
        .simulation_id
        .map(str::to_string)
        .unwrap_or_else(|| sim.simulation_id());

    emit_progress(&mut progress_cb, || {
        AnalysisProgressEvent::stage(
            &simulation_id,
            AnalysisStage::OpeningSimulation,
            started.elapsed().as_secs_f64(),
            Some(format!("Opening {}", sim.path().display())),
        )
    });

    let available = sim.iterate_numbers()?;
    let selected = options.iterates.select(&available);
    if selected.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "No iterates of {simulation_id} match the selection ({} available)",
            available.len()
        )));
    }

    let grid = sim.domain_dimensions()?;
    let analyzer = BiofilmRoughnessAnalyzer::new(
        AnalyzerConfig::new(grid.resolution, grid.n_i, grid.n_j)
            .with_neighbourhood(options.neighbourhood),
    )?;

    emit_progress(&mut progress_cb, || {
        AnalysisProgressEvent::stage(
            &simulation_id,
            AnalysisStage::LoadingStore,
            started.elapsed().as_secs_f64(),
            None,
        )
    });

    let store_path = sim.path().join(&options.store_file);
    let mut store = ResultStore::open(&store_path)?;
    let key = roughness_key(&simulation_id);

    let mut results = Vec::with_capacity(selected.len());
    let mut failures = Vec::new();
    let mut loaded_from_cache = 0;
    let mut computed = 0;
    let mut newest: Option<OutputHeader> = None;

    let set = store.get_or_create_result_set(&key, &ROUGHNESS_HEADER)?;
    let mut dirty = false;
    if !options.use_cache {
        let dropped = forget_roughness(set, &selected);
        if dropped > 0 {
            tracing::debug!(simulation = %simulation_id, dropped, "dropped cached roughness");
            dirty = true;
        }
    }
    let total = selected.len();
    for (done, &iterate) in selected.iter().enumerate() {
        if let Some(cached) = cached_roughness(set, iterate) {
            tracing::debug!(simulation = %simulation_id, iterate, "roughness cache hit");
            emit_progress(&mut progress_cb, || AnalysisProgressEvent {
                iterate: Some(iterate),
                done: done + 1,
                total,
                ..AnalysisProgressEvent::stage(
                    &simulation_id,
                    AnalysisStage::CheckingCache,
                    started.elapsed().as_secs_f64(),
                    None,
                )
            });
            results.push((iterate, cached));
            loaded_from_cache += 1;
            continue;
        }

        emit_progress(&mut progress_cb, || AnalysisProgressEvent {
            iterate: Some(iterate),
            done,
            total,
            ..AnalysisProgressEvent::stage(
                &simulation_id,
                AnalysisStage::Analyzing,
                started.elapsed().as_secs_f64(),
                None,
            )
        });

        match analyze_iterate(&sim, &analyzer, iterate) {
            Ok((result, header)) => {
                set.append_record(result.to_row(iterate))?;
                results.push((iterate, result));
                computed += 1;
                dirty = true;
                newest = Some(header);
            }
            Err(err) => {
                tracing::warn!(simulation = %simulation_id, iterate, error = %err, "iterate skipped");
                failures.push(IterateFailure {
                    iterate,
                    reason: err.to_string(),
                });
            }
        }
    }

    if let Some(header) = newest.filter(|h| h.iterate >= store.stamp().iterate) {
        store.set_stamp(SimulationStamp {
            iterate: header.iterate,
            time: header.time,
            unit: header.unit,
        });
    }

    if dirty {
        emit_progress(&mut progress_cb, || {
            AnalysisProgressEvent::stage(
                &simulation_id,
                AnalysisStage::SavingResults,
                started.elapsed().as_secs_f64(),
                Some(format!("Writing {}", store_path.display())),
            )
        });
        store.write()?;
    }

    tracing::info!(
        simulation = %simulation_id,
        computed,
        cached = loaded_from_cache,
        failed = failures.len(),
        "roughness analysis finished"
    );
    emit_progress(&mut progress_cb, || AnalysisProgressEvent {
        done: total,
        total,
        ..AnalysisProgressEvent::stage(
            &simulation_id,
            AnalysisStage::Completed,
            started.elapsed().as_secs_f64(),
            None,
        )
    });

    results.sort_by_key(|(iterate, _)| *iterate);
    Ok(RoughnessResponse {
        simulation_id,
        store_path,
        results,
        computed,
        loaded_from_cache,
        failures,
    })
}

fn analyze_iterate(
    sim: &SimulationDirectory,
    analyzer: &BiofilmRoughnessAnalyzer,
    iterate: u64,
) -> AppResult<(RoughnessResult, OutputHeader)> {
    let state = sim.agent_state(iterate)?;
    let locations = state
        .all_cells()
        .map(|cell| cell.location().map(|[x, y, _]| [x, y]))
        .collect::<Result<Vec<_>, _>>()?;
    let result = analyzer.analyze(locations)?;
    Ok((result, state.header))
}

/// Outcome of one configured simulation in a batch.
#[derive(Debug)]
pub struct SimulationOutcome {
    pub id: String,
    pub roughness: AppResult<RoughnessResponse>,
    pub locations: Option<AppResult<LocationsExport>>,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub simulations: Vec<SimulationOutcome>,
}

impl BatchOutcome {
    pub fn failed(&self) -> impl Iterator<Item = &SimulationOutcome> {
        self.simulations.iter().filter(|s| {
            s.roughness.is_err() || s.locations.as_ref().is_some_and(|l| l.is_err())
        })
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Run every configured simulation. One simulation failing does not stop
/// the others.
pub fn run_batch(config: &AnalysisConfig) -> BatchOutcome {
    run_batch_with_progress(config, None)
}

pub fn run_batch_with_progress(
    config: &AnalysisConfig,
    mut progress_cb: Option<&mut dyn FnMut(AnalysisProgressEvent)>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for sim in &config.simulations {
        let request = RoughnessRequest {
            simulation_path: &sim.path,
            simulation_id: Some(&sim.id),
            options: AnalysisOptions {
                use_cache: true,
                neighbourhood: config.roughness.neighbourhood,
                iterates: config.roughness.iterates.clone(),
                store_file: config.store_file.clone(),
            },
        };

        let roughness = ensure_roughness_with_progress(
            &request,
            progress_cb
                .as_mut()
                .map(|cb| &mut **cb as &mut dyn FnMut(AnalysisProgressEvent)),
        );
        if let Err(err) = &roughness {
            tracing::error!(simulation = %sim.id, error = %err, "roughness analysis failed");
        }

        let locations = config.locations.as_ref().map(|loc| {
            let export = locations_service::export_cell_locations(&sim.path, loc.starting_time);
            if let Err(err) = &export {
                tracing::error!(simulation = %sim.id, error = %err, "cell location export failed");
            }
            export
        });

        outcome.simulations.push(SimulationOutcome {
            id: sim.id.clone(),
            roughness,
            locations,
        });
    }
    outcome
}
