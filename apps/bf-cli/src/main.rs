use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bf_app::{
    AnalysisOptions, AnalysisProgressEvent, AppError, AppResult, LOCATIONS_FILE, RoughnessRequest,
    RoughnessResponse, analysis_service, export_cell_locations, query,
};
use bf_core::{to_um, um};
use bf_project::IterateSelection;
use bf_results::ResultStore;
use bf_roughness::{Neighbourhood, RoughnessResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "biofront")]
#[command(about = "Biofilm front roughness analysis for iDynoMiCS output", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute (or load cached) roughness for a simulation directory
    Roughness {
        /// Simulation output directory (holding agent_State/ and env_State/)
        sim_dir: PathBuf,
        /// Only these iterates (repeatable)
        #[arg(long = "iterate", conflicts_with = "last")]
        iterates: Vec<u64>,
        /// Only the last iterate
        #[arg(long)]
        last: bool,
        /// Skip cached rows and recompute
        #[arg(long)]
        no_cache: bool,
        /// Also count diagonal neighbours when detecting the front
        #[arg(long)]
        moore: bool,
        /// Store file name inside the simulation directory
        #[arg(long, default_value = bf_app::DEFAULT_STORE_FILE)]
        store: String,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run every simulation listed in an analysis configuration
    Batch {
        /// Path to the analysis YAML file
        config_path: PathBuf,
    },
    /// Export cell locations to cell_locations.xml
    Locations {
        /// Simulation output directory
        sim_dir: PathBuf,
        /// Skip iterates earlier than this simulated time (hours)
        #[arg(long, default_value_t = 48.0)]
        starting_time: f64,
    },
    /// Summarise the result sets in a store file
    Show {
        /// Path to the results XML file
        store_path: PathBuf,
    },
    /// Roughness against biofilm height for one simulation
    Profile {
        /// Path to the results XML file
        store_path: PathBuf,
        /// Simulation ID the rows are keyed by
        simulation_id: String,
        /// Grid resolution in micrometres, to report heights physically
        #[arg(long)]
        resolution: Option<f64>,
        /// Print the profile as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Roughness {
            sim_dir,
            iterates,
            last,
            no_cache,
            moore,
            store,
            json,
        } => {
            let selection = if last {
                IterateSelection::Last
            } else if iterates.is_empty() {
                IterateSelection::All
            } else {
                IterateSelection::List(iterates)
            };
            let options = AnalysisOptions {
                use_cache: !no_cache,
                neighbourhood: if moore {
                    Neighbourhood::Moore
                } else {
                    Neighbourhood::VonNeumann
                },
                iterates: selection,
                store_file: store,
            };
            cmd_roughness(&sim_dir, options, json)
        }
        Commands::Batch { config_path } => cmd_batch(&config_path),
        Commands::Locations {
            sim_dir,
            starting_time,
        } => cmd_locations(&sim_dir, starting_time),
        Commands::Show { store_path } => cmd_show(&store_path),
        Commands::Profile {
            store_path,
            simulation_id,
            resolution,
            json,
        } => cmd_profile(&store_path, &simulation_id, resolution, json),
    }
}

#[derive(Serialize)]
struct RoughnessRow {
    iterate: u64,
    #[serde(flatten)]
    result: RoughnessResult,
}

fn cmd_roughness(sim_dir: &Path, options: AnalysisOptions, json: bool) -> AppResult<()> {
    let request = RoughnessRequest {
        simulation_path: sim_dir,
        simulation_id: None,
        options,
    };

    let mut last_emit = Instant::now();
    let response = analysis_service::ensure_roughness_with_progress(
        &request,
        Some(&mut |event| {
            if !json && last_emit.elapsed().as_millis() >= 100 {
                render_cli_progress(&event);
                last_emit = Instant::now();
            }
        }),
    )?;
    if !json {
        clear_progress_line();
    }

    if json {
        let rows: Vec<RoughnessRow> = response
            .results
            .iter()
            .map(|&(iterate, result)| RoughnessRow { iterate, result })
            .collect();
        print_json(&rows)?;
    } else {
        print_roughness(&response);
    }
    Ok(())
}

fn print_roughness(response: &RoughnessResponse) {
    println!(
        "✓ {}: {} computed, {} from cache ({})",
        response.simulation_id,
        response.computed,
        response.loaded_from_cache,
        response.store_path.display()
    );
    println!(
        "  {:>8}  {:>10}  {:>10}  {:>8}  {:>8}  {:>6}",
        "iterate", "Sigmaf", "Sigma", "Xf", "Pf", "height"
    );
    for (iterate, r) in &response.results {
        println!(
            "  {:>8}  {:>10.4}  {:>10.4}  {:>8.3}  {:>8.3}  {:>6}",
            iterate, r.sigma_f, r.sigma, r.x_f, r.p_f, r.height_index
        );
    }
    for failure in &response.failures {
        println!("  ✗ iterate {}: {}", failure.iterate, failure.reason);
    }
}

fn cmd_batch(config_path: &Path) -> AppResult<()> {
    let config = bf_app::load_config(config_path)?;
    println!(
        "Running batch '{}' ({} simulations)",
        config.name,
        config.simulations.len()
    );

    let outcome = analysis_service::run_batch(&config);
    for sim in &outcome.simulations {
        match &sim.roughness {
            Ok(r) => println!(
                "  ✓ {}: {} computed, {} cached, {} failed iterates",
                sim.id,
                r.computed,
                r.loaded_from_cache,
                r.failures.len()
            ),
            Err(err) => println!("  ✗ {}: {}", sim.id, err),
        }
        match &sim.locations {
            Some(Ok(export)) => println!(
                "    locations: {} iterates, {} cells",
                export.exported.len(),
                export.cells_written
            ),
            Some(Err(err)) => println!("    ✗ locations: {}", err),
            None => {}
        }
    }

    let failed = outcome.failed().count();
    tracing::info!(
        batch = %config.name,
        total = outcome.simulations.len(),
        failed,
        "batch finished"
    );
    if failed > 0 {
        return Err(AppError::BatchFailed {
            failed,
            total: outcome.simulations.len(),
        });
    }
    Ok(())
}

fn cmd_locations(sim_dir: &Path, starting_time: f64) -> AppResult<()> {
    let export = export_cell_locations(sim_dir, starting_time)?;
    println!(
        "✓ {}: {} cells from {} iterates ({} already present, {} before t={})",
        LOCATIONS_FILE,
        export.cells_written,
        export.exported.len(),
        export.already_present.len(),
        export.too_early.len(),
        starting_time
    );
    Ok(())
}

fn cmd_show(store_path: &Path) -> AppResult<()> {
    let store = ResultStore::open_read_only(store_path)?;
    if store.recovered_from_malformed() {
        println!("! {} could not be parsed; showing it as empty", store_path.display());
    }
    let stamp = store.stamp();
    println!(
        "{} (iterate {}, time {} {})",
        store_path.display(),
        stamp.iterate,
        stamp.time,
        stamp.unit
    );

    if store.sets().is_empty() {
        println!("  No result sets");
    }
    for set in store.sets() {
        let key = set
            .key()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  [{}] {} records", key, set.len());
        println!("    columns: {}", set.header().join(","));
    }
    Ok(())
}

fn cmd_profile(
    store_path: &Path,
    simulation_id: &str,
    resolution: Option<f64>,
    json: bool,
) -> AppResult<()> {
    let series = query::roughness_series(store_path, simulation_id)?;
    let bins = query::roughness_by_height(&series);

    if json {
        return print_json(&bins);
    }

    println!("Roughness by height for {simulation_id} ({} snapshots)", series.len());
    println!(
        "  {:>6}  {:>10}  {:>10}  {:>10}  {:>5}",
        "height", "um", "mean", "std", "n"
    );
    for bin in &bins {
        let physical = match resolution {
            Some(res) => format!("{:.1}", to_um(um(res) * bin.height_index as f64)),
            None => "-".to_string(),
        };
        println!(
            "  {:>6}  {:>10}  {:>10.4}  {:>10.4}  {:>5}",
            bin.height_index, physical, bin.mean_sigma_f, bin.std_sigma_f, bin.count
        );
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> AppResult<()> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| AppError::Serialization(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &AnalysisProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  {}",
        spinner[spin_idx], event.simulation_id, event.stage.label()
    );
    if event.total > 0 {
        line.push_str(&format!(
            "  {}/{} ({:.0}%)",
            event.done,
            event.total,
            event.fraction_complete() * 100.0
        ));
    }
    if let Some(iterate) = event.iterate {
        line.push_str(&format!("  iterate={iterate}"));
    }
    line.push_str(&format!("  elapsed={:.1}s", event.elapsed_wall_s));
    print!("{line}");
    let _ = io::stdout().flush();
}
