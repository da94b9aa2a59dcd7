//! Cell-location export.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bf_core::{Value, ensure_finite};
use bf_idyno::SimulationDirectory;
use bf_results::{KeyAttributes, ResultStore};

use crate::error::{AppError, AppResult};

pub const LOCATIONS_FILE: &str = "cell_locations.xml";
pub const LOCATIONS_SET_NAME: &str = "locations";
pub const LOCATIONS_HEADER: [&str; 3] = ["iterate", "X", "Y"];

#[derive(Debug, Clone)]
pub struct LocationsExport {
    pub store_path: PathBuf,
    /// Iterates whose cells were appended by this call.
    pub exported: Vec<u64>,
    /// Iterates already present in the store.
    pub already_present: Vec<u64>,
    /// Iterates before the starting time.
    pub too_early: Vec<u64>,
    pub cells_written: usize,
}

/// Append `iterate,X,Y` rows for every cell of every iterate whose time is
/// at least `starting_time` to `<sim>/cell_locations.xml`. Iterates that
/// are already in the file are left alone.
pub fn export_cell_locations(sim_path: &Path, starting_time: f64) -> AppResult<LocationsExport> {
    ensure_finite(starting_time, "starting time")
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let sim = SimulationDirectory::open(sim_path)?;
    let store_path = sim.path().join(LOCATIONS_FILE);
    let mut store = ResultStore::open(&store_path)?;
    let set = store.get_or_create_result_set(
        &KeyAttributes::named(LOCATIONS_SET_NAME),
        &LOCATIONS_HEADER,
    )?;

    let present: BTreeSet<u64> = set
        .column("iterate")?
        .into_iter()
        .filter_map(|v| v.as_i64())
        .filter_map(|v| u64::try_from(v).ok())
        .collect();

    let mut export = LocationsExport {
        store_path: store_path.clone(),
        exported: Vec::new(),
        already_present: Vec::new(),
        too_early: Vec::new(),
        cells_written: 0,
    };

    for iterate in sim.iterate_numbers()? {
        if present.contains(&iterate) {
            export.already_present.push(iterate);
            continue;
        }
        let state = sim.agent_state(iterate)?;
        if state.header.time < starting_time {
            export.too_early.push(iterate);
            continue;
        }
        for cell in state.all_cells() {
            let [x, y, _] = cell.location()?;
            set.append_record([
                ("iterate", Value::from(iterate)),
                ("X", Value::from(x)),
                ("Y", Value::from(y)),
            ])?;
            export.cells_written += 1;
        }
        export.exported.push(iterate);
    }

    if !export.exported.is_empty() {
        store.write()?;
    }
    tracing::info!(
        path = %store_path.display(),
        exported = export.exported.len(),
        cells = export.cells_written,
        "cell locations exported"
    );
    Ok(export)
}
