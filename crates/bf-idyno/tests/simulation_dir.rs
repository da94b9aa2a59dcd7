use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use bf_idyno::{IdynoError, SimulationDirectory};

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

fn write_agent_state(sim: &Path, iterate: u64, time: f64, cells: &str) {
    let dir = sim.join("agent_State");
    fs::create_dir_all(&dir).unwrap();
    let xml = format!(
        r#"<idynomics><simulation iterate="{iterate}" time="{time:?}" unit="hour">
<grid resolution="4.0" nI="8" nJ="8" nK="1"/>
<species name="OldieA" header="family,locationX,locationY">{cells}</species>
</simulation></idynomics>"#
    );
    fs::write(dir.join(format!("agent_State({iterate}).xml")), xml).unwrap();
}

fn write_env_state(sim: &Path, iterate: u64) {
    let dir = sim.join("env_State");
    fs::create_dir_all(&dir).unwrap();
    let values: String = (0..4).map(|v| format!("{v}.0;\n")).collect();
    let xml = format!(
        r#"<idynomics><simulation iterate="{iterate}" time="0.0" unit="hour">
<solute name="glucose" unit="g.L-1" resolution="4.0" nI="2" nJ="2" nK="1">{values}</solute>
</simulation></idynomics>"#
    );
    fs::write(dir.join(format!("env_State({iterate}).xml")), xml).unwrap();
}

#[test]
fn lists_iterates_in_numeric_order() {
    let sim = unique_temp_dir("bf_idyno_iterates");
    write_agent_state(&sim, 10, 2.0, "0,1.0,1.0;");
    write_agent_state(&sim, 2, 0.5, "0,1.0,1.0;");
    write_agent_state(&sim, 100, 20.0, "0,1.0,1.0;");
    fs::write(sim.join("agent_State").join("notes.txt"), "ignored").unwrap();

    let dir = SimulationDirectory::open(&sim).unwrap();
    assert_eq!(dir.iterate_numbers().unwrap(), vec![2, 10, 100]);
    assert_eq!(dir.last_iterate_number().unwrap(), 100);

    let state = dir.agent_state(10).unwrap();
    assert_eq!(state.header.time, 2.0);
    assert_eq!(state.all_cells().count(), 1);
}

#[test]
fn domain_dimensions_come_from_the_first_solute() {
    let sim = unique_temp_dir("bf_idyno_domain");
    write_agent_state(&sim, 0, 0.0, "");
    write_env_state(&sim, 0);

    let dir = SimulationDirectory::open(&sim).unwrap();
    let grid = dir.domain_dimensions().unwrap();
    assert_eq!((grid.n_i, grid.n_j, grid.n_k), (2, 2, 1));
    assert_eq!(grid.resolution, 4.0);
}

#[test]
fn simulation_id_is_the_directory_name() {
    let sim = unique_temp_dir("bf_idyno_id");
    write_agent_state(&sim, 0, 0.0, "");
    let dir = SimulationDirectory::open(&sim).unwrap();
    assert_eq!(
        dir.simulation_id(),
        sim.file_name().unwrap().to_string_lossy()
    );
}

#[test]
fn zipped_output_asks_for_extraction() {
    let sim = unique_temp_dir("bf_idyno_zip");
    fs::write(sim.join("agent_State.zip"), b"PK").unwrap();
    assert!(matches!(
        SimulationDirectory::open(&sim),
        Err(IdynoError::Archived { .. })
    ));
}

#[test]
fn missing_directory_is_reported() {
    let sim = unique_temp_dir("bf_idyno_missing").join("nope");
    assert!(matches!(
        SimulationDirectory::open(&sim),
        Err(IdynoError::MissingDirectory { .. })
    ));
}

#[test]
fn empty_agent_state_has_no_iterates() {
    let sim = unique_temp_dir("bf_idyno_empty");
    fs::create_dir_all(sim.join("agent_State")).unwrap();
    let dir = SimulationDirectory::open(&sim).unwrap();
    assert!(matches!(
        dir.last_iterate_number(),
        Err(IdynoError::NoIterates { .. })
    ));
}
