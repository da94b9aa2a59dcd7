//! Simulation result directories.

use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::AgentState;
use crate::env::EnvState;
use crate::xml::GridSpec;
use crate::{IdynoError, IdynoResult};

const AGENT_STATE: &str = "agent_State";
const ENV_STATE: &str = "env_State";

/// One simulator output directory with `agent_State/` and `env_State/`
/// subdirectories of per-iterate XML files.
#[derive(Debug, Clone)]
pub struct SimulationDirectory {
    path: PathBuf,
    agent_state_dir: PathBuf,
    env_state_dir: PathBuf,
}

impl SimulationDirectory {
    pub fn open(path: impl AsRef<Path>) -> IdynoResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(IdynoError::MissingDirectory {
                path: path.display().to_string(),
            });
        }
        let agent_state_dir = state_dir(&path, AGENT_STATE)?;
        Ok(Self {
            env_state_dir: path.join(ENV_STATE),
            agent_state_dir,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The directory name, used to key cached statistics.
    pub fn simulation_id(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Sorted iterate numbers of the available agent states.
    pub fn iterate_numbers(&self) -> IdynoResult<Vec<u64>> {
        let entries = fs::read_dir(&self.agent_state_dir).map_err(|source| IdynoError::Read {
            path: self.agent_state_dir.display().to_string(),
            source,
        })?;

        let mut numbers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| IdynoError::Read {
                path: self.agent_state_dir.display().to_string(),
                source,
            })?;
            let name = entry.file_name();
            match parse_iterate(&name.to_string_lossy(), AGENT_STATE) {
                Some(n) => numbers.push(n),
                None => tracing::trace!(file = ?name, "skipping non-state file"),
            }
        }
        numbers.sort_unstable();
        Ok(numbers)
    }

    pub fn last_iterate_number(&self) -> IdynoResult<u64> {
        self.iterate_numbers()?
            .last()
            .copied()
            .ok_or_else(|| IdynoError::NoIterates {
                path: self.agent_state_dir.display().to_string(),
            })
    }

    pub fn agent_state_path(&self, iterate: u64) -> PathBuf {
        self.agent_state_dir
            .join(format!("{AGENT_STATE}({iterate}).xml"))
    }

    pub fn env_state_path(&self, iterate: u64) -> PathBuf {
        self.env_state_dir.join(format!("{ENV_STATE}({iterate}).xml"))
    }

    pub fn agent_state(&self, iterate: u64) -> IdynoResult<AgentState> {
        AgentState::from_path(&self.agent_state_path(iterate))
    }

    pub fn env_state(&self, iterate: u64) -> IdynoResult<EnvState> {
        if !self.env_state_dir.is_dir() {
            state_dir(&self.path, ENV_STATE)?;
        }
        EnvState::from_path(&self.env_state_path(iterate))
    }

    /// Grid of the first solute in the earliest environment state.
    pub fn domain_dimensions(&self) -> IdynoResult<GridSpec> {
        let first = self
            .iterate_numbers()?
            .first()
            .copied()
            .ok_or_else(|| IdynoError::NoIterates {
                path: self.agent_state_dir.display().to_string(),
            })?;
        let env = self.env_state(first)?;
        env.solutes
            .first()
            .map(|s| s.grid)
            .ok_or_else(|| IdynoError::UnknownSolute {
                path: env.origin.clone(),
                name: "<any>".to_string(),
            })
    }
}

fn state_dir(sim: &Path, name: &str) -> IdynoResult<PathBuf> {
    let dir = sim.join(name);
    if dir.is_dir() {
        return Ok(dir);
    }
    let zip = sim.join(format!("{name}.zip"));
    if zip.is_file() {
        return Err(IdynoError::Archived {
            path: zip.display().to_string(),
        });
    }
    Err(IdynoError::MissingDirectory {
        path: dir.display().to_string(),
    })
}

/// `agent_State(42).xml` -> 42
fn parse_iterate(file_name: &str, prefix: &str) -> Option<u64> {
    file_name
        .strip_prefix(prefix)?
        .strip_prefix('(')?
        .strip_suffix(").xml")?
        .parse()
        .ok()
}
