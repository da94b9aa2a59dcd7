//! bf-idyno: readers for iDynoMiCS simulation output.
//!
//! A simulation directory holds one `agent_State(N).xml` and one
//! `env_State(N).xml` per output iterate. Species and solute data inside
//! those files use the same CSV-in-XML convention as the results files.

pub mod agent;
pub mod env;
pub mod simulation;
mod xml;

pub use agent::{AgentState, Cell, SpeciesOutput};
pub use env::{ConcentrationGrid, EnvState, SoluteOutput, Thickness};
pub use simulation::SimulationDirectory;
pub use xml::{GridSpec, OutputHeader};

pub type IdynoResult<T> = Result<T, IdynoError>;

#[derive(thiserror::Error, Debug)]
pub enum IdynoError {
    #[error("Failed to read {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("XML error in {path}: {message}")]
    Xml { path: String, message: String },

    #[error("Missing <{element}> in {path}")]
    MissingElement { path: String, element: String },

    #[error("Missing attribute `{attribute}` on <{element}> in {path}")]
    MissingAttribute {
        path: String,
        element: String,
        attribute: String,
    },

    #[error("Invalid number for {what}: {value:?} ({path})")]
    InvalidNumber {
        path: String,
        what: String,
        value: String,
    },

    #[error("Record {row} of {owner} has {found} fields, header has {expected} ({path})")]
    FieldCount {
        path: String,
        owner: String,
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Cell of species `{species}` has no attribute `{attribute}`")]
    MissingCellAttribute { species: String, attribute: String },

    #[error("Species `{name}` not found in {path}")]
    UnknownSpecies { path: String, name: String },

    #[error("Solute `{name}` not found in {path}")]
    UnknownSolute { path: String, name: String },

    #[error("Solute `{name}` has {found} values, grid expects {expected}")]
    GridShape {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Directory not found: {path}")]
    MissingDirectory { path: String },

    #[error("{path} is only available as a zip archive; extract it first")]
    Archived { path: String },

    #[error("No output iterates found in {path}")]
    NoIterates { path: String },
}
