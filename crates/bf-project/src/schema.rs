//! Analysis configuration schema.

use std::path::PathBuf;

use bf_roughness::Neighbourhood;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub version: u32,
    pub name: String,
    /// Store file name, relative to each simulation directory.
    #[serde(default = "default_store_file")]
    pub store_file: String,
    #[serde(default)]
    pub roughness: RoughnessDef,
    /// Cell-location export; batch runs skip it when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<LocationsDef>,
    #[serde(default)]
    pub simulations: Vec<SimulationDef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoughnessDef {
    #[serde(default)]
    pub neighbourhood: Neighbourhood,
    #[serde(default)]
    pub iterates: IterateSelection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LocationsDef {
    /// Only iterates at or after this simulated time (hours) are exported.
    #[serde(default)]
    pub starting_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    pub id: String,
    pub path: PathBuf,
}

/// Which iterates of a simulation to analyse.
///
/// Written as `all`, `last`, or a list of iterate numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "IterateSelectionDef", into = "IterateSelectionDef")]
pub enum IterateSelection {
    #[default]
    All,
    Last,
    List(Vec<u64>),
}

impl IterateSelection {
    /// Narrow `available` (sorted ascending) to the selection. Listed
    /// iterates that are not available are dropped.
    pub fn select(&self, available: &[u64]) -> Vec<u64> {
        match self {
            IterateSelection::All => available.to_vec(),
            IterateSelection::Last => available.last().copied().into_iter().collect(),
            IterateSelection::List(wanted) => {
                let mut picked: Vec<u64> = wanted
                    .iter()
                    .copied()
                    .filter(|n| available.binary_search(n).is_ok())
                    .collect();
                picked.sort_unstable();
                picked.dedup();
                picked
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IterateSelectionDef {
    Keyword(String),
    List(Vec<u64>),
}

impl TryFrom<IterateSelectionDef> for IterateSelection {
    type Error = String;

    fn try_from(def: IterateSelectionDef) -> Result<Self, Self::Error> {
        match def {
            IterateSelectionDef::Keyword(k) if k.eq_ignore_ascii_case("all") => Ok(Self::All),
            IterateSelectionDef::Keyword(k) if k.eq_ignore_ascii_case("last") => Ok(Self::Last),
            IterateSelectionDef::Keyword(k) => Err(format!(
                "unknown iterate selection '{k}' (expected 'all', 'last' or a list)"
            )),
            IterateSelectionDef::List(list) => Ok(Self::List(list)),
        }
    }
}

impl From<IterateSelection> for IterateSelectionDef {
    fn from(sel: IterateSelection) -> Self {
        match sel {
            IterateSelection::All => Self::Keyword("all".to_string()),
            IterateSelection::Last => Self::Keyword("last".to_string()),
            IterateSelection::List(list) => Self::List(list),
        }
    }
}

fn default_store_file() -> String {
    "roughness.xml".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_narrows_available_iterates() {
        let available = [0, 10, 20, 30];
        assert_eq!(IterateSelection::All.select(&available), vec![0, 10, 20, 30]);
        assert_eq!(IterateSelection::Last.select(&available), vec![30]);
        assert_eq!(IterateSelection::Last.select(&[]), Vec::<u64>::new());
        assert_eq!(
            IterateSelection::List(vec![30, 5, 10, 10]).select(&available),
            vec![10, 30]
        );
    }

    #[test]
    fn selection_yaml_forms() {
        let all: IterateSelection = serde_yaml::from_str("all").unwrap();
        assert_eq!(all, IterateSelection::All);
        let last: IterateSelection = serde_yaml::from_str("LAST").unwrap();
        assert_eq!(last, IterateSelection::Last);
        let list: IterateSelection = serde_yaml::from_str("[1, 2]").unwrap();
        assert_eq!(list, IterateSelection::List(vec![1, 2]));
        assert!(serde_yaml::from_str::<IterateSelection>("first").is_err());

        assert_eq!(serde_yaml::to_string(&IterateSelection::Last).unwrap().trim(), "last");
    }
}
