//! `env_State` documents: solute concentration grids and biofilm thickness.

use bf_results::csv::split_rows;
use std::path::Path;

use crate::xml::{self, GridSpec, OutputHeader};
use crate::{IdynoError, IdynoResult};

/// Biofilm thickness summary written by biofilm runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thickness {
    pub mean: f64,
    pub stddev: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SoluteOutput {
    pub name: String,
    pub unit: String,
    pub grid: GridSpec,
    pub values: Vec<f64>,
}

/// Dense concentration array indexed `(i, j, k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcentrationGrid {
    pub shape: [usize; 3],
    pub values: Vec<f64>,
}

impl ConcentrationGrid {
    pub fn get(&self, i: usize, j: usize, k: usize) -> Option<f64> {
        let [ni, nj, nk] = self.shape;
        if i >= ni || j >= nj || k >= nk {
            return None;
        }
        self.values.get((i * nj + j) * nk + k).copied()
    }

    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.values.iter().fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }
}

impl SoluteOutput {
    /// First value; bulk solutes carry a single concentration.
    pub fn concentration(&self) -> Option<f64> {
        self.values.first().copied()
    }

    /// Reshape to the solute grid. Older simulator versions wrote one cell of
    /// padding on every face; that padding is removed.
    pub fn concentration_grid(&self) -> IdynoResult<ConcentrationGrid> {
        let GridSpec { n_i, n_j, n_k, .. } = self.grid;
        let three_d = self.grid.is_3d();
        let nk = if three_d { n_k } else { 1 };
        let exact = n_i * n_j * nk;

        if self.values.len() == exact {
            return Ok(ConcentrationGrid {
                shape: [n_i, n_j, nk],
                values: self.values.clone(),
            });
        }

        let (pi, pj, pk) = (n_i + 2, n_j + 2, if three_d { nk + 2 } else { 1 });
        if self.values.len() != pi * pj * pk {
            return Err(IdynoError::GridShape {
                name: self.name.clone(),
                expected: exact,
                found: self.values.len(),
            });
        }

        let k_range = if three_d { 1..pk - 1 } else { 0..1 };
        let mut values = Vec::with_capacity(exact);
        for i in 1..pi - 1 {
            for j in 1..pj - 1 {
                for k in k_range.clone() {
                    values.push(self.values[(i * pj + j) * pk + k]);
                }
            }
        }
        Ok(ConcentrationGrid {
            shape: [n_i, n_j, nk],
            values,
        })
    }
}

/// Parsed `env_State(N).xml`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvState {
    pub origin: String,
    pub header: OutputHeader,
    pub thickness: Option<Thickness>,
    pub solutes: Vec<SoluteOutput>,
}

impl EnvState {
    pub fn from_path(path: &Path) -> IdynoResult<Self> {
        let content = xml::read_file(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn parse(content: &str, origin: &str) -> IdynoResult<Self> {
        let doc = xml::parse(content, origin)?;
        let simulation = xml::simulation(&doc, origin)?;
        let header = xml::output_header(simulation, origin)?;

        let thickness = match simulation.children().find(|n| n.has_tag_name("thickness")) {
            Some(node) => {
                let field = |tag: &str| -> IdynoResult<f64> {
                    let el = xml::child(node, tag, origin)?;
                    xml::number(el.text().unwrap_or_default(), tag, origin)
                };
                Some(Thickness {
                    mean: field("mean")?,
                    stddev: field("stddev")?,
                    max: field("max")?,
                })
            }
            None => None,
        };

        // Chemostat runs nest solutes under <bulk>
        let container = simulation
            .children()
            .find(|n| n.has_tag_name("bulk"))
            .unwrap_or(simulation);

        let mut solutes = Vec::new();
        for node in container.children().filter(|n| n.has_tag_name("solute")) {
            let name = xml::attr(node, "name", origin)?.to_string();
            let values = split_rows(node.text().unwrap_or_default())
                .into_iter()
                .flatten()
                .map(|v| xml::number(v, &name, origin))
                .collect::<IdynoResult<Vec<f64>>>()?;
            solutes.push(SoluteOutput {
                unit: node.attribute("unit").unwrap_or_default().to_string(),
                grid: xml::grid_spec(node, origin)?,
                name,
                values,
            });
        }

        Ok(Self {
            origin: origin.to_string(),
            header,
            thickness,
            solutes,
        })
    }

    pub fn solute_names(&self) -> Vec<&str> {
        self.solutes.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn solute(&self, name: &str) -> IdynoResult<&SoluteOutput> {
        self.solutes
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| IdynoError::UnknownSolute {
                path: self.origin.clone(),
                name: name.to_string(),
            })
    }
}
