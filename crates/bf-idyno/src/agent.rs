//! `agent_State` documents: per-species cell tables.

use bf_core::{Value, mean_std, typecast};
use bf_results::csv::{split_header, split_rows};
use std::path::Path;
use std::sync::Arc;

use crate::xml::{self, GridSpec, OutputHeader};
use crate::{IdynoError, IdynoResult};

/// One simulated cell. Attribute values are kept as the raw text the
/// simulator wrote; numeric accessors parse on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    species: Arc<str>,
    columns: Arc<[String]>,
    values: Vec<String>,
}

impl Cell {
    pub fn species(&self) -> &str {
        &self.species
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.columns
            .iter()
            .position(|c| c == attribute)
            .map(|i| self.values[i].as_str())
    }

    pub fn value(&self, attribute: &str) -> Option<Value> {
        self.get(attribute).map(typecast)
    }

    pub fn get_f64(&self, attribute: &str) -> IdynoResult<f64> {
        let raw = self
            .get(attribute)
            .ok_or_else(|| IdynoError::MissingCellAttribute {
                species: self.species.to_string(),
                attribute: attribute.to_string(),
            })?;
        xml::number(raw, attribute, &self.species)
    }

    /// `(locationX, locationY, locationZ)`; Z defaults to 0 in 2-D runs.
    pub fn location(&self) -> IdynoResult<[f64; 3]> {
        let x = self.get_f64("locationX")?;
        let y = self.get_f64("locationY")?;
        let z = match self.get("locationZ") {
            Some(_) => self.get_f64("locationZ")?,
            None => 0.0,
        };
        Ok([x, y, z])
    }

    pub fn radius(&self, total: bool) -> IdynoResult<f64> {
        self.get_f64(if total { "totalRadius" } else { "radius" })
    }

    pub fn total_biomass<S: AsRef<str>>(&self, biomass_names: &[S]) -> IdynoResult<f64> {
        biomass_names
            .iter()
            .map(|n| self.get_f64(n.as_ref()))
            .sum()
    }

    /// growthRate divided by the summed biomass components.
    pub fn specific_growth_rate<S: AsRef<str>>(&self, biomass_names: &[S]) -> IdynoResult<f64> {
        Ok(self.get_f64("growthRate")? / self.total_biomass(biomass_names)?)
    }
}

/// All cells of one `<species>` element.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesOutput {
    pub name: String,
    pub header: Vec<String>,
    pub cells: Vec<Cell>,
}

impl SpeciesOutput {
    pub fn population(&self) -> usize {
        self.cells.len()
    }

    /// Cells whose attributes equal every `(attribute, value)` requirement, compared as text.
    pub fn find_cells(&self, requirements: &[(&str, &str)]) -> Vec<&Cell> {
        self.cells
            .iter()
            .filter(|c| requirements.iter().all(|(a, v)| c.get(a) == Some(*v)))
            .collect()
    }

    pub fn attribute_values(&self, attribute: &str) -> IdynoResult<Vec<f64>> {
        self.cells.iter().map(|c| c.get_f64(attribute)).collect()
    }

    pub fn total_attribute(&self, attribute: &str) -> IdynoResult<f64> {
        Ok(self.attribute_values(attribute)?.iter().sum())
    }

    /// Mean and population standard deviation; `None` for an empty species.
    pub fn mean_attribute(&self, attribute: &str) -> IdynoResult<Option<(f64, f64)>> {
        Ok(mean_std(&self.attribute_values(attribute)?))
    }

    pub fn specific_growth_rates<S: AsRef<str>>(&self, biomass_names: &[S]) -> IdynoResult<Vec<f64>> {
        self.cells
            .iter()
            .map(|c| c.specific_growth_rate(biomass_names))
            .collect()
    }
}

/// Parsed `agent_State(N).xml`.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentState {
    pub origin: String,
    pub header: OutputHeader,
    pub grid: GridSpec,
    pub species: Vec<SpeciesOutput>,
}

impl AgentState {
    pub fn from_path(path: &Path) -> IdynoResult<Self> {
        let content = xml::read_file(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse document text; `origin` names the source in error messages.
    pub fn parse(content: &str, origin: &str) -> IdynoResult<Self> {
        let doc = xml::parse(content, origin)?;
        let simulation = xml::simulation(&doc, origin)?;
        let header = xml::output_header(simulation, origin)?;
        let grid = xml::grid_spec(xml::child(simulation, "grid", origin)?, origin)?;

        let mut species = Vec::new();
        for node in simulation.children().filter(|n| n.has_tag_name("species")) {
            let name = xml::attr(node, "name", origin)?.to_string();
            let columns: Arc<[String]> = split_header(xml::attr(node, "header", origin)?).into();
            let species_name: Arc<str> = name.as_str().into();

            let mut cells = Vec::new();
            for (row, fields) in split_rows(node.text().unwrap_or_default())
                .into_iter()
                .enumerate()
            {
                if fields.len() != columns.len() {
                    return Err(IdynoError::FieldCount {
                        path: origin.to_string(),
                        owner: format!("species {name}"),
                        row,
                        expected: columns.len(),
                        found: fields.len(),
                    });
                }
                cells.push(Cell {
                    species: species_name.clone(),
                    columns: columns.clone(),
                    values: fields.into_iter().map(str::to_string).collect(),
                });
            }

            species.push(SpeciesOutput {
                name,
                header: columns.to_vec(),
                cells,
            });
        }

        tracing::trace!(origin, iterate = header.iterate, species = species.len(), "agent state parsed");
        Ok(Self {
            origin: origin.to_string(),
            header,
            grid,
            species,
        })
    }

    pub fn species_names(&self) -> Vec<&str> {
        self.species.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn species_by_name(&self, name: &str) -> IdynoResult<&SpeciesOutput> {
        self.species
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| IdynoError::UnknownSpecies {
                path: self.origin.clone(),
                name: name.to_string(),
            })
    }

    pub fn all_cells(&self) -> impl Iterator<Item = &Cell> {
        self.species.iter().flat_map(|s| s.cells.iter())
    }

    pub fn total_attribute(&self, attribute: &str) -> IdynoResult<f64> {
        self.species
            .iter()
            .map(|s| s.total_attribute(attribute))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<idynomics>
 <simulation iterate="240" time="48.0" unit="hour">
  <grid resolution="4.0" nI="65" nJ="65" nK="1"/>
  <species name="OldieA" header="family,genealogy,generation,growthRate,biomass,inert,radius,totalRadius,locationX,locationY,locationZ">
0,0,0,0.02,100.0,25.0,1.2,1.4,3.5,10.0,0.0;
1,0,1,0.04,200.0,0.0,1.5,1.5,9.0,20.5,0.0;
</species>
  <species name="OldieB" header="family,genealogy,generation,growthRate,biomass,inert,radius,totalRadius,locationX,locationY,locationZ">
</species>
 </simulation>
</idynomics>"#;

    #[test]
    fn parses_header_grid_and_species() {
        let state = AgentState::parse(AGENT_XML, "agent_State(240).xml").unwrap();
        assert_eq!(state.header.iterate, 240);
        assert_eq!(state.header.time, 48.0);
        assert_eq!(state.grid.n_i, 65);
        assert!(!state.grid.is_3d());
        assert_eq!(state.species_names(), vec!["OldieA", "OldieB"]);
        assert_eq!(state.all_cells().count(), 2);
        assert_eq!(state.species_by_name("OldieB").unwrap().population(), 0);
    }

    #[test]
    fn cell_accessors() {
        let state = AgentState::parse(AGENT_XML, "a.xml").unwrap();
        let cell = &state.species_by_name("OldieA").unwrap().cells[1];
        assert_eq!(cell.species(), "OldieA");
        assert_eq!(cell.location().unwrap(), [9.0, 20.5, 0.0]);
        assert_eq!(cell.value("family"), Some(Value::Int(1)));
        assert_eq!(cell.radius(true).unwrap(), 1.5);
        let rate = cell.specific_growth_rate(&["biomass", "inert"]).unwrap();
        assert!((rate - 0.04 / 200.0).abs() < 1e-15);
        assert!(matches!(
            cell.get_f64("age"),
            Err(IdynoError::MissingCellAttribute { .. })
        ));
    }

    #[test]
    fn species_statistics() {
        let state = AgentState::parse(AGENT_XML, "a.xml").unwrap();
        let species = state.species_by_name("OldieA").unwrap();
        assert_eq!(species.total_attribute("biomass").unwrap(), 300.0);
        let (mean, std) = species.mean_attribute("biomass").unwrap().unwrap();
        assert_eq!(mean, 150.0);
        assert_eq!(std, 50.0);
        assert_eq!(species.find_cells(&[("generation", "1")]).len(), 1);
        assert_eq!(state.total_attribute("inert").unwrap(), 25.0);
    }

    #[test]
    fn field_count_mismatch_names_species() {
        let xml = r#"<idynomics><simulation iterate="0" time="0.0" unit="h">
<grid resolution="4.0" nI="2" nJ="2" nK="1"/>
<species name="A" header="locationX,locationY">1.0,2.0;3.0;</species>
</simulation></idynomics>"#;
        let err = AgentState::parse(xml, "bad.xml").unwrap_err();
        match err {
            IdynoError::FieldCount { owner, row, .. } => {
                assert_eq!(owner, "species A");
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_grid_is_reported() {
        let xml = r#"<idynomics><simulation iterate="0" time="0.0" unit="h"/></idynomics>"#;
        assert!(matches!(
            AgentState::parse(xml, "x.xml"),
            Err(IdynoError::MissingElement { .. })
        ));
    }
}
