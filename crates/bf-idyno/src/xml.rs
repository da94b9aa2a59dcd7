//! Shared pieces of simulator output documents.

use bf_core::{Length, um};
use roxmltree::Node;
use std::path::Path;
use std::str::FromStr;

use crate::{IdynoError, IdynoResult};

/// `<simulation iterate=".." time=".." unit="..">`
#[derive(Debug, Clone, PartialEq)]
pub struct OutputHeader {
    pub iterate: u64,
    pub time: f64,
    pub unit: String,
}

/// Grid geometry: `resolution` is the side of one grid element in micrometres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub resolution: f64,
    pub n_i: usize,
    pub n_j: usize,
    pub n_k: usize,
}

impl GridSpec {
    pub fn is_3d(&self) -> bool {
        self.n_k > 1
    }

    pub fn resolution_length(&self) -> Length {
        um(self.resolution)
    }
}

pub(crate) fn read_file(path: &Path) -> IdynoResult<String> {
    std::fs::read_to_string(path).map_err(|source| IdynoError::Read {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn parse<'a>(xml: &'a str, origin: &str) -> IdynoResult<roxmltree::Document<'a>> {
    roxmltree::Document::parse(xml).map_err(|e| IdynoError::Xml {
        path: origin.to_string(),
        message: e.to_string(),
    })
}

pub(crate) fn child<'a, 'i>(node: Node<'a, 'i>, tag: &str, origin: &str) -> IdynoResult<Node<'a, 'i>> {
    node.children()
        .find(|n| n.has_tag_name(tag))
        .ok_or_else(|| IdynoError::MissingElement {
            path: origin.to_string(),
            element: tag.to_string(),
        })
}

pub(crate) fn attr<'a>(node: Node<'a, '_>, name: &str, origin: &str) -> IdynoResult<&'a str> {
    node.attribute(name).ok_or_else(|| IdynoError::MissingAttribute {
        path: origin.to_string(),
        element: node.tag_name().name().to_string(),
        attribute: name.to_string(),
    })
}

pub(crate) fn number<T: FromStr>(text: &str, what: &str, origin: &str) -> IdynoResult<T> {
    text.trim().parse().map_err(|_| IdynoError::InvalidNumber {
        path: origin.to_string(),
        what: what.to_string(),
        value: text.to_string(),
    })
}

pub(crate) fn num_attr<T: FromStr>(node: Node<'_, '_>, name: &str, origin: &str) -> IdynoResult<T> {
    number(attr(node, name, origin)?, name, origin)
}

pub(crate) fn simulation<'a, 'i>(
    doc: &'a roxmltree::Document<'i>,
    origin: &str,
) -> IdynoResult<Node<'a, 'i>> {
    child(doc.root_element(), "simulation", origin)
}

pub(crate) fn output_header(simulation: Node<'_, '_>, origin: &str) -> IdynoResult<OutputHeader> {
    Ok(OutputHeader {
        iterate: num_attr(simulation, "iterate", origin)?,
        time: num_attr(simulation, "time", origin)?,
        unit: simulation.attribute("unit").unwrap_or("h").to_string(),
    })
}

pub(crate) fn grid_spec(node: Node<'_, '_>, origin: &str) -> IdynoResult<GridSpec> {
    Ok(GridSpec {
        resolution: num_attr(node, "resolution", origin)?,
        n_i: num_attr(node, "nI", origin)?,
        n_j: num_attr(node, "nJ", origin)?,
        n_k: num_attr(node, "nK", origin)?,
    })
}
