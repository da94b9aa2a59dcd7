//! Reading and writing the results document.

use bf_core::typecast;
use std::fmt::Write as _;
use std::path::Path;

use crate::csv::{join_rows, split_header, split_rows};
use crate::store::SimulationStamp;
use crate::types::{HEADER_ATTRIBUTE, KeyAttributes, ResultSet};
use crate::{ResultsError, ResultsResult};

pub(crate) const ROOT_ELEMENT: &str = "idynomics";

pub(crate) struct Document {
    pub stamp: SimulationStamp,
    pub sets: Vec<ResultSet>,
}

fn malformed(path: &Path, reason: impl Into<String>) -> ResultsError {
    ResultsError::Malformed {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Parse `<root><simulation ...><results><result .../>...</results></simulation></root>`.
pub(crate) fn parse_document(xml: &str, path: &Path) -> ResultsResult<Document> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| malformed(path, e.to_string()))?;

    let simulation = doc
        .root_element()
        .children()
        .find(|n| n.has_tag_name("simulation"))
        .ok_or_else(|| malformed(path, "no <simulation> element"))?;

    let stamp = parse_stamp(simulation, path)?;

    let mut sets = Vec::new();
    let Some(results) = simulation.children().find(|n| n.has_tag_name("results")) else {
        return Ok(Document { stamp, sets });
    };

    for result in results.children().filter(|n| n.has_tag_name("result")) {
        let header = result
            .attribute(HEADER_ATTRIBUTE)
            .ok_or_else(|| malformed(path, "<result> without header attribute"))?;
        let key: KeyAttributes = result
            .attributes()
            .filter(|a| a.name() != HEADER_ATTRIBUTE)
            .map(|a| (a.name(), a.value()))
            .collect();

        let rows = split_rows(result.text().unwrap_or_default())
            .into_iter()
            .map(|row| row.into_iter().map(typecast).collect())
            .collect();

        let set = ResultSet::from_rows(key, split_header(header), rows, Some(path.to_path_buf()))
            .map_err(|e| malformed(path, e.to_string()))?;
        sets.push(set);
    }

    Ok(Document { stamp, sets })
}

fn parse_stamp(simulation: roxmltree::Node<'_, '_>, path: &Path) -> ResultsResult<SimulationStamp> {
    let mut stamp = SimulationStamp::default();
    if let Some(iterate) = simulation.attribute("iterate") {
        stamp.iterate = iterate
            .trim()
            .parse()
            .map_err(|_| malformed(path, format!("bad iterate {iterate:?}")))?;
    }
    if let Some(time) = simulation.attribute("time") {
        stamp.time = time
            .trim()
            .parse()
            .map_err(|_| malformed(path, format!("bad time {time:?}")))?;
    }
    if let Some(unit) = simulation.attribute("unit") {
        stamp.unit = unit.to_string();
    }
    Ok(stamp)
}

pub(crate) fn render_document(stamp: &SimulationStamp, sets: &[ResultSet]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
    let _ = writeln!(out, "<{ROOT_ELEMENT}>");
    let _ = writeln!(
        out,
        "  <simulation iterate=\"{}\" time=\"{:?}\" unit=\"{}\">",
        stamp.iterate,
        stamp.time,
        escape_attribute(&stamp.unit)
    );
    out.push_str("    <results>\n");
    for set in sets {
        out.push_str("      <result");
        for (attribute, value) in set.key().iter() {
            let _ = write!(out, " {}=\"{}\"", attribute, escape_attribute(value));
        }
        let _ = write!(
            out,
            " {}=\"{}\">",
            HEADER_ATTRIBUTE,
            escape_attribute(&set.header().join(","))
        );
        let text = join_rows(set.records().iter().map(|r| r.values()));
        out.push_str(&escape(&text));
        out.push_str("</result>\n");
    }
    out.push_str("    </results>\n");
    out.push_str("  </simulation>\n");
    let _ = writeln!(out, "</{ROOT_ELEMENT}>");
    out
}

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Like [`escape`], plus character references for the whitespace that
/// attribute-value normalisation would otherwise turn into spaces.
pub(crate) fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
