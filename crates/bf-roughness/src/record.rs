//! Conversion between [`RoughnessResult`] and result-store rows.

use bf_core::Value;
use bf_results::{KeyAttributes, ResultRecord, ResultSet};

use crate::profile::RoughnessResult;
use crate::{AnalyzerResult, RoughnessError};

pub const ROUGHNESS_SET_NAME: &str = "roughness";
pub const ROUGHNESS_HEADER: [&str; 6] = ["iterate", "Sigmaf", "Sigma", "Xf", "Pf", "height"];

/// Key of the roughness set for one simulation.
pub fn roughness_key(simulation_id: &str) -> KeyAttributes {
    KeyAttributes::named(ROUGHNESS_SET_NAME).with("simulation", simulation_id)
}

impl RoughnessResult {
    pub fn to_row(&self, iterate: u64) -> Vec<(&'static str, Value)> {
        vec![
            ("iterate", Value::from(iterate)),
            ("Sigmaf", Value::from(self.sigma_f)),
            ("Sigma", Value::from(self.sigma)),
            ("Xf", Value::from(self.x_f)),
            ("Pf", Value::from(self.p_f)),
            ("height", Value::from(self.height_index)),
        ]
    }

    /// `(iterate, result)` from a row written by [`Self::to_row`].
    pub fn from_record(record: &ResultRecord) -> AnalyzerResult<(u64, Self)> {
        let iterate = non_negative(record, "iterate")?;
        let height_index = non_negative(record, "height")? as usize;
        Ok((
            iterate,
            Self {
                sigma_f: number(record, "Sigmaf")?,
                sigma: number(record, "Sigma")?,
                x_f: number(record, "Xf")?,
                p_f: number(record, "Pf")?,
                height_index,
            },
        ))
    }
}

/// Cached result for `iterate`, if the set already holds one.
pub fn cached_roughness(set: &ResultSet, iterate: u64) -> Option<RoughnessResult> {
    let wanted = Value::from(iterate);
    set.records()
        .iter()
        .filter(|r| r.get("iterate") == Some(&wanted))
        .find_map(|r| RoughnessResult::from_record(r).ok())
        .map(|(_, result)| result)
}

/// Drop the cached rows of `iterates`, keeping every other iterate's row.
pub fn forget_roughness(set: &mut ResultSet, iterates: &[u64]) -> usize {
    let forgotten: Vec<Value> = iterates.iter().map(|&i| Value::from(i)).collect();
    set.retain_records(|r| r.get("iterate").is_none_or(|v| !forgotten.contains(v)))
}

fn number(record: &ResultRecord, column: &str) -> AnalyzerResult<f64> {
    record
        .get_f64(column)
        .ok_or_else(|| RoughnessError::InvalidRecord {
            reason: format!("column '{column}' is missing or not numeric"),
        })
}

fn non_negative(record: &ResultRecord, column: &str) -> AnalyzerResult<u64> {
    record
        .get(column)
        .and_then(Value::as_i64)
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| RoughnessError::InvalidRecord {
            reason: format!("column '{column}' is missing or not a non-negative integer"),
        })
}
