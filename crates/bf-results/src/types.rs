//! Result data types.

use bf_core::Value;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::{ResultsError, ResultsResult};

/// Attribute written alongside the key attributes; never part of a key.
pub const HEADER_ATTRIBUTE: &str = "header";
pub const NAME_ATTRIBUTE: &str = "name";

/// Identifying attributes of a result set, e.g. `{name: age, starting_time: 2400}`.
///
/// Insertion order is kept for writing; equality ignores it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeyAttributes(Vec<(String, String)>);

impl KeyAttributes {
    pub fn named(name: impl Into<String>) -> Self {
        Self(vec![(NAME_ATTRIBUTE.to_string(), name.into())])
    }

    /// Set an attribute, replacing any previous value.
    pub fn with(mut self, attribute: impl Into<String>, value: impl ToString) -> Self {
        self.set(attribute, value);
        self
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl ToString) {
        let attribute = attribute.into();
        let value = value.to_string();
        match self.0.iter_mut().find(|(a, _)| *a == attribute) {
            Some(slot) => slot.1 = value,
            None => self.0.push((attribute, value)),
        }
    }

    pub fn get(&self, attribute: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(a, _)| a == attribute)
            .map(|(_, v)| v.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.get(NAME_ATTRIBUTE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, v)| (a.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn validate(&self) -> ResultsResult<()> {
        if self.name().is_none() {
            return Err(ResultsError::MissingName);
        }
        if self.get(HEADER_ATTRIBUTE).is_some() {
            return Err(ResultsError::ReservedAttribute {
                attribute: HEADER_ATTRIBUTE.to_string(),
            });
        }
        for (attribute, _) in self.iter() {
            if let Err(reason) = check_attribute_name(attribute) {
                return Err(ResultsError::InvalidAttribute {
                    attribute: attribute.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Attribute names are written verbatim, so they must parse back as XML names.
/// Prefixed (`a:b`) and `xml*` names are refused along with anything else
/// the document would not read back under the same name.
fn check_attribute_name(name: &str) -> Result<(), &'static str> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err("empty name");
    };
    if !(first.is_alphabetic() || first == '_') {
        return Err("must start with a letter or `_`");
    }
    if !chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        return Err("only letters, digits, `_`, `-` and `.` are allowed");
    }
    if name.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("xml")) {
        return Err("names starting with `xml` are reserved");
    }
    Ok(())
}

impl PartialEq for KeyAttributes {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.iter().all(|(a, v)| other.get(a) == Some(v))
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for KeyAttributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut key = KeyAttributes::default();
        for (a, v) in iter {
            key.set(a, v);
        }
        key
    }
}

/// One row of a result set: column name to typed value, in header order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    fields: Vec<(String, Value)>,
}

impl ResultRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(Value::as_f64)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(c, v)| (c.as_str(), v))
    }
}

/// A named table inside a results document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    key: KeyAttributes,
    header: Vec<String>,
    records: Vec<ResultRecord>,
    origin: Option<PathBuf>,
}

impl ResultSet {
    pub(crate) fn new(
        key: KeyAttributes,
        header: Vec<String>,
        origin: Option<PathBuf>,
    ) -> ResultsResult<Self> {
        key.validate()?;
        validate_header(&header)?;
        Ok(Self {
            key,
            header,
            records: Vec::new(),
            origin,
        })
    }

    /// Build a set from already-split rows, as read from a document.
    pub(crate) fn from_rows(
        key: KeyAttributes,
        header: Vec<String>,
        rows: Vec<Vec<Value>>,
        origin: Option<PathBuf>,
    ) -> ResultsResult<Self> {
        let mut set = Self::new(key, header, origin)?;
        for row in rows {
            if row.len() != set.header.len() {
                return Err(set.mismatch(row.len().to_string() + " fields"));
            }
            let fields = set.header.iter().cloned().zip(row).collect();
            set.records.push(ResultRecord { fields });
        }
        Ok(set)
    }

    pub fn key(&self) -> &KeyAttributes {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.key.name().unwrap_or_default()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn set_origin(&mut self, origin: &Path) {
        self.origin = Some(origin.to_path_buf());
    }

    /// Append one row. The given columns must be exactly the header's
    /// columns (any order); otherwise nothing is appended.
    pub fn append_record<I, K, V>(&mut self, values_by_column: I) -> ResultsResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut given: Vec<(String, Value)> = values_by_column
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let found = given
            .iter()
            .map(|(c, _)| c.as_str())
            .collect::<Vec<_>>()
            .join(",");
        if given.len() != self.header.len() {
            return Err(self.mismatch(found));
        }

        let mut fields = Vec::with_capacity(self.header.len());
        for column in &self.header {
            let Some(pos) = given.iter().position(|(c, _)| c == column) else {
                return Err(self.mismatch(found));
            };
            let (column, value) = given.swap_remove(pos);
            check_value(&column, &value, self.header.len() == 1)?;
            fields.push((column, value));
        }

        self.records.push(ResultRecord { fields });
        Ok(())
    }

    /// Keep only the records `keep` accepts. Returns how many were dropped.
    pub fn retain_records(&mut self, mut keep: impl FnMut(&ResultRecord) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|r| keep(r));
        before - self.records.len()
    }

    /// First record whose `column`, compared as text, equals `value`.
    pub fn find_record(&self, column: &str, value: impl Into<Value>) -> ResultsResult<&ResultRecord> {
        if !self.header.iter().any(|c| c == column) {
            return Err(ResultsError::UnknownColumn {
                set: self.name().to_string(),
                column: column.to_string(),
            });
        }
        let wanted = Into::<Value>::into(value).to_string();
        let hit = self
            .records
            .iter()
            .find(|r| r.get(column).is_some_and(|v| v.to_string() == wanted));

        hit.ok_or_else(|| {
            let store = self
                .origin
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unsaved>".to_string());
            tracing::warn!(%store, set = self.name(), column, value = %wanted, "record not found");
            ResultsError::RecordNotFound {
                store,
                set: self.name().to_string(),
                column: column.to_string(),
                value: wanted,
            }
        })
    }

    /// All values of one column, in record order.
    pub fn column(&self, column: &str) -> ResultsResult<Vec<&Value>> {
        if !self.header.iter().any(|c| c == column) {
            return Err(ResultsError::UnknownColumn {
                set: self.name().to_string(),
                column: column.to_string(),
            });
        }
        Ok(self.records.iter().filter_map(|r| r.get(column)).collect())
    }

    fn mismatch(&self, found: String) -> ResultsError {
        ResultsError::SchemaMismatch {
            set: self.name().to_string(),
            expected: self.header.join(","),
            found,
        }
    }
}

fn validate_header(header: &[String]) -> ResultsResult<()> {
    if header.is_empty() {
        return Err(ResultsError::InvalidHeader {
            reason: "no columns".to_string(),
        });
    }
    for (i, column) in header.iter().enumerate() {
        if column.is_empty() || column.contains([',', ';']) || column.contains(char::is_whitespace) {
            return Err(ResultsError::InvalidHeader {
                reason: format!("bad column name {column:?}"),
            });
        }
        if header[..i].contains(column) {
            return Err(ResultsError::InvalidHeader {
                reason: format!("duplicate column {column:?}"),
            });
        }
    }
    Ok(())
}

// Text must read back unchanged: fields are trimmed on load and a blank
// record is skipped, so a lone empty field would vanish.
fn check_value(column: &str, value: &Value, single_column: bool) -> ResultsResult<()> {
    let Value::Text(text) = value else {
        return Ok(());
    };
    let reason = if text.contains([',', ';', '\n', '\r', '<', '&']) {
        "text may not contain delimiters or markup"
    } else if text.trim() != text.as_str() {
        "text may not start or end with whitespace"
    } else if single_column && text.is_empty() {
        "empty text in a single-column set"
    } else {
        return Ok(());
    };
    Err(ResultsError::InvalidValue {
        column: column.to_string(),
        value: text.clone(),
        reason: reason.to_string(),
    })
}
