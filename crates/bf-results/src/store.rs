//! File-backed result store.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::types::{KeyAttributes, ResultSet};
use crate::xml::{Document, parse_document, render_document};
use crate::ResultsResult;

/// Handle capability: the store may be mutated and written back.
#[derive(Debug, Clone, Copy)]
pub struct Writable;

/// Handle capability: lookups only, no `write`.
#[derive(Debug, Clone, Copy)]
pub struct ReadOnly;

/// `<simulation iterate=.. time=.. unit=..>` attributes of the enclosing document.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStamp {
    pub iterate: u64,
    pub time: f64,
    pub unit: String,
}

impl Default for SimulationStamp {
    fn default() -> Self {
        Self {
            iterate: 0,
            time: 0.0,
            unit: "h".to_string(),
        }
    }
}

/// Ordered collection of result sets persisted as one XML document.
///
/// One process writes a given file at a time; nothing here locks.
#[derive(Debug, Clone)]
pub struct ResultStore<A = Writable> {
    path: PathBuf,
    stamp: SimulationStamp,
    sets: Vec<ResultSet>,
    recovered: bool,
    _access: PhantomData<A>,
}

impl<A> ResultStore<A> {
    fn load(path: &Path) -> ResultsResult<Self> {
        let mut store = Self {
            path: path.to_path_buf(),
            stamp: SimulationStamp::default(),
            sets: Vec::new(),
            recovered: false,
            _access: PhantomData,
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "results file absent, starting empty");
            return Ok(store);
        }

        let content = fs::read_to_string(path)?;
        match parse_document(&content, path) {
            Ok(Document { stamp, sets }) => {
                store.stamp = stamp;
                store.sets = sets;
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "unreadable results file, treating as empty");
                store.recovered = true;
            }
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stamp(&self) -> &SimulationStamp {
        &self.stamp
    }

    pub fn sets(&self) -> &[ResultSet] {
        &self.sets
    }

    /// True when the file existed but could not be parsed and the store started empty.
    pub fn recovered_from_malformed(&self) -> bool {
        self.recovered
    }

    /// First set with exactly these key attributes, whatever its header.
    pub fn find_result_set(&self, key: &KeyAttributes) -> Option<&ResultSet> {
        self.sets.iter().find(|s| s.key() == key)
    }

    fn position(&self, key: &KeyAttributes, header: Option<&[String]>) -> Option<usize> {
        self.sets
            .iter()
            .position(|s| s.key() == key && header.is_none_or(|h| s.header() == h))
    }
}

impl ResultStore<Writable> {
    /// Open `path` for reading and writing. A missing file yields an empty
    /// store; a file that does not parse is logged and treated as empty.
    pub fn open(path: impl AsRef<Path>) -> ResultsResult<Self> {
        Self::load(path.as_ref())
    }

    /// Existing set with the same key and header, or a newly registered empty one.
    pub fn get_or_create_result_set<S: AsRef<str>>(
        &mut self,
        key: &KeyAttributes,
        header: &[S],
    ) -> ResultsResult<&mut ResultSet> {
        let header: Vec<String> = header.iter().map(|c| c.as_ref().to_string()).collect();
        let idx = match self.position(key, Some(&header)) {
            Some(idx) => idx,
            None => self.register(key, header)?,
        };
        Ok(&mut self.sets[idx])
    }

    /// Like [`Self::get_or_create_result_set`] but matches on key alone; an
    /// existing set keeps its stored header.
    pub fn get_or_create_result_set_ignoring_header<S: AsRef<str>>(
        &mut self,
        key: &KeyAttributes,
        header: &[S],
    ) -> ResultsResult<&mut ResultSet> {
        let idx = match self.position(key, None) {
            Some(idx) => idx,
            None => {
                let header = header.iter().map(|c| c.as_ref().to_string()).collect();
                self.register(key, header)?
            }
        };
        Ok(&mut self.sets[idx])
    }

    fn register(&mut self, key: &KeyAttributes, header: Vec<String>) -> ResultsResult<usize> {
        let set = ResultSet::new(key.clone(), header, Some(self.path.clone()))?;
        tracing::debug!(path = %self.path.display(), set = set.name(), "new result set");
        self.sets.push(set);
        Ok(self.sets.len() - 1)
    }

    /// Drop the first set with this key.
    pub fn remove_result_set(&mut self, key: &KeyAttributes) -> Option<ResultSet> {
        let idx = self.position(key, None)?;
        Some(self.sets.remove(idx))
    }

    pub fn set_stamp(&mut self, stamp: SimulationStamp) {
        self.stamp = stamp;
    }

    /// Write the whole store back to the path it was opened from.
    pub fn write(&self) -> ResultsResult<()> {
        write_atomically(&self.path, &render_document(&self.stamp, &self.sets))
    }

    /// Write to `path` and make it the store's path from now on.
    pub fn write_to(&mut self, path: impl AsRef<Path>) -> ResultsResult<()> {
        let path = path.as_ref();
        write_atomically(path, &render_document(&self.stamp, &self.sets))?;
        self.path = path.to_path_buf();
        for set in &mut self.sets {
            set.set_origin(path);
        }
        Ok(())
    }
}

impl ResultStore<ReadOnly> {
    /// Open `path` for lookups only.
    pub fn open_read_only(path: impl AsRef<Path>) -> ResultsResult<Self> {
        Self::load(path.as_ref())
    }
}

// The document is replaced in one rename so readers never see half a file.
fn write_atomically(path: &Path, content: &str) -> ResultsResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(err.into());
    }
    tracing::debug!(path = %path.display(), bytes = content.len(), "results written");
    Ok(())
}
