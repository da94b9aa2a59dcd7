//! Occupancy grid and front classification.

use bf_core::{BfError, ensure_finite};
use serde::{Deserialize, Serialize};

use crate::{AnalyzerResult, RoughnessError};

/// State of one grid element.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Occupancy {
    #[default]
    Empty = 0,
    Occupied = 1,
    /// Occupied and adjacent to at least one empty element.
    Front = 2,
}

impl Occupancy {
    pub fn is_occupied(self) -> bool {
        self != Occupancy::Empty
    }
}

/// Which neighbours decide whether an occupied element is front.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Neighbourhood {
    /// Up, down, left, right.
    #[default]
    VonNeumann,
    /// Von Neumann plus the four diagonals.
    Moore,
}

/// `n_i x n_j` occupancy, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    n_i: usize,
    n_j: usize,
    cells: Vec<Occupancy>,
    max_i_seen: Option<usize>,
    occupied: usize,
}

impl OccupancyGrid {
    pub fn new(n_i: usize, n_j: usize) -> AnalyzerResult<Self> {
        if n_i == 0 || n_j == 0 {
            return Err(BfError::InvalidArg {
                what: "grid dimensions must be non-zero",
            }
            .into());
        }
        Ok(Self {
            n_i,
            n_j,
            cells: vec![Occupancy::Empty; n_i * n_j],
            max_i_seen: None,
            occupied: 0,
        })
    }

    /// Mark the element containing each `[x, y]` location, with
    /// `(i, j) = (floor(x / resolution), floor(y / resolution))`.
    pub fn rasterize<I>(locations: I, resolution: f64, n_i: usize, n_j: usize) -> AnalyzerResult<Self>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        ensure_finite(resolution, "grid resolution")?;
        if resolution <= 0.0 {
            return Err(BfError::InvalidArg {
                what: "grid resolution must be positive",
            }
            .into());
        }

        let mut grid = Self::new(n_i, n_j)?;
        for [x, y] in locations {
            ensure_finite(x, "cell location x")?;
            ensure_finite(y, "cell location y")?;
            let fi = (x / resolution).floor();
            let fj = (y / resolution).floor();
            if fi < 0.0 || fj < 0.0 || fi >= n_i as f64 || fj >= n_j as f64 {
                return Err(RoughnessError::OutOfDomain { x, y, n_i, n_j });
            }
            grid.mark(fi as usize, fj as usize)?;
        }
        Ok(grid)
    }

    pub fn mark(&mut self, i: usize, j: usize) -> AnalyzerResult<()> {
        let idx = self.index(i, j)?;
        if self.cells[idx] == Occupancy::Empty {
            self.cells[idx] = Occupancy::Occupied;
            self.occupied += 1;
        }
        self.max_i_seen = Some(self.max_i_seen.map_or(i, |m| m.max(i)));
        Ok(())
    }

    fn index(&self, i: usize, j: usize) -> AnalyzerResult<usize> {
        if i >= self.n_i {
            return Err(BfError::IndexOob {
                what: "grid row",
                index: i,
                len: self.n_i,
            }
            .into());
        }
        if j >= self.n_j {
            return Err(BfError::IndexOob {
                what: "grid column",
                index: j,
                len: self.n_j,
            }
            .into());
        }
        Ok(i * self.n_j + j)
    }

    pub fn n_i(&self) -> usize {
        self.n_i
    }

    pub fn n_j(&self) -> usize {
        self.n_j
    }

    /// Highest occupied row, if any.
    pub fn max_i_seen(&self) -> Option<usize> {
        self.max_i_seen
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied
    }

    /// Panics when out of range, like slice indexing.
    pub fn get(&self, i: usize, j: usize) -> Occupancy {
        self.cells[i * self.n_j + j]
    }

    pub fn is_occupied(&self, i: usize, j: usize) -> bool {
        self.get(i, j).is_occupied()
    }

    pub fn is_front(&self, i: usize, j: usize) -> bool {
        self.get(i, j) == Occupancy::Front
    }

    /// Re-mark every occupied element as `Front` or `Occupied`.
    ///
    /// Rows are bounded (no neighbour below row 0 or above the top row);
    /// columns wrap around.
    pub fn classify_front(&mut self, neighbourhood: Neighbourhood) {
        let Some(top) = self.max_i_seen else {
            return;
        };
        for i in 0..=top {
            for j in 0..self.n_j {
                if !self.is_occupied(i, j) {
                    continue;
                }
                let state = if self.has_empty_neighbour(i, j, neighbourhood) {
                    Occupancy::Front
                } else {
                    Occupancy::Occupied
                };
                self.cells[i * self.n_j + j] = state;
            }
        }
    }

    fn has_empty_neighbour(&self, i: usize, j: usize, neighbourhood: Neighbourhood) -> bool {
        let left = (j + self.n_j - 1) % self.n_j;
        let right = (j + 1) % self.n_j;

        let below = i.checked_sub(1);
        let above = (i + 1 < self.n_i).then_some(i + 1);

        let mut probes: Vec<(usize, usize)> = Vec::with_capacity(8);
        for row in [below, above].into_iter().flatten() {
            probes.push((row, j));
            if neighbourhood == Neighbourhood::Moore {
                probes.push((row, left));
                probes.push((row, right));
            }
        }
        probes.push((i, left));
        probes.push((i, right));

        probes
            .into_iter()
            .filter(|&(r, c)| (r, c) != (i, j))
            .any(|(r, c)| !self.is_occupied(r, c))
    }

    /// Number of front elements in each row.
    pub fn front_counts(&self) -> Vec<usize> {
        self.cells
            .chunks(self.n_j)
            .map(|row| row.iter().filter(|c| **c == Occupancy::Front).count())
            .collect()
    }
}
