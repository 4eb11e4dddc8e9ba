//! The initial cost matrix and the baseline derived from it.
//!
//! Entry `(i, j)` is the time patrol `i` needs to pacify system `j`. The
//! matrix either comes from a configuration file or is drawn at random, and
//! is only consulted once: to seed the initial patrols and to compute `tmin`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tsify_next::Tsify;

use crate::error::{Result, SimError};
use crate::types::Time;

/// Half-open range `[low, high)` that random pacification times are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct CostRange {
    pub low: Time,
    pub high: Time,
}

impl CostRange {
    pub fn new(low: Time, high: Time) -> Result<Self> {
        if low >= high {
            return Err(SimError::invalid(
                "cost range",
                format!("low ({low}) must be below high ({high})"),
            ));
        }
        Ok(Self { low, high })
    }
}

impl Default for CostRange {
    fn default() -> Self {
        Self { low: 50, high: 350 }
    }
}

/// Rectangular n×m table of pacification times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostMatrix {
    rows: Vec<Vec<Time>>,
    columns: usize,
}

impl CostMatrix {
    /// Build from explicit rows. Rejects empty and ragged input.
    pub fn from_rows(rows: Vec<Vec<Time>>) -> Result<Self> {
        let columns = rows.first().map(Vec::len).unwrap_or(0);
        if columns == 0 {
            return Err(SimError::EmptyCostMatrix);
        }
        if let Some((row, found)) = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (i, r.len()))
            .find(|&(_, len)| len != columns)
        {
            return Err(SimError::RaggedCostMatrix {
                row,
                expected: columns,
                found,
            });
        }
        Ok(Self { rows, columns })
    }

    /// Draw every entry uniformly from `range`, row by row.
    pub fn random<R: Rng + ?Sized>(
        patrols: usize,
        systems: usize,
        range: CostRange,
        rng: &mut R,
    ) -> Result<Self> {
        if patrols == 0 || systems == 0 {
            return Err(SimError::EmptyCostMatrix);
        }
        // Fields are public, so a range may not have gone through `CostRange::new`
        let range = CostRange::new(range.low, range.high)?;
        let rows = (0..patrols)
            .map(|_| {
                (0..systems)
                    .map(|_| rng.random_range(range.low..range.high))
                    .collect()
            })
            .collect();
        Ok(Self {
            rows,
            columns: systems,
        })
    }

    /// Number of patrols (rows)
    pub fn patrols(&self) -> usize {
        self.rows.len()
    }

    /// Number of systems (columns)
    pub fn systems(&self) -> usize {
        self.columns
    }

    pub fn row(&self, patrol: usize) -> Option<&[Time]> {
        self.rows.get(patrol).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Time]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Baseline: the mean over systems of the cheapest time any patrol needs
    /// for that system.
    pub fn tmin(&self) -> f64 {
        let sum: f64 = (0..self.columns)
            .map(|j| {
                self.rows
                    .iter()
                    .map(|r| r[j])
                    .min()
                    .map(f64::from)
                    .unwrap_or(0.0)
            })
            .sum();
        sum / self.columns as f64
    }
}
