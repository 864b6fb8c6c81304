//! Sorted energy/cross-section table with warm-start and cold-start lookup.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::errors::CoreError;

/// A sorted `(energy, sigma)` table for one interaction type (scatter or absorb).
///
/// Energies must be strictly increasing. Lookups outside `[keys[0], keys[last])` clamp to the
/// nearest endpoint and bump `out_of_range_hits` rather than failing — per the numerical-range
/// policy (SPEC_FULL.md §7 kind 4), this is a diagnostic, not an error.
#[derive(Debug)]
pub struct CrossSectionTable {
    keys: Vec<f64>,
    values: Vec<f64>,
    out_of_range_hits: AtomicU64,
}

/// A lookup hint carried by the caller between calls for the same particle so repeated lookups
/// under smoothly-changing energy cost O(1) amortised (the "hinted walk").
pub type LookupHint = i64;

/// No prior knowledge of where in the table the next lookup will land; forces a binary search.
pub const NO_HINT: LookupHint = -1;

impl CrossSectionTable {
    /// Builds a table from parallel key/value slices, already sorted by energy.
    pub fn new(keys: Vec<f64>, values: Vec<f64>) -> Result<Self, CoreError> {
        if keys.len() < 2 || keys.len() != values.len() {
            return Err(CoreError::CrossSectionTableTooSmall(keys.len()));
        }
        for i in 0..keys.len() - 1 {
            if keys[i] >= keys[i + 1] {
                return Err(CoreError::CrossSectionTableNotMonotone {
                    index: i,
                    prev: keys[i],
                    index_next: i + 1,
                    next: keys[i + 1],
                });
            }
        }
        Ok(Self {
            keys,
            values,
            out_of_range_hits: AtomicU64::new(0),
        })
    }

    pub fn nentries(&self) -> usize {
        self.keys.len()
    }

    /// Number of lookups this run has seen for an energy outside the table's range.
    pub fn out_of_range_hits(&self) -> u64 {
        self.out_of_range_hits.load(Ordering::Relaxed)
    }

    /// Looks up the cross section at `energy`, returning the interpolated value and the bracket
    /// index to use as `hint` on the next call for the same particle.
    ///
    /// Mirrors the reference's `microscopic_cs_for_energy`: a hinted linear walk in the
    /// direction of the energy change when `hint` is non-negative, otherwise a binary search
    /// that halves its step (minimum step 1, to cover odd-sized tables).
    pub fn lookup(&self, energy: f64, hint: LookupHint) -> (f64, LookupHint) {
        let last = self.keys.len() - 1;

        let clamped_energy = if energy < self.keys[0] {
            self.out_of_range_hits.fetch_add(1, Ordering::Relaxed);
            self.keys[0]
        } else if energy >= self.keys[last] {
            self.out_of_range_hits.fetch_add(1, Ordering::Relaxed);
            self.keys[last]
        } else {
            energy
        };

        let index = if clamped_energy == self.keys[last] {
            last - 1
        } else if hint >= 0 {
            self.walk_from_hint(clamped_energy, hint as usize, last)
        } else {
            self.binary_search(clamped_energy, last)
        };

        let value = self.interpolate(index, clamped_energy);
        (value, index as LookupHint)
    }

    fn walk_from_hint(&self, energy: f64, hint: usize, last: usize) -> usize {
        let hint = hint.min(last - 1);
        let direction: isize = if energy > self.keys[hint] { 1 } else { -1 };
        let mut ind = hint as isize;
        loop {
            if ind < 0 {
                return 0;
            }
            if ind as usize >= last {
                return last - 1;
            }
            let i = ind as usize;
            if energy >= self.keys[i] && energy < self.keys[i + 1] {
                return i;
            }
            ind += direction;
        }
    }

    fn binary_search(&self, energy: f64, last: usize) -> usize {
        let mut ind = (self.keys.len() / 2) as isize;
        let mut width = (ind / 2).max(1);
        loop {
            let i = ind.clamp(0, last as isize - 1) as usize;
            if energy >= self.keys[i] && energy < self.keys[i + 1] {
                return i;
            }
            if energy < self.keys[i] {
                ind -= width;
            } else {
                ind += width;
            }
            width = (width / 2).max(1);
            ind = ind.clamp(0, last as isize - 1);
        }
    }

    fn interpolate(&self, index: usize, energy: f64) -> f64 {
        let (k0, k1) = (self.keys[index], self.keys[index + 1]);
        let (v0, v1) = (self.values[index], self.values[index + 1]);
        v0 + ((energy - k0) / (k1 - k0)) * (v1 - v0)
    }
}
