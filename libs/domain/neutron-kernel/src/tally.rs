//! Thread-shared, lock-free per-cell energy-deposition tally.
//!
//! Rust has no stable atomic `f64::fetch_add`, so each cell is stored as its bit-pattern in an
//! `AtomicU64` and updated with a compare-and-swap loop — the portable variant the reference
//! shows alongside its compiler-atomic one (`update_tallies`'s `MANUAL_ATOMIC` branch). No
//! locks, matching the teacher's atomics-over-locks preference for shared aggregate state.

use std::sync::atomic::{AtomicU64, Ordering};

pub struct TallyGrid {
    cells: Vec<AtomicU64>,
    stride: usize,
}

impl TallyGrid {
    pub fn zeroed(nx: usize, ny: usize) -> Self {
        let mut cells = Vec::with_capacity(nx * ny);
        cells.resize_with(nx * ny, || AtomicU64::new(0.0f64.to_bits()));
        Self { cells, stride: nx }
    }

    /// Atomically adds `delta` to cell `(cellx, celly)`.
    pub fn add(&self, cellx: usize, celly: usize, delta: f64) {
        let cell = &self.cells[celly * self.stride + cellx];
        let mut current = cell.load(Ordering::Relaxed);
        loop {
            let updated = (f64::from_bits(current) + delta).to_bits();
            match cell.compare_exchange_weak(current, updated, Ordering::AcqRel, Ordering::Relaxed) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    pub fn get(&self, cellx: usize, celly: usize) -> f64 {
        f64::from_bits(self.cells[celly * self.stride + cellx].load(Ordering::Relaxed))
    }

    pub fn total(&self) -> f64 {
        self.cells
            .iter()
            .map(|c| f64::from_bits(c.load(Ordering::Relaxed)))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn zero_particles_is_a_no_op_tally() {
        let tally = TallyGrid::zeroed(2, 2);
        assert_eq!(tally.total(), 0.0);
    }

    #[test]
    fn concurrent_adds_to_the_same_cell_are_conserved() {
        let tally = TallyGrid::zeroed(1, 1);
        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        tally.add(0, 0, 1.0);
                    }
                });
            }
        });
        assert_eq!(tally.get(0, 0), 8000.0);
    }

    #[test]
    fn distinct_cells_are_independent() {
        let tally = TallyGrid::zeroed(2, 1);
        tally.add(0, 0, 3.0);
        tally.add(1, 0, 5.0);
        assert_eq!(tally.get(0, 0), 3.0);
        assert_eq!(tally.get(1, 0), 5.0);
        assert_eq!(tally.total(), 8.0);
    }
}
