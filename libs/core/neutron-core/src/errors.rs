use thiserror::Error;

/// Errors raised by the low-level physics primitives.
///
/// Numerical-range conditions (an energy outside a cross-section table) are deliberately not
/// represented here: per the out-of-range policy, a lookup past the table bounds clamps to the
/// endpoint and increments a diagnostic counter rather than failing (SPEC_FULL.md §7 kind 4).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cross-section table must have at least 2 entries, found {0}")]
    CrossSectionTableTooSmall(usize),

    #[error("cross-section table energies must be strictly increasing (entry {index} ({prev}) >= entry {index_next} ({next}))")]
    CrossSectionTableNotMonotone {
        index: usize,
        prev: f64,
        index_next: usize,
        next: f64,
    },

    #[error("failed to reserve storage for {requested} particles")]
    ParticleAllocation { requested: usize },
}
