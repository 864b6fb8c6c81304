//! The transport event kernel: the per-particle state machine (collision / facet / census) and
//! the lock-free tally it deposits energy into. Operates purely on data validated upstream by
//! `neutron-domain` — it has no error type of its own.

pub mod event_kernel;
pub mod tally;

pub mod prelude {
    pub use crate::event_kernel::{process_particles, EventCounters};
    pub use crate::tally::TallyGrid;
}
