//! The transport driver (C6): the only component in this workspace that talks to the threading
//! substrate. Partitions the live particle table into exactly `T` contiguous, disjoint slices up
//! front and spawns exactly `T` OS threads, each processing its slice block-by-block through the
//! event kernel — a deliberate divergence from a work-stealing pool, since a scheduler that may
//! reassign work across threads at runtime would break the invariant that a particle's RNG
//! sequence is independent of thread count.

use std::sync::atomic::{AtomicU64, Ordering};

use neutron_core::constants::DEFAULT_BLOCK_SIZE;
use neutron_core::cross_section::CrossSectionTable;
use neutron_core::particles::{ParticleSliceMut, ParticleTable};
use neutron_domain::errors::ConfigError;
use neutron_domain::mesh::Mesh;
use neutron_domain::params::RunParameters;
use neutron_kernel::event_kernel::{process_particles, EventCounters};
use neutron_kernel::tally::TallyGrid;
use rayon::prelude::*;
use tracing::instrument;

use crate::injector::{inject_particles, nlocal_particles, resolve_source_bounds};

/// XORed into `master_key` to derive the injector's `injection_key`, so injection draws and the
/// kernel's transport draws for the same timestep never share a `(key, secondary_key, counter)`
/// triple. Without this, particle 0's injection-time position draw and its own first-event
/// initial-mfp draw inside the kernel would both resolve to `(master_key, 0, 0)`, since the
/// injector's position stream and particle 0's stable `key` are both 0. Any non-zero constant
/// guarantees `injection_key != master_key` for every `master_key`, which is all that's needed —
/// the two draws then live in disjoint keyspaces regardless of particle index.
const INJECTION_KEY_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Aggregated outcome of one timestep, additive across worker threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOutcome {
    pub collisions: u64,
    pub facet_crossings: u64,
    pub census_events: u64,
    pub live_particles: usize,
}

/// Owns the run's `master_key` counter. One `Driver` per run; `run_timestep` may be called
/// repeatedly, advancing `master_key` each time.
pub struct Driver {
    master_key: AtomicU64,
}

impl Driver {
    pub fn new(initial_master_key: u64) -> Self {
        Self {
            master_key: AtomicU64::new(initial_master_key),
        }
    }

    /// Splits `[0, len)` into `threads` contiguous ranges, the first `len % threads` of which get
    /// one extra row — mirrors `n_per = N/T` with the remainder distributed to the first
    /// `N mod T` threads.
    fn partition_sizes(len: usize, threads: usize) -> Vec<usize> {
        let threads = threads.max(1);
        let n_per = len / threads;
        let remainder = len % threads;
        (0..threads)
            .map(|t| if t < remainder { n_per + 1 } else { n_per })
            .collect()
    }

    /// Processes one slice's worth of particles, one block of
    /// [`neutron_core::constants::DEFAULT_BLOCK_SIZE`] at a time.
    fn run_slice(
        slice: &mut ParticleSliceMut<'_>,
        mesh: &Mesh,
        scatter_table: &CrossSectionTable,
        absorb_table: &CrossSectionTable,
        master_key: u64,
        tally: &TallyGrid,
        tally_mode: neutron_domain::params::TallyMode,
        inv_total_particles: f64,
    ) -> EventCounters {
        let mut counters = EventCounters::default();
        let len = slice.len();
        let mut start = 0;
        while start < len {
            let end = (start + DEFAULT_BLOCK_SIZE).min(len);
            let indices: Vec<usize> = (start..end).collect();
            let block_counters = process_particles(
                slice,
                &indices,
                mesh,
                scatter_table,
                absorb_table,
                master_key,
                tally,
                tally_mode,
                inv_total_particles,
            );
            counters.merge(&block_counters);
            start = end;
        }
        counters
    }

    /// Runs one timestep: injects a fresh particle population from the configured source,
    /// transports it to completion (census or death) across `params.threads` workers, and
    /// returns the aggregated event counters alongside the populated tally grid.
    #[instrument(skip(self, mesh, scatter_table, absorb_table, params), fields(nparticles = params.nparticles, threads = params.threads))]
    pub fn run_timestep(
        &self,
        mesh: &Mesh,
        scatter_table: &CrossSectionTable,
        absorb_table: &CrossSectionTable,
        params: &RunParameters,
    ) -> Result<(RunOutcome, TallyGrid), ConfigError> {
        let master_key = self.master_key.fetch_add(1, Ordering::SeqCst) + 1;

        let fractional = params.source.fractional_bounds()?;
        let source_bounds = resolve_source_bounds(mesh, fractional);
        let (_, _, source_w, source_h) = source_bounds;
        let source_area = source_w * source_h;
        // Single-rank mesh: the local patch always covers the whole domain, so the local/source
        // area ratio is always 1 and `count` reduces to `params.nparticles`.
        let count = nlocal_particles(params.nparticles, source_area, source_area)
            .min(params.nparticles as usize);

        let mut table = ParticleTable::with_capacity(count)
            .map_err(|_| ConfigError::MissingParameter("failed to allocate particle table"))?;
        inject_particles(
            &mut table,
            mesh,
            count,
            source_bounds,
            params.initial_energy,
            params.dt,
            master_key ^ INJECTION_KEY_SALT,
        );

        let tally = TallyGrid::zeroed(mesh.local_nx, mesh.local_ny);
        let inv_total_particles = if params.nparticles > 0 {
            1.0 / params.nparticles as f64
        } else {
            0.0
        };

        let mut counters = EventCounters::default();
        let sizes = Self::partition_sizes(table.len(), params.threads);

        if params.threads <= 1 || sizes.len() <= 1 {
            let mut slice = table.as_slice_mut();
            counters = Self::run_slice(
                &mut slice,
                mesh,
                scatter_table,
                absorb_table,
                master_key,
                &tally,
                params.tally_mode,
                inv_total_particles,
            );
        } else {
            let mut remaining = table.as_slice_mut();
            let mut slices = Vec::with_capacity(sizes.len());
            for &size in &sizes[..sizes.len() - 1] {
                let (head, tail) = remaining.split_at_mut(size);
                slices.push(head);
                remaining = tail;
            }
            slices.push(remaining);

            let thread_counters: Vec<EventCounters> = std::thread::scope(|scope| {
                let handles: Vec<_> = slices
                    .into_iter()
                    .map(|mut slice| {
                        scope.spawn(move || {
                            Self::run_slice(
                                &mut slice,
                                mesh,
                                scatter_table,
                                absorb_table,
                                master_key,
                                &tally,
                                params.tally_mode,
                                inv_total_particles,
                            )
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
            });

            // Order-independent reduction: safe to fan out with rayon exactly as the teacher does
            // for its own aggregate-counter combining, unlike the static per-thread partition above.
            counters = thread_counters
                .into_par_iter()
                .reduce(EventCounters::default, |mut a, b| {
                    a.merge(&b);
                    a
                });
        }

        let outcome = RunOutcome {
            collisions: counters.collisions,
            facet_crossings: counters.facets,
            census_events: counters.census,
            live_particles: table.live_count(),
        };

        Ok((outcome, tally))
    }
}
