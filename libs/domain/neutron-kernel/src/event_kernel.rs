//! The per-particle event state machine: stream to the next of collision/facet/census,
//! dispatch, repeat until the particle reaches census or dies.
//!
//! Particles are handed to [`process_particles`] in fixed-size blocks
//! ([`neutron_core::constants::DEFAULT_BLOCK_SIZE`]) by the transport driver; within a block
//! each particle is carried to completion independently. The RNG counter a particle consumes is
//! a function of *its own* local event-round number, never of which thread or block processed
//! it — combined with the particle's stable `key` as the RNG's secondary key, this is what
//! makes a particle's trajectory independent of thread count (SPEC_FULL.md §4.5.3, §5).

use neutron_core::constants::{
    EV_TO_JOULES, MIN_ENERGY_OF_INTEREST_EV, PARTICLE_MASS_KG, SCATTERING_MASS_NUMBER,
};
use neutron_core::cross_section::{CrossSectionTable, LookupHint, NO_HINT};
use neutron_core::geometry::{distance_to_facet, FacetAxis};
use neutron_core::particles::ParticleSliceMut;
use neutron_core::rng::generate_random_numbers;
use neutron_domain::mesh::Mesh;
use neutron_domain::params::TallyMode;
use tracing::instrument;

use crate::tally::TallyGrid;

/// Aggregated event counts for one call to [`process_particles`]; additive across threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventCounters {
    pub collisions: u64,
    pub facets: u64,
    pub census: u64,
}

impl EventCounters {
    pub fn merge(&mut self, other: &Self) {
        self.collisions += other.collisions;
        self.facets += other.facets;
        self.census += other.census;
    }
}

struct Scratch {
    scatter_hint: LookupHint,
    absorb_hint: LookupHint,
    energy_deposition: f64,
    event_round: u64,
    needs_initial_mfp: bool,
}

impl Default for Scratch {
    fn default() -> Self {
        Self {
            scatter_hint: NO_HINT,
            absorb_hint: NO_HINT,
            energy_deposition: 0.0,
            event_round: 0,
            needs_initial_mfp: true,
        }
    }
}

/// Streamed-segment energy-deposition contribution. Mirrors the reference's
/// `calculate_energy_deposition`: absorption heating is zero (the absorbed particle's energy is
/// not re-emitted), scattering heating is the average post-scatter energy weighted by the
/// fraction of interactions that are scatters.
fn energy_deposition(
    weight: f64,
    path_length: f64,
    energy: f64,
    micro_absorb: f64,
    micro_total: f64,
    number_density: f64,
) -> f64 {
    let a = SCATTERING_MASS_NUMBER;
    let absorb_fraction = micro_absorb / micro_total;
    let average_exit_energy_scatter = energy * ((a * a + a + 1.0) / ((a + 1.0) * (a + 1.0)));
    let heating = energy - (1.0 - absorb_fraction) * average_exit_energy_scatter;
    weight * path_length * (micro_total * neutron_core::constants::BARNS) * heating * number_density
}

fn speed_for_energy(energy: f64) -> f64 {
    (2.0 * energy * EV_TO_JOULES / PARTICLE_MASS_KG).sqrt()
}

/// Processes every particle in `indices` to completion (census or death), mutating the particle
/// table in place and accumulating energy deposition into `tally`.
#[instrument(skip_all, fields(block_size = indices.len()))]
pub fn process_particles(
    particles: &mut ParticleSliceMut<'_>,
    indices: &[usize],
    mesh: &Mesh,
    scatter_table: &CrossSectionTable,
    absorb_table: &CrossSectionTable,
    master_key: u64,
    tally: &TallyGrid,
    tally_mode: TallyMode,
    inv_total_particles: f64,
) -> EventCounters {
    let mut counters = EventCounters::default();

    for &idx in indices {
        if particles.dead[idx] {
            continue;
        }
        let mut scratch = Scratch::default();

        loop {
            let cellx = particles.cellx[idx] as usize;
            let celly = particles.celly[idx] as usize;
            let density = mesh.density_at(cellx, celly);
            let number_density =
                density * neutron_core::constants::AVOGADRO_NUMBER / neutron_core::constants::MOLAR_MASS;

            let energy = particles.energy[idx];
            let (micro_scatter, next_scatter_hint) = scatter_table.lookup(energy, scratch.scatter_hint);
            let (micro_absorb, next_absorb_hint) = absorb_table.lookup(energy, scratch.absorb_hint);
            scratch.scatter_hint = next_scatter_hint;
            scratch.absorb_hint = next_absorb_hint;

            let macro_scatter = number_density * micro_scatter * neutron_core::constants::BARNS;
            let macro_absorb = number_density * micro_absorb * neutron_core::constants::BARNS;
            let cell_mfp = 1.0 / (macro_scatter + macro_absorb);
            let speed = speed_for_energy(energy);

            if scratch.needs_initial_mfp {
                let (u_initial, _) = generate_random_numbers(master_key, particles.key[idx], scratch.event_round);
                scratch.event_round += 1;
                particles.mfp_to_collision[idx] = -u_initial.ln() / macro_scatter;
                scratch.needs_initial_mfp = false;
            }

            let (lo_x, hi_x, lo_y, hi_y) = mesh.cell_bounds(cellx, celly);
            let facet = distance_to_facet(
                particles.x[idx],
                particles.y[idx],
                particles.omega_x[idx],
                particles.omega_y[idx],
                speed,
                lo_x,
                hi_x,
                lo_y,
                hi_y,
            );

            let distance_to_collision = particles.mfp_to_collision[idx] * cell_mfp;
            let distance_to_census = speed * particles.dt_to_census[idx];

            if distance_to_collision < facet.distance && distance_to_collision < distance_to_census {
                counters.collisions += 1;
                handle_collision(
                    particles,
                    idx,
                    distance_to_collision,
                    number_density,
                    micro_scatter,
                    micro_absorb,
                    speed,
                    master_key,
                    scatter_table,
                    absorb_table,
                    &mut scratch,
                );
                if particles.dead[idx] {
                    flush(&mut scratch, idx, particles, tally, inv_total_particles);
                    break;
                }
            } else if facet.distance < distance_to_census {
                counters.facets += 1;
                handle_facet(
                    particles,
                    idx,
                    &facet,
                    cell_mfp,
                    speed,
                    mesh,
                    number_density,
                    micro_scatter,
                    micro_absorb,
                    tally_mode,
                    &mut scratch,
                    tally,
                    inv_total_particles,
                );
            } else {
                counters.census += 1;
                handle_census(
                    particles,
                    idx,
                    distance_to_census,
                    cell_mfp,
                    number_density,
                    micro_scatter,
                    micro_absorb,
                    &mut scratch,
                    tally,
                    inv_total_particles,
                );
                break;
            }
        }
    }

    tracing::trace!(
        collisions = counters.collisions,
        facets = counters.facets,
        census = counters.census,
        "block drained"
    );
    counters
}

/// Flushes the accumulated, un-normalised energy deposition for `idx`'s current cell into the
/// shared tally grid, scaling by `inv_total_particles` at the point of accumulation (mirrors the
/// reference's `update_tallies`, which applies this scale only when writing into the shared
/// array, not while accumulating per-particle).
fn flush(scratch: &mut Scratch, idx: usize, particles: &ParticleSliceMut<'_>, tally: &TallyGrid, inv_total_particles: f64) {
    if scratch.energy_deposition == 0.0 {
        return;
    }
    let cellx = particles.cellx[idx] as usize;
    let celly = particles.celly[idx] as usize;
    let scratch_energy = scratch.energy_deposition * inv_total_particles;
    tally.add(cellx, celly, scratch_energy);
    scratch.energy_deposition = 0.0;
}

#[allow(clippy::too_many_arguments)]
fn handle_collision(
    particles: &mut ParticleSliceMut<'_>,
    idx: usize,
    distance: f64,
    number_density: f64,
    micro_scatter: f64,
    micro_absorb: f64,
    speed: f64,
    master_key: u64,
    scatter_table: &CrossSectionTable,
    absorb_table: &CrossSectionTable,
    scratch: &mut Scratch,
) {
    scratch.energy_deposition += energy_deposition(
        particles.weight[idx],
        distance,
        particles.energy[idx],
        micro_absorb,
        micro_scatter + micro_absorb,
        number_density,
    );

    particles.x[idx] += distance * particles.omega_x[idx];
    particles.y[idx] += distance * particles.omega_y[idx];

    let p_absorb = micro_absorb / (micro_scatter + micro_absorb);

    let counter = scratch.event_round * 2;
    let (u1, u2) = generate_random_numbers(master_key, particles.key[idx], counter);
    scratch.event_round += 1;

    if u1 < p_absorb {
        particles.weight[idx] *= 1.0 - p_absorb;
        if particles.energy[idx] < MIN_ENERGY_OF_INTEREST_EV {
            particles.dead[idx] = true;
            return;
        }
    } else {
        let a = SCATTERING_MASS_NUMBER;
        let mu_cm = 1.0 - 2.0 * u2;
        let e_old = particles.energy[idx];
        let e_new = e_old * (a * a + 2.0 * a * mu_cm + 1.0) / ((a + 1.0) * (a + 1.0));

        let cos_theta = 0.5 * ((a + 1.0) * (e_new / e_old).sqrt() - (a - 1.0) * (e_old / e_new).sqrt());
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();

        let omega_x = particles.omega_x[idx];
        let omega_y = particles.omega_y[idx];
        particles.omega_x[idx] = omega_x * cos_theta - omega_y * sin_theta;
        particles.omega_y[idx] = omega_x * sin_theta + omega_y * cos_theta;
        particles.energy[idx] = e_new;
    }

    let (new_micro_scatter, next_scatter_hint) =
        scatter_table.lookup(particles.energy[idx], scratch.scatter_hint);
    let (new_micro_absorb, next_absorb_hint) =
        absorb_table.lookup(particles.energy[idx], scratch.absorb_hint);
    scratch.scatter_hint = next_scatter_hint;
    scratch.absorb_hint = next_absorb_hint;

    let new_macro_scatter = number_density * new_micro_scatter * neutron_core::constants::BARNS;
    let _ = new_micro_absorb;

    let resample_counter = scratch.event_round * 2 - 1;
    let (u_resample, _) = generate_random_numbers(master_key, particles.key[idx], resample_counter);
    particles.mfp_to_collision[idx] = -u_resample.ln() / new_macro_scatter;
    particles.dt_to_census[idx] -= distance / speed;
}

#[allow(clippy::too_many_arguments)]
fn handle_facet(
    particles: &mut ParticleSliceMut<'_>,
    idx: usize,
    facet: &neutron_core::geometry::DistanceToFacet,
    cell_mfp: f64,
    speed: f64,
    mesh: &Mesh,
    number_density: f64,
    micro_scatter: f64,
    micro_absorb: f64,
    tally_mode: TallyMode,
    scratch: &mut Scratch,
    tally: &TallyGrid,
    inv_total_particles: f64,
) {
    let segment_deposition = energy_deposition(
        particles.weight[idx],
        facet.distance,
        particles.energy[idx],
        micro_absorb,
        micro_scatter + micro_absorb,
        number_density,
    );
    scratch.energy_deposition += segment_deposition;

    if tally_mode == TallyMode::OnFacetExit {
        flush(scratch, idx, particles, tally, inv_total_particles);
    }

    particles.mfp_to_collision[idx] -= facet.distance / cell_mfp;
    particles.dt_to_census[idx] -= facet.distance / speed;

    particles.x[idx] += facet.distance * particles.omega_x[idx];
    particles.y[idx] += facet.distance * particles.omega_y[idx];

    let cellx = particles.cellx[idx] as usize;
    let celly = particles.celly[idx] as usize;

    match facet.axis {
        FacetAxis::X => {
            if particles.omega_x[idx] > 0.0 {
                if mesh.is_global_upper_x(cellx) {
                    particles.omega_x[idx] = -particles.omega_x[idx];
                } else {
                    particles.cellx[idx] += 1;
                }
            } else if particles.omega_x[idx] < 0.0 {
                if mesh.is_global_lower_x(cellx) {
                    particles.omega_x[idx] = -particles.omega_x[idx];
                } else {
                    particles.cellx[idx] -= 1;
                }
            }
        }
        FacetAxis::Y => {
            if particles.omega_y[idx] > 0.0 {
                if mesh.is_global_upper_y(celly) {
                    particles.omega_y[idx] = -particles.omega_y[idx];
                } else {
                    particles.celly[idx] += 1;
                }
            } else if particles.omega_y[idx] < 0.0 {
                if mesh.is_global_lower_y(celly) {
                    particles.omega_y[idx] = -particles.omega_y[idx];
                } else {
                    particles.celly[idx] -= 1;
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_census(
    particles: &mut ParticleSliceMut<'_>,
    idx: usize,
    distance: f64,
    cell_mfp: f64,
    number_density: f64,
    micro_scatter: f64,
    micro_absorb: f64,
    scratch: &mut Scratch,
    tally: &TallyGrid,
    inv_total_particles: f64,
) {
    particles.x[idx] += distance * particles.omega_x[idx];
    particles.y[idx] += distance * particles.omega_y[idx];
    particles.mfp_to_collision[idx] -= distance / cell_mfp;

    scratch.energy_deposition += energy_deposition(
        particles.weight[idx],
        distance,
        particles.energy[idx],
        micro_absorb,
        micro_scatter + micro_absorb,
        number_density,
    );
    flush(scratch, idx, particles, tally, inv_total_particles);
    particles.dt_to_census[idx] = 0.0;
}
