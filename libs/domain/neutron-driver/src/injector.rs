//! Particle injection: places `N_local` particles uniformly in the source region, locates their
//! containing cell, and gives them an isotropic initial direction.
//!
//! Two fixed stream constants key the RNG draws apart from the event kernel's own counter space
//! (mirrors the reference's `generate_random_numbers(master_key, 0, ii, ...)` for position and
//! `generate_random_numbers(master_key, 1, ii, ...)` for direction) — the particle's own loop
//! index is the counter, so injection is reproducible independent of how many threads later
//! process the table.

use std::f64::consts::PI;

use neutron_core::particles::ParticleTable;
use neutron_core::rng::generate_random_numbers;
use neutron_domain::mesh::Mesh;
use tracing::instrument;

const POSITION_STREAM: u64 = 0;
const DIRECTION_STREAM: u64 = 1;

/// Resolves a source region's fractional mesh bounds to absolute `(x0, y0, w, h)` mesh
/// coordinates, then clips them to the mesh's own extent — the intersection the reference computes
/// in `initialise_neutral_data` between the configured source rectangle and the local patch.
pub fn resolve_source_bounds(mesh: &Mesh, fractional: (f64, f64, f64, f64)) -> (f64, f64, f64, f64) {
    let (fx, fy, fw, fh) = fractional;
    let width = mesh.width();
    let height = mesh.height();
    let x0 = (fx * width).clamp(0.0, width);
    let y0 = (fy * height).clamp(0.0, height);
    let x1 = ((fx + fw) * width).clamp(0.0, width);
    let y1 = ((fy + fh) * height).clamp(0.0, height);
    (x0, y0, (x1 - x0).max(0.0), (y1 - y0).max(0.0))
}

/// Locates the cell containing `(x, y)` by linear scan over the mesh's (possibly non-uniform)
/// edge arrays. Distinct loop variables for each axis scan — the reference's `inject_particles`
/// reuses a single shadowed loop variable across both axis searches, which makes its inner scans
/// silently read the wrong particle's coordinates; this keeps the two scans unambiguous.
fn locate_cell(mesh: &Mesh, x: f64, y: f64) -> (usize, usize) {
    let mut cellx = 0usize;
    for scan_x in 0..mesh.local_nx {
        let lo = mesh.edgex[scan_x + mesh.pad];
        let hi = mesh.edgex[scan_x + mesh.pad + 1];
        if x >= lo && x < hi {
            cellx = scan_x;
            break;
        }
        cellx = scan_x;
    }
    let mut celly = 0usize;
    for scan_y in 0..mesh.local_ny {
        let lo = mesh.edgey[scan_y + mesh.pad];
        let hi = mesh.edgey[scan_y + mesh.pad + 1];
        if y >= lo && y < hi {
            celly = scan_y;
            break;
        }
        celly = scan_y;
    }
    (cellx, celly)
}

/// Fills the first `count` rows of `particles` with freshly injected particles drawn uniformly
/// from `[x0, x0+w) × [y0, y0+h)`, with isotropic direction and `initial_energy`.
#[instrument(skip(particles, mesh), fields(count))]
pub fn inject_particles(
    particles: &mut ParticleTable,
    mesh: &Mesh,
    count: usize,
    source_bounds: (f64, f64, f64, f64),
    initial_energy: f64,
    dt: f64,
    injection_key: u64,
) {
    let (x0, y0, w, h) = source_bounds;
    particles.activate(count);

    for i in 0..count {
        let (u_x, u_y) = generate_random_numbers(injection_key, POSITION_STREAM, i as u64);
        let x = x0 + u_x * w;
        let y = y0 + u_y * h;
        let (cellx, celly) = locate_cell(mesh, x, y);

        let (u_theta, _) = generate_random_numbers(injection_key, DIRECTION_STREAM, i as u64);
        let theta = 2.0 * PI * u_theta;

        particles.x[i] = x;
        particles.y[i] = y;
        particles.omega_x[i] = theta.cos();
        particles.omega_y[i] = theta.sin();
        particles.energy[i] = initial_energy;
        particles.weight[i] = 1.0;
        particles.dt_to_census[i] = dt;
        particles.mfp_to_collision[i] = 0.0;
        particles.cellx[i] = cellx as i32;
        particles.celly[i] = celly as i32;
        particles.dead[i] = false;
        particles.key[i] = i as u64;
    }
}

/// Rounds a fractional particle count to the nearest integer, as the reference does when scaling
/// `nparticles` by the source/local-patch area ratio.
pub fn nlocal_particles(nparticles: u64, source_area: f64, local_area: f64) -> usize {
    if source_area <= 0.0 {
        return 0;
    }
    ((nparticles as f64) * (local_area / source_area) + 0.5) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_mesh() -> Mesh {
        Mesh::uniform_single_rank(4, 4, 4.0, 4.0, 1.0, 0.01)
    }

    #[test]
    fn injected_particles_land_inside_the_source_rectangle() {
        let mesh = small_mesh();
        let mut table = ParticleTable::with_capacity(50).unwrap();
        let bounds = (1.0, 1.0, 2.0, 2.0);
        inject_particles(&mut table, &mesh, 50, bounds, 14.1, 0.01, 7);

        for i in 0..50 {
            assert!(table.x[i] >= 1.0 && table.x[i] < 3.0);
            assert!(table.y[i] >= 1.0 && table.y[i] < 3.0);
            assert!(!table.dead[i]);
            assert_eq!(table.mfp_to_collision[i], 0.0);
        }
    }

    #[test]
    fn direction_cosines_are_unit_normalised() {
        let mesh = small_mesh();
        let mut table = ParticleTable::with_capacity(20).unwrap();
        inject_particles(&mut table, &mesh, 20, (0.0, 0.0, 4.0, 4.0), 1.0, 0.01, 3);

        for i in 0..20 {
            let norm = table.omega_x[i] * table.omega_x[i] + table.omega_y[i] * table.omega_y[i];
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn same_injection_key_reproduces_the_same_particles() {
        let mesh = small_mesh();
        let mut a = ParticleTable::with_capacity(10).unwrap();
        let mut b = ParticleTable::with_capacity(10).unwrap();
        inject_particles(&mut a, &mesh, 10, (0.0, 0.0, 4.0, 4.0), 2.0, 0.01, 99);
        inject_particles(&mut b, &mesh, 10, (0.0, 0.0, 4.0, 4.0), 2.0, 0.01, 99);

        for i in 0..10 {
            assert_eq!(a.x[i], b.x[i]);
            assert_eq!(a.y[i], b.y[i]);
            assert_eq!(a.omega_x[i], b.omega_x[i]);
        }
    }

    #[test]
    fn cell_indices_stay_within_the_local_mesh() {
        let mesh = small_mesh();
        let mut table = ParticleTable::with_capacity(30).unwrap();
        inject_particles(&mut table, &mesh, 30, (0.0, 0.0, 4.0, 4.0), 1.0, 0.01, 11);

        for i in 0..30 {
            assert!((table.cellx[i] as usize) < mesh.local_nx);
            assert!((table.celly[i] as usize) < mesh.local_ny);
        }
    }

    #[test]
    fn nlocal_particles_scales_by_area_fraction() {
        assert_eq!(nlocal_particles(1000, 4.0, 1.0), 250);
        assert_eq!(nlocal_particles(1000, 4.0, 4.0), 1000);
        assert_eq!(nlocal_particles(1000, 0.0, 1.0), 0);
    }
}
