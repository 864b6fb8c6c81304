//! Physical and numerical constants.
//!
//! The reference implementation's constants lived in a header that the retrieval pack filtered
//! out (`neutral_data.h`). These values are chosen to be physically reasonable standard
//! constants rather than re-derived from any available file; the choice is recorded in
//! `DESIGN.md`.

/// Conversion factor from barns to cm², applied to microscopic cross sections before forming a
/// macroscopic cross section.
pub const BARNS: f64 = 1.0e-24;

/// Avogadro's number, mol⁻¹.
pub const AVOGADRO_NUMBER: f64 = 6.022_140_76e23;

/// Molar mass of the background medium, g/mol (hydrogen-like).
pub const MOLAR_MASS: f64 = 1.001;

/// eV to joule conversion.
pub const EV_TO_JOULES: f64 = 1.602_176_634e-19;

/// Neutral-particle (neutron) rest mass, kg.
pub const PARTICLE_MASS_KG: f64 = 1.674_927_498e-27;

/// Mass number `A` of the single scattering isotope.
pub const SCATTERING_MASS_NUMBER: f64 = 1.0;

/// Energy threshold below which a particle is culled (eV).
pub const MIN_ENERGY_OF_INTEREST_EV: f64 = 1.0e-2;

/// Correction subtracted from an open (lower) cell edge so a particle leaving in the negative
/// direction strictly exits the cell rather than stalling on the boundary.
pub const OPEN_BOUND_CORRECTION: f64 = 1.0e-14;

/// Default relative tolerance used when comparing a run's tally total against an expected
/// validation value.
pub const VALIDATION_TOLERANCE: f64 = 1.0e-5;

/// Particles processed together through one phase of the event kernel's block loop.
pub const DEFAULT_BLOCK_SIZE: usize = 32;

/// Particle-table over-allocation factor applied to the nominal particle count.
pub const ALLOCATION_FACTOR: f64 = 1.5;
