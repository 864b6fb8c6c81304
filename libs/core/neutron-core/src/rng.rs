//! Counter-based random number generation (Threefry2x64).
//!
//! Stateless by construction: the same `(master_key, secondary_key, counter)` triple always
//! produces the same pair of uniforms, on any platform and independent of how many worker
//! threads are in flight. This is the property the transport driver's reproducibility
//! invariant rests on (SPEC_FULL.md §5, §8 scenario 5) — there is no RNG object to share or
//! synchronise, only a pure function.

/// Rotation constants for the 2-word, 64-bit-word Threefry variant (Random123's `R_64x2`).
const ROTATION: [u32; 8] = [16, 42, 12, 31, 16, 32, 24, 21];

const PARITY_CONSTANT: u64 = 0x1BD1_1BDA_A9FC_1A22;

/// The Threefry2x64 block cipher used as a counter-based RNG, 20 rounds (Random123 default for
/// the 2x64 variant).
fn threefry2x64(counter: [u64; 2], key: [u64; 2]) -> [u64; 2] {
    let ks2 = PARITY_CONSTANT ^ key[0] ^ key[1];
    let ks = [key[0], key[1], ks2];

    let mut x = [
        counter[0].wrapping_add(ks[0]),
        counter[1].wrapping_add(ks[1]),
    ];

    for round in 0..20u32 {
        let rot = ROTATION[(round % 8) as usize];
        x[0] = x[0].wrapping_add(x[1]);
        x[1] = x[1].rotate_left(rot) ^ x[0];

        if (round + 1) % 4 == 0 {
            let s = (round + 1) / 4;
            x[0] = x[0].wrapping_add(ks[(s % 3) as usize]);
            x[1] = x[1]
                .wrapping_add(ks[((s + 1) % 3) as usize])
                .wrapping_add(s as u64);
        }
    }

    x
}

/// Draws a pair of uniform reals in `(0, 1)` from a `(master_key, secondary_key, counter)`
/// triple. Mirrors the reference's `generate_random_numbers`: counter occupies the cipher's
/// first counter word, the second is always zero; master/secondary key occupy the cipher key.
pub fn generate_random_numbers(master_key: u64, secondary_key: u64, counter: u64) -> (f64, f64) {
    let raw = threefry2x64([counter, 0], [master_key, secondary_key]);

    const FACTOR: f64 = 1.0 / (u64::MAX as f64 + 1.0);
    const HALF_FACTOR: f64 = 0.5 * FACTOR;

    let rn0 = raw[0] as f64 * FACTOR + HALF_FACTOR;
    let rn1 = raw[1] as f64 * FACTOR + HALF_FACTOR;
    (rn0, rn1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outputs_strictly_between_zero_and_one() {
        for counter in 0..1000u64 {
            let (a, b) = generate_random_numbers(7, 42, counter);
            assert!(a > 0.0 && a < 1.0);
            assert!(b > 0.0 && b < 1.0);
        }
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = generate_random_numbers(1, 2, 3);
        let b = generate_random_numbers(1, 2, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_counters_diverge() {
        let a = generate_random_numbers(1, 2, 3);
        let b = generate_random_numbers(1, 2, 4);
        assert_ne!(a, b);
    }

    #[test]
    fn independent_of_secondary_key_ordering_collisions() {
        // distinct particle keys must not collapse to the same stream
        let a = generate_random_numbers(1, 5, 0);
        let b = generate_random_numbers(1, 6, 0);
        assert_ne!(a, b);
    }
}
