//! Seed management for the river pass
//!
//! Each noise field consulted by the pass gets its own seed. Seeds are drawn
//! from the pass RNG up front, so later stages never touch the RNG again and
//! can be re-run without changing their output.

use rand::Rng;

/// Seeds for the noise fields of one river pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RiverSeeds {
    /// Lateral bending of channel curves
    pub bend: u32,
    /// Channel width modulation
    pub width: u32,
    /// Deep/shallow split inside channels
    pub shallow: u32,
    /// Bank band width
    pub bank: u32,
}

impl RiverSeeds {
    /// Draw all seeds from the pass RNG, in a fixed order.
    pub fn from_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            bend: rng.gen(),
            width: rng.gen(),
            shallow: rng.gen(),
            bank: rng.gen(),
        }
    }

    /// Derive all seeds from a single master value.
    pub fn from_master(master: u64) -> Self {
        Self {
            bend: derive_seed(master, 1),
            width: derive_seed(master, 2),
            shallow: derive_seed(master, 3),
            bank: derive_seed(master, 4),
        }
    }
}

/// SplitMix64 finalizer over `master` and a stream index.
/// Stable across platforms and compiler versions.
fn derive_seed(master: u64, stream: u64) -> u32 {
    let mut z = master.wrapping_add(stream.wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 32) as u32
}

impl std::fmt::Display for RiverSeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "RiverSeeds {{ bend: {}, width: {}, shallow: {}, bank: {} }}",
            self.bend, self.width, self.shallow, self.bank
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_rng_draw_is_deterministic() {
        let a = RiverSeeds::from_rng(&mut ChaCha8Rng::seed_from_u64(9));
        let b = RiverSeeds::from_rng(&mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
    }

    #[test]
    fn test_streams_differ() {
        let seeds = RiverSeeds::from_master(12345);
        assert_ne!(seeds.bend, seeds.width);
        assert_ne!(seeds.width, seeds.shallow);
        assert_ne!(seeds.shallow, seeds.bank);
        assert_eq!(seeds, RiverSeeds::from_master(12345));
    }
}
