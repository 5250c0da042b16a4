//! Seeded random streams.
//!
//! Every draw in a career comes from a ChaCha8 stream keyed by the root seed, a purpose and a
//! position in time, so replaying the same operations on the same seed gives the same career.

use league_match::splitmix64;
use rand::distributions::WeightedIndex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// What a stream is used for. Streams of different purposes never share draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Purpose {
    Generate,
    Market,
    Youth,
    Development,
    Asking,
    Training,
    Signings,
}

impl Purpose {
    fn tag(self) -> u64 {
        match self {
            Purpose::Generate => 0x4745_4E45,
            Purpose::Market => 0x4D41_524B,
            Purpose::Youth => 0x594F_5554,
            Purpose::Development => 0x4445_5645,
            Purpose::Asking => 0x4153_4B49,
            Purpose::Training => 0x5452_4149,
            Purpose::Signings => 0x5349_474E,
        }
    }
}

/// Seed of the stream for `purpose` at (`season`, `step`).
pub(crate) fn stream_seed(root: u64, purpose: Purpose, season: u32, step: u32) -> u64 {
    let keyed = splitmix64(root ^ (purpose.tag() << 16));
    splitmix64(keyed ^ (u64::from(season) << 32) ^ u64::from(step))
}

pub(crate) fn stream(root: u64, purpose: Purpose, season: u32, step: u32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(stream_seed(root, purpose, season, step))
}

/// Normal draw. A negative or non-finite `sd` degenerates to `mean`.
pub(crate) fn gauss<R: Rng>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    match Normal::new(mean, sd) {
        Ok(normal) => normal.sample(rng),
        Err(_) => mean,
    }
}

/// Rounded normal draw clamped to `lo..=hi`.
pub(crate) fn gauss_u8<R: Rng>(rng: &mut R, mean: f64, sd: f64, lo: u8, hi: u8) -> u8 {
    gauss(rng, mean, sd).round().clamp(f64::from(lo), f64::from(hi)) as u8
}

/// Pick one of `items` with the paired weights; the first item when all weights are zero.
pub(crate) fn pick_weighted<R: Rng, T: Copy>(rng: &mut R, items: &[(T, f64)]) -> Option<T> {
    let idx = WeightedIndex::new(items.iter().map(|(_, w)| *w))
        .map_or(0, |dist| dist.sample(rng));
    items.get(idx).map(|(t, _)| *t)
}
