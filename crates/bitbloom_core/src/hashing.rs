//! Seed capability and double-hashing probe derivation.
//!
//! Callers reduce their values to a 64-bit seed through [`SeedHash`]; the
//! filter never inspects values directly. From one seed the filter derives
//! `k` probe positions as `(h1 + i*h2) mod m` for `i in 0..k`, where
//!
//! - `h1 = seed`
//! - `h2 = LE u64 of BLAKE3(seed.to_be_bytes())[0..8]`, forced odd
//!
//! so the probe sequence is fixed bit-for-bit across platforms and releases.

/// Maps a value to the 64-bit seed fed to the filter.
pub trait SeedHash {
    fn seed_hash(&self) -> u64;
}

/// Values that already are seeds.
impl SeedHash for u64 {
    #[inline]
    fn seed_hash(&self) -> u64 { *self }
}

impl SeedHash for [u8] {
    #[inline]
    fn seed_hash(&self) -> u64 { xxhash_rust::xxh3::xxh3_64(self) }
}

impl SeedHash for str {
    #[inline]
    fn seed_hash(&self) -> u64 { self.as_bytes().seed_hash() }
}

impl SeedHash for String {
    #[inline]
    fn seed_hash(&self) -> u64 { self.as_str().seed_hash() }
}

impl SeedHash for Vec<u8> {
    #[inline]
    fn seed_hash(&self) -> u64 { self.as_slice().seed_hash() }
}

impl<T: SeedHash + ?Sized> SeedHash for &T {
    #[inline]
    fn seed_hash(&self) -> u64 { (**self).seed_hash() }
}

/// `(h1, h2)` for a seed. `h2` is odd so consecutive probes never collapse
/// onto `h1` when `m` is a power of two.
#[inline]
pub fn probe_pair(seed: u64) -> (u64, u64) {
    let dig = blake3::hash(&seed.to_be_bytes());
    let mut half = [0u8; 8];
    half.copy_from_slice(&dig.as_bytes()[0..8]);
    (seed, u64::from_le_bytes(half) | 1)
}

/// Probe positions for `seed` in a filter of `m` bits with `k` hashes.
pub fn probes(seed: u64, m: u64, k: u64) -> impl Iterator<Item = u64> {
    let (h1, h2) = probe_pair(seed);
    let (h1, h2, m) = (h1 as u128, h2 as u128, m as u128);
    (0..k).map(move |i| ((h1 + (i as u128) * h2) % m) as u64)
}
