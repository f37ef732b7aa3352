//! Bloom filter engine: a fixed array of `m` bits probed `k` times per seed.
//!
//! Bits only ever go from 0 to 1, so a seed that was added always tests
//! positive. Shape (`m`, `k`) is fixed at construction and replaced only by
//! loading a serialized filter over an existing one.
use crate::consts::{MAX_NUM_BITS, MAX_NUM_HASHES, MIN_NUM_BITS, MIN_NUM_HASHES, WORD_BITS};
use crate::errors::{BloomError, Result};
use crate::hashing::{probes, SeedHash};
use crate::sizing;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BloomFilter {
    num_bits: u64,
    num_hashes: u64,
    /// popcount of `words`, kept in step with every mutation
    bits_set: u64,
    words: Vec<u64>,
}

#[inline]
pub(crate) fn words_for(num_bits: u64) -> usize {
    num_bits.div_ceil(WORD_BITS) as usize
}

pub(crate) fn check_shape(num_bits: u64, num_hashes: u64) -> std::result::Result<(), String> {
    if !(MIN_NUM_BITS..=MAX_NUM_BITS).contains(&num_bits) {
        return Err(format!("m must be in [{MIN_NUM_BITS}, {MAX_NUM_BITS}], got {num_bits}"));
    }
    if !(MIN_NUM_HASHES..=MAX_NUM_HASHES).contains(&num_hashes) {
        return Err(format!("k must be in [{MIN_NUM_HASHES}, {MAX_NUM_HASHES}], got {num_hashes}"));
    }
    Ok(())
}

impl BloomFilter {
    /// All-zero filter of `num_bits` bits probed `num_hashes` times per seed.
    pub fn with_size(num_bits: u64, num_hashes: u64) -> Result<Self> {
        check_shape(num_bits, num_hashes).map_err(BloomError::InvalidParameter)?;
        debug!(m = num_bits, k = num_hashes, "bloom filter created");
        Ok(Self {
            num_bits,
            num_hashes,
            bits_set: 0,
            words: vec![0u64; words_for(num_bits)],
        })
    }

    /// Filter sized for `items` distinct values at false-positive rate `fpp`.
    pub fn with_accuracy(items: u64, fpp: f64) -> Result<Self> {
        let m = sizing::optimal_num_bits(items, fpp)?;
        let k = sizing::optimal_num_hashes(items, m);
        Self::with_size(m, k)
    }

    /// Rebuilds a filter from raw words. Bits past `num_bits` must be clear.
    pub(crate) fn from_words(num_bits: u64, num_hashes: u64, words: Vec<u64>) -> std::result::Result<Self, String> {
        check_shape(num_bits, num_hashes)?;
        if words.len() != words_for(num_bits) {
            return Err(format!("{} words for m={num_bits}", words.len()));
        }
        let tail = num_bits % WORD_BITS;
        if tail != 0 {
            if let Some(last) = words.last() {
                if *last >> tail != 0 {
                    return Err("bits set past m".into());
                }
            }
        }
        let bits_set = words.iter().map(|w| w.count_ones() as u64).sum();
        Ok(Self { num_bits, num_hashes, bits_set, words })
    }

    /// Empty filter with the same shape, ready to be unioned with this one.
    pub fn new_compatible(&self) -> Self {
        Self {
            num_bits: self.num_bits,
            num_hashes: self.num_hashes,
            bits_set: 0,
            words: vec![0u64; self.words.len()],
        }
    }

    pub fn add_hash(&mut self, seed: u64) {
        for bit in probes(seed, self.num_bits, self.num_hashes) {
            self.set_bit(bit);
        }
    }

    pub fn add<T: SeedHash + ?Sized>(&mut self, value: &T) {
        self.add_hash(value.seed_hash())
    }

    pub fn contains_hash(&self, seed: u64) -> bool {
        probes(seed, self.num_bits, self.num_hashes).all(|bit| self.get_bit(bit))
    }

    pub fn contains<T: SeedHash + ?Sized>(&self, value: &T) -> bool {
        self.contains_hash(value.seed_hash())
    }

    /// Inserts `seed`, returning whether it already tested positive.
    pub fn check_and_add_hash(&mut self, seed: u64) -> bool {
        let mut present = true;
        for bit in probes(seed, self.num_bits, self.num_hashes) {
            present &= !self.set_bit(bit);
        }
        present
    }

    pub fn is_compatible(&self, other: &BloomFilter) -> bool {
        self.num_bits == other.num_bits && self.num_hashes == other.num_hashes
    }

    /// ORs `other` into `self`. Neither side changes on a shape mismatch.
    pub fn union(&mut self, other: &BloomFilter) -> Result<()> {
        if !self.is_compatible(other) {
            return Err(BloomError::IncompatibleFilters {
                left_bits: self.num_bits,
                left_hashes: self.num_hashes,
                right_bits: other.num_bits,
                right_hashes: other.num_hashes,
            });
        }
        let mut bits_set = 0;
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= *o;
            bits_set += w.count_ones() as u64;
        }
        self.bits_set = bits_set;
        debug!(m = self.num_bits, k = self.num_hashes, bits_set, "bloom filters merged");
        Ok(())
    }

    /// Estimated number of distinct seeds inserted: `-(m/k) * ln(1 - X/m)`.
    /// Infinite once every bit is set.
    pub fn estimate_count(&self) -> f64 {
        let (m, k, x) = (self.num_bits as f64, self.num_hashes as f64, self.bits_set as f64);
        -(m / k) * (1.0 - x / m).ln()
    }

    /// Current false-positive estimate from the fill ratio, `(X/m)^k`.
    pub fn estimated_fpp(&self) -> f64 {
        self.load_factor().powf(self.num_hashes as f64)
    }

    pub fn load_factor(&self) -> f64 {
        self.bits_set as f64 / self.num_bits as f64
    }

    pub fn num_bits(&self) -> u64 { self.num_bits }
    pub fn num_hashes(&self) -> u64 { self.num_hashes }
    pub fn bits_set(&self) -> u64 { self.bits_set }
    pub fn is_empty(&self) -> bool { self.bits_set == 0 }

    /// Backing words; bit `i` is `words[i / 64] >> (i % 64) & 1`.
    pub fn words(&self) -> &[u64] { &self.words }

    #[inline]
    fn get_bit(&self, bit: u64) -> bool {
        let idx = (bit / WORD_BITS) as usize;
        (self.words[idx] >> (bit % WORD_BITS)) & 1 != 0
    }

    /// Returns true if the bit was clear before.
    #[inline]
    fn set_bit(&mut self, bit: u64) -> bool {
        let idx = (bit / WORD_BITS) as usize;
        let mask = 1u64 << (bit % WORD_BITS);
        if self.words[idx] & mask != 0 {
            return false;
        }
        self.words[idx] |= mask;
        self.bits_set += 1;
        true
    }
}
