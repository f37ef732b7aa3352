// crates/bitbloom_core/src/consts.rs

use core::mem::size_of;

/// Bits per storage word.
pub const WORD_BITS: u64 = 64;
pub const WORD_BYTES: usize = size_of::<u64>();

/// m:u64 + k:u64
pub const HDR_SIZE: usize = 2 * WORD_BYTES;
/// SHA-384 output length.
pub const DIGEST_SIZE: usize = 48;
/// Smallest possible frame: header + digest, no words.
pub const MIN_FRAME_SIZE: usize = HDR_SIZE + DIGEST_SIZE;

pub const MIN_NUM_BITS: u64 = 1;
pub const MAX_NUM_BITS: u64 = 1 << 40; // 128 GiB of bits
pub const MIN_NUM_HASHES: u64 = 1;
pub const MAX_NUM_HASHES: u64 = u16::MAX as u64;

const _: () = { assert!(MAX_NUM_BITS % WORD_BITS == 0); };
