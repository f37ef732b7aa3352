//! Optimal-size calculators.

use crate::consts::{MAX_NUM_BITS, MAX_NUM_HASHES, MIN_NUM_HASHES};
use crate::errors::{BloomError, Result};
use std::f64::consts::LN_2;

pub(crate) fn check_accuracy(items: u64, fpp: f64) -> Result<()> {
    if items == 0 {
        return Err(BloomError::InvalidParameter("items must be greater than 0".into()));
    }
    if !(fpp > 0.0 && fpp < 1.0) {
        return Err(BloomError::InvalidParameter(format!("fpp must be in (0, 1), got {fpp}")));
    }
    Ok(())
}

/// `m = ceil(-n * ln(p) / ln(2)^2)`
pub fn optimal_num_bits(items: u64, fpp: f64) -> Result<u64> {
    check_accuracy(items, fpp)?;
    let bits = (-(items as f64) * fpp.ln() / (LN_2 * LN_2)).ceil();
    if bits > MAX_NUM_BITS as f64 {
        return Err(BloomError::InvalidParameter(format!(
            "{items} items at fpp {fpp} need {bits} bits, more than {MAX_NUM_BITS}"
        )));
    }
    Ok((bits as u64).max(1))
}

/// `k = round((m / n) * ln 2)`, at least 1.
pub fn optimal_num_hashes(items: u64, num_bits: u64) -> u64 {
    let k = (num_bits as f64 / items.max(1) as f64 * LN_2).round();
    k.clamp(MIN_NUM_HASHES as f64, MAX_NUM_HASHES as f64) as u64
}

/// Expected false-positive rate after `items` distinct insertions:
/// `(1 - e^(-k*n/m))^k`.
pub fn false_positive_rate(num_bits: u64, num_hashes: u64, items: u64) -> f64 {
    let (m, k, n) = (num_bits as f64, num_hashes as f64, items as f64);
    (1.0 - (-k * n / m).exp()).powf(k)
}
