use crate::errors::Result;
use crate::filter::BloomFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// How a filter should be sized. JSON form:
/// `{"mode":"size","bits":1024,"hashes":3}` or
/// `{"mode":"optimal","items":10000,"fpp":0.01}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FilterConfig {
    Size { bits: u64, hashes: u64 },
    Optimal { items: u64, fpp: f64 },
}

impl FilterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let c: FilterConfig = serde_json::from_str(&s)?;
        Ok(c)
    }

    pub fn build(&self) -> Result<BloomFilter> {
        match *self {
            FilterConfig::Size { bits, hashes } => BloomFilter::with_size(bits, hashes),
            FilterConfig::Optimal { items, fpp } => BloomFilter::with_accuracy(items, fpp),
        }
    }
}
