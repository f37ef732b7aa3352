//! Bloom filter with an integrity-checked binary/text serialization.
//!
//! ```
//! use bitbloom_core::BloomFilter;
//!
//! let mut f = BloomFilter::with_accuracy(1000, 0.01).unwrap();
//! f.add("apple");
//! f.add_hash(42);
//! assert!(f.contains("apple"));
//! assert!(f.contains_hash(42));
//!
//! let g = BloomFilter::from_text(&f.to_text()).unwrap();
//! assert_eq!(f, g);
//! ```
pub mod consts;
pub mod errors;
pub mod utils;
pub mod hashing;
pub mod sizing;
pub mod filter;
pub mod codec;
pub mod config;

pub use config::FilterConfig;
pub use errors::{BloomError, Result};
pub use filter::BloomFilter;
pub use hashing::SeedHash;
