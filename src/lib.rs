//! # doublearray
//!
//! A compact, immutable map from byte strings to `i32` values, stored as a
//! double-array trie.
//!
//! The trie is packed into two flat arrays: a transition array of 8-byte
//! `(base, check)` slots, where the child of node `n` on byte `c` lives at
//! `base[n] ^ c`, and a tail buffer holding the remaining bytes of every key
//! whose subtree contains nothing else. The index is built once from keys in
//! strictly increasing byte order and answers exact, common-prefix and
//! predictive queries.
//!
//! ## Example
//!
//! ```rust
//! use doublearray::DoubleArray;
//!
//! let keys = ["Aru", "Bocci", "Kai", "Kako", "Nako", "Nakosuke", "Sotca"];
//! let values = [1, 2, 3, 4, 5, 6, 7];
//! let da = DoubleArray::build(&keys, &values).unwrap();
//!
//! assert_eq!(da.lookup("Bocci"), Some(2));
//! assert_eq!(da.lookup("Peko"), None);
//!
//! let (found, values) = da.predictive_lookup("Ka");
//! assert_eq!(found, vec![b"Kai".to_vec(), b"Kako".to_vec()]);
//! assert_eq!(values, vec![3, 4]);
//!
//! assert_eq!(da.iter().count(), 7);
//! ```
//!
//! Keys must not contain the byte `0`, which marks the end of a key.

#![forbid(unsafe_code)]

mod builder;
mod error;
mod index;
mod node;
mod pool;
mod tail;

pub use builder::{BuildConfig, Builder};
pub use error::BuildError;
pub use index::{DoubleArray, Predictive, PrefixIter, Stats};

#[cfg(test)]
mod proptests;
