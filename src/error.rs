use thiserror::Error;

/// Reasons a key set cannot be turned into a [`DoubleArray`](crate::DoubleArray).
///
/// Indices refer to positions in the `keys` slice passed to the builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("keys must not be empty")]
    EmptyInput,

    #[error("got {keys} keys but {values} values")]
    LengthMismatch { keys: usize, values: usize },

    #[error("key {index} sorts before the key preceding it")]
    UnsortedKeys { index: usize },

    #[error("key {index} is a duplicate of the key preceding it")]
    DuplicateKey { index: usize },

    #[error("key {index} contains the reserved terminator byte 0 at position {position}")]
    ReservedByteInKey { index: usize, position: usize },

    #[error("{what} exceed the 31-bit addressable range")]
    CapacityExceeded { what: &'static str },
}
