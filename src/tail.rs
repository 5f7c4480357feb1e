//! Suffix buffer for single-key subtrees.
//!
//! Layout per entry: `[suffix bytes][TERMINATOR][value: i32 little endian]`.
//! Offset 0 holds a lone sentinel byte so that every real entry starts at a
//! positive offset and `-offset` is unambiguous in a node's `base`.

use crate::error::BuildError;

/// End-of-key marker, both as a trie edge and inside the tail.
pub(crate) const TERMINATOR: u8 = 0;

const VALUE_BYTES: usize = 4;

#[derive(Clone)]
pub(crate) struct Tail {
    bytes: Vec<u8>,
}

impl Tail {
    pub(crate) fn new() -> Self {
        Self {
            bytes: vec![TERMINATOR],
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.bytes.shrink_to_fit();
    }

    /// Append an entry and return the offset its suffix starts at.
    pub(crate) fn push(&mut self, suffix: &[u8], value: i32) -> Result<u32, BuildError> {
        debug_assert!(!suffix.contains(&TERMINATOR));
        let offset = self.bytes.len();
        let end = offset + suffix.len() + 1 + VALUE_BYTES;
        if end > i32::MAX as usize {
            return Err(BuildError::CapacityExceeded { what: "tail bytes" });
        }

        self.bytes.reserve(end - offset);
        self.bytes.extend_from_slice(suffix);
        self.bytes.push(TERMINATOR);
        self.bytes.extend_from_slice(&value.to_le_bytes());
        Ok(offset as u32)
    }

    /// Stored suffix at `offset` (terminator excluded) and its value.
    pub(crate) fn entry(&self, offset: u32) -> (&[u8], i32) {
        let start = offset as usize;
        let rest = &self.bytes[start..];
        let len = rest
            .iter()
            .position(|&b| b == TERMINATOR)
            .unwrap_or(rest.len());
        (&rest[..len], self.value_at(start + len + 1))
    }

    /// Value of the entry at `offset` if its suffix is exactly `rest`.
    /// `rest` must not contain the terminator.
    pub(crate) fn value_if_eq(&self, offset: u32, rest: &[u8]) -> Option<i32> {
        let start = offset as usize;
        let end = start + rest.len();
        if self.bytes.get(start..end)? != rest || self.bytes.get(end) != Some(&TERMINATOR) {
            return None;
        }
        Some(self.value_at(end + 1))
    }

    fn value_at(&self, at: usize) -> i32 {
        let mut raw = [0u8; VALUE_BYTES];
        raw.copy_from_slice(&self.bytes[at..at + VALUE_BYTES]);
        i32::from_le_bytes(raw)
    }
}
