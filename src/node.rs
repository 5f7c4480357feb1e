//! Packed transition-array slot.
//!
//! Every slot is two `i32`s. Their meaning depends on sign and on context:
//!
//! - `check < 0`: the slot is free and `(-base, -check)` are the next and
//!   previous free slots of the circular free list.
//! - `check >= 0`: the slot is occupied and `check` is the parent index.
//! - For an occupied slot, `base >= 0` is a branching node whose child on
//!   byte `c` lives at `base ^ c`, and `base < 0` is a suffix node whose
//!   remaining key starts at tail offset `-base`.
//! - The terminator child of a branching node stores the key's value in
//!   `base` verbatim. It is never descended into, so the sign is free.
//!
//! Nothing outside this module looks at the raw integers.

/// Parent index sealed into the root once construction is finished. No
/// query ever walks from a node with this index, so the root can never be
/// mistaken for a child of itself.
const SEALED: i32 = -1;

#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Node {
    base: i32,
    check: i32,
}

/// Free-list view of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Slot {
    Free { next: u32, prev: u32 },
    Occupied { parent: u32 },
}

/// Trie view of an occupied, non-terminal slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Link {
    Branch { base: u32 },
    Suffix { tail: u32 },
}

impl Node {
    pub(crate) const BYTES: usize = std::mem::size_of::<Node>();

    /// A free slot threaded between `prev` and `next`.
    #[inline]
    pub(crate) fn free(next: u32, prev: u32) -> Self {
        debug_assert!(next > 0 && next <= i32::MAX as u32);
        debug_assert!(prev > 0 && prev <= i32::MAX as u32);
        Self {
            base: -(next as i32),
            check: -(prev as i32),
        }
    }

    /// Freshly claimed slot owned by `parent`. `base` is filled in later.
    #[inline]
    pub(crate) fn child_of(parent: u32) -> Self {
        debug_assert!(parent <= i32::MAX as u32);
        Self {
            base: 0,
            check: parent as i32,
        }
    }

    #[inline]
    pub(crate) fn slot(self) -> Slot {
        if self.check >= 0 {
            Slot::Occupied {
                parent: self.check as u32,
            }
        } else {
            Slot::Free {
                next: self.base.unsigned_abs(),
                prev: self.check.unsigned_abs(),
            }
        }
    }

    #[inline]
    pub(crate) fn is_free(self) -> bool {
        self.check < 0
    }

    #[inline]
    pub(crate) fn is_child_of(self, parent: u32) -> bool {
        self.check >= 0 && self.check as u32 == parent
    }

    #[inline]
    pub(crate) fn link(self) -> Link {
        if self.base >= 0 {
            Link::Branch {
                base: self.base as u32,
            }
        } else {
            Link::Suffix {
                tail: self.base.unsigned_abs(),
            }
        }
    }

    /// Value held by a terminator child.
    #[inline]
    pub(crate) fn value(self) -> i32 {
        self.base
    }

    #[inline]
    pub(crate) fn next_free(self) -> u32 {
        debug_assert!(self.is_free());
        self.base.unsigned_abs()
    }

    #[inline]
    pub(crate) fn prev_free(self) -> u32 {
        debug_assert!(self.is_free());
        self.check.unsigned_abs()
    }

    #[inline]
    pub(crate) fn set_next_free(&mut self, next: u32) {
        debug_assert!(self.is_free() && next > 0);
        self.base = -(next as i32);
    }

    #[inline]
    pub(crate) fn set_prev_free(&mut self, prev: u32) {
        debug_assert!(prev > 0);
        self.check = -(prev as i32);
    }

    #[inline]
    pub(crate) fn set_link(&mut self, link: Link) {
        self.base = match link {
            Link::Branch { base } => {
                debug_assert!(base <= i32::MAX as u32);
                base as i32
            }
            Link::Suffix { tail } => {
                debug_assert!(tail > 0 && tail <= i32::MAX as u32);
                -(tail as i32)
            }
        };
    }

    #[inline]
    pub(crate) fn set_value(&mut self, value: i32) {
        self.base = value;
    }

    /// Detach the root from the parent relation once the trie is complete.
    #[inline]
    pub(crate) fn seal(&mut self) {
        self.check = SEALED;
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.slot() {
            Slot::Free { next, prev } => write!(f, "Free({prev} <- -> {next})"),
            Slot::Occupied { parent } => write!(f, "{:?} <- {parent}", self.link()),
        }
    }
}
