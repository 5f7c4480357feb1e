//! Free-slot pool embedded in the transition array.
//!
//! Unused slots form one circular doubly-linked list threaded through the
//! array itself (see [`Node::free`]). The pool hands out base offsets for
//! sibling sets, reusing free slots before growing the array by a block.

use tracing::trace;

use crate::error::BuildError;
use crate::node::Node;

/// Slots appended per growth step. XOR with a byte never leaves a 256-aligned
/// block, so every `base ^ c` of a placed base is in bounds.
pub(crate) const BLOCK_LEN: usize = 256;

/// Index of the root. Doubles as the "list is empty" head sentinel since the
/// root is never free.
pub(crate) const ROOT: u32 = 0;

/// Slot indices must stay representable as non-negative `i32`.
const MAX_SLOTS: usize = 1 << 31;

pub(crate) struct SlotPool {
    nodes: Vec<Node>,
    /// First free slot, or `ROOT` when none is free.
    head: u32,
}

impl SlotPool {
    /// Pool with `blocks` blocks already threaded into the free list.
    /// `capacity_hint` only pre-reserves memory.
    pub(crate) fn new(blocks: usize, capacity_hint: usize) -> Result<Self, BuildError> {
        let blocks = blocks.max(1);
        let capacity = blocks
            .saturating_mul(BLOCK_LEN)
            .max(capacity_hint.next_power_of_two())
            .min(MAX_SLOTS);
        let mut nodes = Vec::with_capacity(capacity);

        let last = BLOCK_LEN as u32 - 1;
        nodes.push(Node::child_of(ROOT));
        nodes.extend((1..=last).map(|i| {
            let next = if i == last { 1 } else { i + 1 };
            let prev = if i == 1 { last } else { i - 1 };
            Node::free(next, prev)
        }));

        let mut pool = Self { nodes, head: 1 };
        for _ in 1..blocks {
            pool.grow()?;
        }
        Ok(pool)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, index: u32) -> &mut Node {
        &mut self.nodes[index as usize]
    }

    /// Append one block and splice it in front of the current head, i.e. at
    /// the logical end of the list.
    pub(crate) fn grow(&mut self) -> Result<(), BuildError> {
        let old_len = self.nodes.len();
        let new_len = old_len + BLOCK_LEN;
        if new_len > MAX_SLOTS {
            return Err(BuildError::CapacityExceeded {
                what: "transition array slots",
            });
        }

        let first = old_len as u32;
        let last = new_len as u32 - 1;
        self.nodes.extend((first..=last).map(|i| {
            let next = if i == last { first } else { i + 1 };
            let prev = if i == first { last } else { i - 1 };
            Node::free(next, prev)
        }));

        if self.head == ROOT {
            self.head = first;
        } else {
            let head = self.head;
            let tail = self.nodes[head as usize].prev_free();
            self.nodes[first as usize].set_prev_free(tail);
            self.nodes[tail as usize].set_next_free(first);
            self.nodes[last as usize].set_next_free(head);
            self.nodes[head as usize].set_prev_free(last);
        }

        trace!(old_len, new_len, "grew transition array");
        Ok(())
    }

    /// Unlink a free slot and hand it to `parent`.
    pub(crate) fn claim(&mut self, slot: u32, parent: u32) {
        let node = self.nodes[slot as usize];
        debug_assert!(node.is_free(), "slot {slot} claimed twice");

        let next = node.next_free();
        let prev = node.prev_free();
        self.nodes[next as usize].set_prev_free(prev);
        self.nodes[prev as usize].set_next_free(next);

        if slot == self.head {
            self.head = if next == slot { ROOT } else { next };
        }
        self.nodes[slot as usize] = Node::child_of(parent);
    }

    /// Smallest-first search over the free list for a base whose every
    /// `base ^ edge` is free. Only bases pairing a free slot with the first
    /// edge are candidates. Falls back to a base in the next, not yet
    /// allocated block.
    pub(crate) fn find_base(&self, edges: &[u8]) -> u32 {
        debug_assert!(!edges.is_empty());
        let first = u32::from(edges[0]);

        if self.head != ROOT {
            let mut slot = self.head;
            loop {
                let base = slot ^ first;
                if self.fits(base, edges) {
                    return base;
                }
                slot = self.nodes[slot as usize].next_free();
                if slot == self.head {
                    break;
                }
            }
        }

        self.nodes.len() as u32 ^ first
    }

    fn fits(&self, base: u32, edges: &[u8]) -> bool {
        edges.iter().all(|&c| {
            self.nodes
                .get((base ^ u32::from(c)) as usize)
                .is_some_and(|n| n.is_free())
        })
    }

    /// Find a base for `edges`, growing if needed, and claim all target slots
    /// for `parent`.
    pub(crate) fn place(&mut self, edges: &[u8], parent: u32) -> Result<u32, BuildError> {
        let base = self.find_base(edges);
        while self.nodes.len() <= base as usize {
            self.grow()?;
        }
        for &c in edges {
            self.claim(base ^ u32::from(c), parent);
        }
        Ok(base)
    }

    /// Seal the root and release the array.
    pub(crate) fn into_nodes(mut self) -> Vec<Node> {
        self.nodes[ROOT as usize].seal();
        self.nodes
    }
}

#[cfg(test)]
impl SlotPool {
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Walk the free list forward and backward, checking both directions
    /// agree. Returns the free slots in list order.
    pub(crate) fn free_slots(&self) -> Vec<u32> {
        let mut out = Vec::new();
        if self.head == ROOT {
            return out;
        }
        let mut slot = self.head;
        loop {
            let node = self.nodes[slot as usize];
            assert!(node.is_free(), "occupied slot {slot} on free list");
            let next = node.next_free();
            assert_eq!(
                self.nodes[next as usize].prev_free(),
                slot,
                "broken back link at {next}"
            );
            out.push(slot);
            slot = next;
            if slot == self.head {
                break;
            }
            assert!(out.len() <= self.nodes.len(), "free list does not cycle");
        }
        out
    }
}
