//! Construction of a [`DoubleArray`] from a sorted key set.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::BuildError;
use crate::index::DoubleArray;
use crate::node::Link;
use crate::pool::{SlotPool, ROOT};
use crate::tail::{Tail, TERMINATOR};

/// Tuning knobs for [`Builder`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Blocks of 256 slots threaded into the free list before arranging.
    /// Values below 1 are treated as 1.
    pub initial_blocks: usize,
    /// Release spare capacity of the finished arrays.
    pub shrink_to_fit: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            initial_blocks: 1,
            shrink_to_fit: true,
        }
    }
}

/// Builds a [`DoubleArray`] from keys sorted in strictly increasing byte
/// order, paired positionally with their values.
///
/// ```rust
/// use doublearray::{BuildConfig, Builder};
///
/// let builder = Builder::with_config(BuildConfig {
///     initial_blocks: 4,
///     ..BuildConfig::default()
/// });
/// let da = builder.build(&["a", "ab"], &[1, 2]).unwrap();
/// assert_eq!(da.lookup("ab"), Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    config: BuildConfig,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BuildConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn build<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        values: &[i32],
    ) -> Result<DoubleArray, BuildError> {
        if let Err(error) = validate(keys, values) {
            debug!(%error, "rejected key set");
            return Err(error);
        }

        let mut arranger = Arranger {
            keys,
            values,
            pool: SlotPool::new(self.config.initial_blocks, keys.len())?,
            tail: Tail::new(),
            edges: Vec::with_capacity(256),
            runs: Vec::with_capacity(256),
        };
        arranger.run()?;

        let Arranger { pool, mut tail, .. } = arranger;
        let mut nodes = pool.into_nodes();
        let num_nodes = nodes.iter().skip(1).filter(|n| !n.is_free()).count();
        if self.config.shrink_to_fit {
            nodes.shrink_to_fit();
            tail.shrink_to_fit();
        }

        let da = DoubleArray::from_parts(nodes, tail, keys.len(), num_nodes);
        debug!(
            keys = da.num_keys(),
            nodes = da.num_nodes(),
            array_len = da.array_len(),
            tail_len = da.tail_len(),
            alloc_bytes = da.alloc_bytes(),
            "built double array"
        );
        Ok(da)
    }
}

/// One linear pass over the input. The first defective key wins; within a
/// key a reserved byte is reported before its ordering.
fn validate<K: AsRef<[u8]>>(keys: &[K], values: &[i32]) -> Result<(), BuildError> {
    if keys.is_empty() {
        return Err(BuildError::EmptyInput);
    }
    if keys.len() != values.len() {
        return Err(BuildError::LengthMismatch {
            keys: keys.len(),
            values: values.len(),
        });
    }

    let mut prev: Option<&[u8]> = None;
    for (index, key) in keys.iter().enumerate() {
        let key = key.as_ref();
        if let Some(position) = key.iter().position(|&b| b == TERMINATOR) {
            return Err(BuildError::ReservedByteInKey { index, position });
        }
        if let Some(prev) = prev {
            match key.cmp(prev) {
                Ordering::Less => return Err(BuildError::UnsortedKeys { index }),
                Ordering::Equal => return Err(BuildError::DuplicateKey { index }),
                Ordering::Greater => {}
            }
        }
        prev = Some(key);
    }
    Ok(())
}

/// Pending subtree: keys `begin..end` share their first `depth` bytes and
/// hang below slot `node`.
#[derive(Clone, Copy, Debug)]
struct Task {
    begin: usize,
    end: usize,
    depth: usize,
    node: u32,
}

struct Arranger<'a, K> {
    keys: &'a [K],
    values: &'a [i32],
    pool: SlotPool,
    tail: Tail,
    /// Scratch: edge bytes of the node being placed, ascending.
    edges: Vec<u8>,
    /// Scratch: `(edge byte, first key index)` per non-terminal edge.
    runs: Vec<(u8, usize)>,
}

impl<K: AsRef<[u8]>> Arranger<'_, K> {
    #[inline]
    fn key(&self, i: usize) -> &[u8] {
        self.keys[i].as_ref()
    }

    /// Preorder over the trie, smallest edge first. Children are pushed in
    /// reverse so the stack pops them in ascending order; the resulting
    /// placement sequence is that of a plain recursive descent.
    fn run(&mut self) -> Result<(), BuildError> {
        let mut stack = vec![Task {
            begin: 0,
            end: self.keys.len(),
            depth: 0,
            node: ROOT,
        }];
        while let Some(task) = stack.pop() {
            self.arrange(task, &mut stack)?;
        }
        Ok(())
    }

    fn arrange(&mut self, task: Task, stack: &mut Vec<Task>) -> Result<(), BuildError> {
        let Task {
            begin,
            end,
            depth,
            node,
        } = task;

        if begin + 1 == end {
            let suffix = &self.keys[begin].as_ref()[depth..];
            let tail = self.tail.push(suffix, self.values[begin])?;
            self.pool.node_mut(node).set_link(Link::Suffix { tail });
            return Ok(());
        }

        self.edges.clear();
        self.runs.clear();

        // Sorted unique keys: only the first key of the range can end here.
        let terminal = self.key(begin).len() == depth;
        let first = if terminal {
            self.edges.push(TERMINATOR);
            begin + 1
        } else {
            begin
        };

        for i in first..end {
            let c = self.key(i)[depth];
            let last = self.runs.last().map(|&(l, _)| l);
            if last != Some(c) {
                debug_assert!(last.map_or(true, |l| l < c), "keys out of order");
                self.runs.push((c, i));
            }
        }
        self.edges.extend(self.runs.iter().map(|&(c, _)| c));

        let base = self.pool.place(&self.edges, node)?;
        self.pool.node_mut(node).set_link(Link::Branch { base });
        if terminal {
            let value = self.values[begin];
            self.pool
                .node_mut(base ^ u32::from(TERMINATOR))
                .set_value(value);
        }

        for (j, &(c, child_begin)) in self.runs.iter().enumerate().rev() {
            let child_end = self.runs.get(j + 1).map_or(end, |&(_, b)| b);
            stack.push(Task {
                begin: child_begin,
                end: child_end,
                depth: depth + 1,
                node: base ^ u32::from(c),
            });
        }
        Ok(())
    }
}
