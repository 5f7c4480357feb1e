//! The finished, read-only index and its traversals.

use crate::builder::Builder;
use crate::error::BuildError;
use crate::node::{Link, Node};
use crate::pool::ROOT;
use crate::tail::{Tail, TERMINATOR};

/// Immutable map from byte strings to `i32` values, stored as a
/// double-array trie with single-key subtrees collapsed into a tail buffer.
///
/// Built once by [`Builder`] (or [`DoubleArray::build`]) and then only read,
/// so it can be shared across threads freely.
#[derive(Clone)]
pub struct DoubleArray {
    nodes: Vec<Node>,
    tail: Tail,
    num_keys: usize,
    num_nodes: usize,
}

/// Size counters of a built index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub num_keys: usize,
    /// Occupied non-root slots, terminator slots included.
    pub num_nodes: usize,
    pub array_len: usize,
    pub tail_len: usize,
    pub alloc_bytes: usize,
}

impl DoubleArray {
    /// Build with the default [`BuildConfig`](crate::BuildConfig).
    pub fn build<K: AsRef<[u8]>>(keys: &[K], values: &[i32]) -> Result<Self, BuildError> {
        Builder::new().build(keys, values)
    }

    pub(crate) fn from_parts(nodes: Vec<Node>, tail: Tail, num_keys: usize, num_nodes: usize) -> Self {
        Self {
            nodes,
            tail,
            num_keys,
            num_nodes,
        }
    }

    // =========================================================================
    // Size accounting
    // =========================================================================

    #[inline]
    pub fn num_keys(&self) -> usize {
        self.num_keys
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    /// Slots in the transition array, free ones included.
    #[inline]
    pub fn array_len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn tail_len(&self) -> usize {
        self.tail.len()
    }

    /// Bytes taken by the two backing arrays: 8 per slot plus the tail.
    #[inline]
    pub fn alloc_bytes(&self) -> usize {
        self.array_len() * Node::BYTES + self.tail_len()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            num_keys: self.num_keys(),
            num_nodes: self.num_nodes(),
            array_len: self.array_len(),
            tail_len: self.tail_len(),
            alloc_bytes: self.alloc_bytes(),
        }
    }

    // =========================================================================
    // Traversal primitives
    // =========================================================================

    #[inline]
    fn link(&self, node: u32) -> Link {
        self.nodes[node as usize].link()
    }

    /// Slot reached from branching `node` (with `base`) on byte `c`, if it
    /// belongs to `node`.
    #[inline]
    fn child(&self, node: u32, base: u32, c: u8) -> Option<u32> {
        let child = base ^ u32::from(c);
        self.nodes
            .get(child as usize)
            .filter(|n| n.is_child_of(node))
            .map(|_| child)
    }

    /// Value of the key ending exactly at branching `node`.
    #[inline]
    fn terminal_value(&self, node: u32, base: u32) -> Option<i32> {
        self.child(node, base, TERMINATOR)
            .map(|slot| self.nodes[slot as usize].value())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Exact match.
    ///
    /// ```rust
    /// use doublearray::DoubleArray;
    ///
    /// let da = DoubleArray::build(&["Aru", "Bocci"], &[1, 2]).unwrap();
    /// assert_eq!(da.lookup("Bocci"), Some(2));
    /// assert_eq!(da.lookup("Peko"), None);
    /// ```
    pub fn lookup<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Option<i32> {
        let key = key.as_ref();
        // A zero byte would descend into a terminator slot.
        if key.contains(&TERMINATOR) {
            return None;
        }

        let mut node = ROOT;
        for (pos, &c) in key.iter().enumerate() {
            match self.link(node) {
                Link::Suffix { tail } => return self.tail.value_if_eq(tail, &key[pos..]),
                Link::Branch { base } => node = self.child(node, base, c)?,
            }
        }

        match self.link(node) {
            Link::Suffix { tail } => self.tail.value_if_eq(tail, &[]),
            Link::Branch { base } => self.terminal_value(node, base),
        }
    }

    #[inline]
    pub fn contains_key<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> bool {
        self.lookup(key).is_some()
    }

    /// Stored keys that are prefixes of `key`, shortest first.
    pub fn prefix_iter<'a, K: AsRef<[u8]> + ?Sized>(&'a self, key: &'a K) -> PrefixIter<'a> {
        let key = key.as_ref();
        // No stored key extends across a zero byte.
        let end = key
            .iter()
            .position(|&b| b == TERMINATOR)
            .unwrap_or(key.len());
        PrefixIter {
            da: self,
            key: &key[..end],
            node: ROOT,
            pos: 0,
            done: false,
        }
    }

    /// Common-prefix search, collected into parallel key and value lists.
    ///
    /// ```rust
    /// use doublearray::DoubleArray;
    ///
    /// let da = DoubleArray::build(&["Nako", "Nakosuke"], &[5, 6]).unwrap();
    /// let (keys, values) = da.prefix_lookup("Nakosuke");
    /// assert_eq!(keys, vec![b"Nako".to_vec(), b"Nakosuke".to_vec()]);
    /// assert_eq!(values, vec![5, 6]);
    /// ```
    pub fn prefix_lookup<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> (Vec<Vec<u8>>, Vec<i32>) {
        self.prefix_iter(key).unzip()
    }

    /// Stored keys starting with `key`, in ascending order.
    pub fn predictive_iter<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Predictive<'_> {
        Predictive::new(self, key.as_ref())
    }

    /// Predictive search, collected into parallel key and value lists.
    pub fn predictive_lookup<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> (Vec<Vec<u8>>, Vec<i32>) {
        self.predictive_iter(key).unzip()
    }

    /// All entries in ascending key order.
    pub fn iter(&self) -> Predictive<'_> {
        Predictive::new(self, &[])
    }

    /// Every key and value, ascending; same as `predictive_lookup("")`.
    pub fn enumerate(&self) -> (Vec<Vec<u8>>, Vec<i32>) {
        self.iter().unzip()
    }
}

#[cfg(test)]
impl DoubleArray {
    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn tail_entry(&self, offset: u32) -> (&[u8], i32) {
        self.tail.entry(offset)
    }
}

impl std::fmt::Debug for DoubleArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.iter()
                    .map(|(k, v)| (String::from_utf8_lossy(&k).into_owned(), v)),
            )
            .finish()
    }
}

impl<'a> IntoIterator for &'a DoubleArray {
    type Item = (Vec<u8>, i32);
    type IntoIter = Predictive<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`DoubleArray::prefix_iter`].
pub struct PrefixIter<'a> {
    da: &'a DoubleArray,
    key: &'a [u8],
    node: u32,
    pos: usize,
    done: bool,
}

impl Iterator for PrefixIter<'_> {
    type Item = (Vec<u8>, i32);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.da.link(self.node) {
                Link::Suffix { tail } => {
                    self.done = true;
                    let (suffix, value) = self.da.tail.entry(tail);
                    if self.key[self.pos..].starts_with(suffix) {
                        let end = self.pos + suffix.len();
                        return Some((self.key[..end].to_vec(), value));
                    }
                }
                Link::Branch { base } => {
                    let hit = self
                        .da
                        .terminal_value(self.node, base)
                        .map(|v| (self.key[..self.pos].to_vec(), v));

                    match self
                        .key
                        .get(self.pos)
                        .and_then(|&c| self.da.child(self.node, base, c))
                    {
                        Some(child) => {
                            self.node = child;
                            self.pos += 1;
                        }
                        None => self.done = true,
                    }

                    if hit.is_some() {
                        return hit;
                    }
                }
            }
        }
        None
    }
}

#[derive(Clone, Copy)]
struct Frame {
    node: u32,
    base: u32,
    /// Length of the decoded key at `node`.
    depth: usize,
    /// Next edge byte to try; 0 is the terminator, 256 means exhausted.
    next: u16,
}

/// Depth-first, ascending walk of a subtree. Returned by
/// [`DoubleArray::predictive_iter`] and [`DoubleArray::iter`].
pub struct Predictive<'a> {
    da: &'a DoubleArray,
    decoded: Vec<u8>,
    stack: Vec<Frame>,
    /// Entry found while positioning, emitted first.
    pending: Option<(Vec<u8>, i32)>,
}

impl<'a> Predictive<'a> {
    fn new(da: &'a DoubleArray, key: &[u8]) -> Self {
        let mut it = Self {
            da,
            decoded: Vec::new(),
            stack: Vec::new(),
            pending: None,
        };
        if key.contains(&TERMINATOR) {
            return it;
        }

        let mut node = ROOT;
        for (pos, &c) in key.iter().enumerate() {
            match da.link(node) {
                Link::Suffix { tail } => {
                    // The one key below here matches if it extends the query.
                    let (suffix, value) = da.tail.entry(tail);
                    if suffix.starts_with(&key[pos..]) {
                        let mut found = key[..pos].to_vec();
                        found.extend_from_slice(suffix);
                        it.pending = Some((found, value));
                    }
                    return it;
                }
                Link::Branch { base } => match da.child(node, base, c) {
                    Some(child) => node = child,
                    None => return it,
                },
            }
        }

        it.decoded.extend_from_slice(key);
        it.pending = it.enter(node);
        it
    }

    /// Step onto `node` with `decoded` as its key. A suffix node yields its
    /// entry; a branching node is scheduled for its children.
    fn enter(&mut self, node: u32) -> Option<(Vec<u8>, i32)> {
        match self.da.link(node) {
            Link::Suffix { tail } => {
                let (suffix, value) = self.da.tail.entry(tail);
                let mut key = Vec::with_capacity(self.decoded.len() + suffix.len());
                key.extend_from_slice(&self.decoded);
                key.extend_from_slice(suffix);
                Some((key, value))
            }
            Link::Branch { base } => {
                self.stack.push(Frame {
                    node,
                    base,
                    depth: self.decoded.len(),
                    next: 0,
                });
                None
            }
        }
    }
}

impl Iterator for Predictive<'_> {
    type Item = (Vec<u8>, i32);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.pending.take() {
            return Some(item);
        }

        while let Some(frame) = self.stack.last_mut() {
            if frame.next > u16::from(u8::MAX) {
                self.stack.pop();
                continue;
            }
            let c = frame.next as u8;
            frame.next += 1;
            let Frame {
                node, base, depth, ..
            } = *frame;

            let Some(child) = self.da.child(node, base, c) else {
                continue;
            };
            self.decoded.truncate(depth);
            if c == TERMINATOR {
                return Some((self.decoded.clone(), self.da.nodes[child as usize].value()));
            }
            self.decoded.push(c);
            if let Some(item) = self.enter(child) {
                return Some(item);
            }
        }
        None
    }
}
