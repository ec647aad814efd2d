//! Disjoint-set forest with union-by-size and path compression.

/// Errors returned when creating a [`UnionFind`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionFindError {
    #[error("invalid union-find size {len} (must be in 0..={max})")]
    InvalidSize { len: i64, max: i64 },
}

const MAX_LEN: usize = u32::MAX as usize;

/// Union-find over the ids `0..len`.
///
/// Storage is a flat array of `(parent, size)` pairs. `size` is only
/// meaningful at a root; at non-root ids it is stale.
///
/// Typical use is one instance per image: pixels or segments are unioned
/// while growing components, then [`UnionFind::find`] yields a stable
/// component label and [`UnionFind::set_size`] its population.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnionFind {
    data: Vec<u32>,
}

impl UnionFind {
    /// Create `len` singleton sets.
    pub fn new(len: usize) -> Result<Self, UnionFindError> {
        if len > MAX_LEN {
            return Err(UnionFindError::InvalidSize {
                len: i64::try_from(len).unwrap_or(i64::MAX),
                max: MAX_LEN as i64,
            });
        }
        let mut uf = Self {
            data: vec![0; 2 * len],
        };
        uf.reset();
        Ok(uf)
    }

    /// Number of elements covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / 2
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Put every element back into its own singleton set without reallocating.
    pub fn reset(&mut self) {
        for (id, pair) in self.data.chunks_exact_mut(2).enumerate() {
            pair[0] = id as u32;
            pair[1] = 1;
        }
    }

    #[inline]
    fn parent(&self, id: usize) -> usize {
        self.data[2 * id] as usize
    }

    #[inline]
    fn size_at(&self, root: usize) -> u32 {
        self.data[2 * root + 1]
    }

    /// Canonical representative of the set containing `id`.
    ///
    /// Every node on the path to the root is re-pointed directly at the
    /// root, so repeated lookups are near O(1).
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.len()`.
    pub fn find(&mut self, id: usize) -> usize {
        let mut root = id;
        loop {
            let parent = self.parent(root);
            if parent == root {
                break;
            }
            root = parent;
        }

        let mut node = id;
        while node != root {
            let next = self.parent(node);
            self.data[2 * node] = root as u32;
            node = next;
        }
        root
    }

    /// Merge the sets containing `a` and `b`, returning the surviving root.
    ///
    /// The smaller set is attached under the larger one. On equal sizes
    /// `a`'s root goes under `b`'s root.
    ///
    /// # Panics
    ///
    /// Panics if either id is out of range.
    pub fn union(&mut self, a: usize, b: usize) -> usize {
        let a_root = self.find(a);
        let b_root = self.find(b);
        if a_root == b_root {
            return a_root;
        }

        let a_size = self.size_at(a_root);
        let b_size = self.size_at(b_root);
        if a_size > b_size {
            self.data[2 * b_root] = a_root as u32;
            self.data[2 * a_root + 1] += b_size;
            a_root
        } else {
            self.data[2 * a_root] = b_root as u32;
            self.data[2 * b_root + 1] += a_size;
            b_root
        }
    }

    /// Number of elements in the set containing `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id >= self.len()`.
    pub fn set_size(&mut self, id: usize) -> usize {
        let root = self.find(id);
        self.size_at(root) as usize
    }

    /// `true` when `a` and `b` are in the same set.
    pub fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }
}

impl TryFrom<i64> for UnionFind {
    type Error = UnionFindError;

    /// Build from a signed element count; negative counts are rejected.
    fn try_from(len: i64) -> Result<Self, Self::Error> {
        let invalid = UnionFindError::InvalidSize {
            len,
            max: MAX_LEN as i64,
        };
        let len = usize::try_from(len).map_err(|_| invalid)?;
        Self::new(len).map_err(|_| invalid)
    }
}
