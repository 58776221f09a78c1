#![forbid(unsafe_code)]

//! Fenwick tree (binary indexed tree) over non-negative `u64` values.
//!
//! # Operations
//!
//! | Operation     | Time     |
//! |---------------|----------|
//! | `from_values` | O(n)     |
//! | `get`         | O(1)     |
//! | `set`         | O(log n) |
//! | `prefix`      | O(log n) |
//! | `find_prefix` | O(log n) |
//! | `resize`      | O(n)     |
//!
//! # Invariants
//!
//! 1. `prefix(i)` == sum of values `[0..=i]`.
//! 2. `find_prefix(t)` returns the largest `i` with `prefix(i) <= t`, or
//!    `None` when `prefix(0) > t`.

/// Prefix-sum tree with point updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FenwickTree {
    /// 1-based implicit tree; `tree[0]` is unused.
    tree: Vec<u64>,
    /// Raw values, kept so `get` is O(1) and `set` can compute a delta.
    values: Vec<u64>,
}

#[inline]
fn lowbit(i: usize) -> usize {
    i & i.wrapping_neg()
}

impl FenwickTree {
    /// Create a tree of `len` zeros.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            tree: vec![0; len + 1],
            values: vec![0; len],
        }
    }

    /// Build from a slice of values in O(n).
    #[must_use]
    pub fn from_values(values: &[u64]) -> Self {
        let n = values.len();
        let mut tree = vec![0u64; n + 1];
        for (i, &v) in values.iter().enumerate() {
            let pos = i + 1;
            tree[pos] += v;
            let parent = pos + lowbit(pos);
            if parent <= n {
                tree[parent] += tree[pos];
            }
        }
        Self {
            tree,
            values: values.to_vec(),
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value stored at `idx` (0 when out of range).
    #[must_use]
    pub fn get(&self, idx: usize) -> u64 {
        self.values.get(idx).copied().unwrap_or(0)
    }

    /// Replace the value at `idx`. Out-of-range indices are ignored.
    pub fn set(&mut self, idx: usize, value: u64) {
        let Some(old) = self.values.get(idx).copied() else {
            return;
        };
        if old == value {
            return;
        }
        self.values[idx] = value;
        let n = self.values.len();
        let mut pos = idx + 1;
        if value > old {
            let delta = value - old;
            while pos <= n {
                self.tree[pos] += delta;
                pos += lowbit(pos);
            }
        } else {
            let delta = old - value;
            while pos <= n {
                self.tree[pos] -= delta;
                pos += lowbit(pos);
            }
        }
    }

    /// Sum of values `[0..=idx]`. Indices past the end are clamped.
    #[must_use]
    pub fn prefix(&self, idx: usize) -> u64 {
        let mut pos = (idx + 1).min(self.values.len());
        let mut sum = 0;
        while pos > 0 {
            sum += self.tree[pos];
            pos -= lowbit(pos);
        }
        sum
    }

    /// Sum of values `[0..idx)`; 0 for `idx == 0`.
    #[must_use]
    pub fn prefix_before(&self, idx: usize) -> u64 {
        if idx == 0 { 0 } else { self.prefix(idx - 1) }
    }

    /// Sum of all values.
    #[must_use]
    pub fn total(&self) -> u64 {
        if self.values.is_empty() {
            0
        } else {
            self.prefix(self.values.len() - 1)
        }
    }

    /// Largest index `i` such that `prefix(i) <= target`.
    #[must_use]
    pub fn find_prefix(&self, target: u64) -> Option<usize> {
        let n = self.values.len();
        if n == 0 {
            return None;
        }
        let mut pos = 0usize;
        let mut remaining = target;
        let mut step = 1usize << (usize::BITS - 1 - n.leading_zeros());
        while step > 0 {
            let next = pos + step;
            if next <= n && self.tree[next] <= remaining {
                pos = next;
                remaining -= self.tree[next];
            }
            step >>= 1;
        }
        pos.checked_sub(1)
    }

    /// Grow (zero-filled) or shrink to `new_len` slots.
    pub fn resize(&mut self, new_len: usize) {
        if new_len == self.values.len() {
            return;
        }
        let mut values = std::mem::take(&mut self.values);
        values.resize(new_len, 0);
        *self = Self::from_values(&values);
    }

    /// Raw values in slot order.
    #[must_use]
    pub fn values(&self) -> &[u64] {
        &self.values
    }
}
