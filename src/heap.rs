//! Fibonacci heap implementation.
//!
//! The heap is a forest of heap-ordered trees whose roots are linked in a
//! circular doubly-linked ring, with a pointer to the minimum root. Insert
//! and merge are pure ring splices; all structural cleanup is deferred to
//! the consolidation pass that runs after each `extract_min`. Decrease-key
//! repairs heap order with a cut plus cascading cuts driven by per-node
//! mark bits.

use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::error::HeapError;
use crate::node::{self, Node};

/// Handle to an element in a [`FibonacciHeap`], returned by
/// [`insert`](FibonacciHeap::insert) and consumed by
/// [`decrease_key`](FibonacciHeap::decrease_key).
///
/// A handle is tied to the heap instance that created it (or any heap that
/// instance was merged into). Using a handle after its element was removed
/// by [`extract_min`](FibonacciHeap::extract_min), or after the heap was
/// dropped, is undefined behavior: handles are non-owning and the heap does
/// not track them.
pub struct NodeHandle<K> {
    node: NonNull<Node<K>>,
}

// Manual impls: deriving would put unwanted bounds on `K`.
impl<K> Clone for NodeHandle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for NodeHandle<K> {}

impl<K> PartialEq for NodeHandle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<K> Eq for NodeHandle<K> {}

impl<K> fmt::Debug for NodeHandle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeHandle").field(&self.node).finish()
    }
}

/// A mergeable min-priority queue with amortized O(1) insert, merge and
/// decrease-key, and amortized O(log n) extract-min.
///
/// Keys are any totally ordered type. The structure is strictly
/// single-threaded: operations run to completion and callers needing shared
/// access must serialize externally.
///
/// # Example
///
/// ```rust
/// use fibonacci_heap::FibonacciHeap;
///
/// let mut heap = FibonacciHeap::new();
/// let handle = heap.insert(5);
/// heap.insert(3);
/// heap.decrease_key(&handle, 1).unwrap();
/// assert_eq!(heap.find_min(), Some(&1));
/// assert_eq!(heap.extract_min(), Some(1));
/// ```
pub struct FibonacciHeap<K: Ord> {
    /// Minimum root; `None` exactly when the heap is empty.
    min: Option<NonNull<Node<K>>>,
    len: usize,
    _marker: PhantomData<K>,
}

impl<K: Ord> FibonacciHeap<K> {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self {
            min: None,
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements in the heap.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the heap contains no elements.
    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }

    /// Inserts `key`, returning a handle usable with
    /// [`decrease_key`](Self::decrease_key).
    ///
    /// The new node joins the root ring as a singleton tree; no
    /// restructuring happens until the next [`extract_min`](Self::extract_min).
    /// O(1).
    pub fn insert(&mut self, key: K) -> NodeHandle<K> {
        let new = Node::singleton(key);
        unsafe {
            match self.min {
                Some(min) => {
                    node::splice_before(min, new);
                    if (*new.as_ptr()).key < (*min.as_ptr()).key {
                        self.min = Some(new);
                    }
                }
                None => self.min = Some(new),
            }
        }
        self.len += 1;
        NodeHandle { node: new }
    }

    /// Returns a reference to the minimum key, or `None` if the heap is
    /// empty. O(1), no mutation.
    pub fn find_min(&self) -> Option<&K> {
        self.min.map(|min| unsafe { &(*min.as_ptr()).key })
    }

    /// Alias for [`find_min`](Self::find_min).
    #[inline]
    pub fn peek(&self) -> Option<&K> {
        self.find_min()
    }

    /// Merges `other` into `self`, consuming it.
    ///
    /// This is a structural union only: the two root rings are spliced
    /// together with a four-pointer relink and the smaller of the two old
    /// minimums wins. No trees are compared or linked until the next
    /// consolidation. Handles issued by either heap stay valid. O(1).
    pub fn merge(&mut self, mut other: Self) {
        let Some(other_min) = other.min else { return };
        let Some(min) = self.min else {
            *self = other;
            return;
        };
        unsafe {
            node::splice_rings(min, other_min);
            if (*other_min.as_ptr()).key < (*min.as_ptr()).key {
                self.min = Some(other_min);
            }
        }
        self.len += other.len;
        // `other`'s nodes now belong to `self`; clear it so its Drop is a
        // no-op rather than a double free.
        other.min = None;
        other.len = 0;
    }

    /// Removes and returns the minimum key, or `None` if the heap is empty.
    ///
    /// The minimum's children are promoted to roots and the root ring is
    /// then consolidated so that at most one tree per degree remains. This
    /// is the only operation that restructures the forest; its amortized
    /// O(log n) cost pays for the cleanup that insert and merge defer.
    pub fn extract_min(&mut self) -> Option<K> {
        let min = self.min?;
        unsafe {
            // Promote every child of the outgoing minimum to a root.
            if let Some(child) = (*min.as_ptr()).child.take() {
                for c in node::ring_members(child) {
                    (*c.as_ptr()).parent = None;
                    (*c.as_ptr()).marked = false;
                }
                node::splice_rings(min, child);
            }

            let survivor = (*min.as_ptr()).right;
            node::remove(min);
            if survivor == min {
                self.min = None;
            } else {
                // Temporary minimum; consolidation recomputes the real one.
                self.min = Some(survivor);
                self.consolidate();
            }

            self.len -= 1;
            let boxed = Box::from_raw(min.as_ptr());
            Some(boxed.key)
        }
    }

    /// Alias for [`extract_min`](Self::extract_min).
    #[inline]
    pub fn pop(&mut self) -> Option<K> {
        self.extract_min()
    }

    /// Lowers the key behind `handle` to `new_key`.
    ///
    /// A `new_key` greater than the current key is rejected with
    /// [`HeapError::KeyNotDecreased`] and the structure is left untouched;
    /// an equal key is an accepted no-op. On a real decrease, if heap order
    /// against the parent breaks, the node is cut to the root ring and
    /// cascading cuts walk up the ancestor chain. Amortized O(1).
    ///
    /// `handle` must refer to an element still in this heap; see
    /// [`NodeHandle`] for the validity rules.
    pub fn decrease_key(&mut self, handle: &NodeHandle<K>, new_key: K) -> Result<(), HeapError> {
        let target = handle.node;
        unsafe {
            match new_key.cmp(&(*target.as_ptr()).key) {
                Ordering::Greater => return Err(HeapError::KeyNotDecreased),
                Ordering::Equal => return Ok(()),
                Ordering::Less => {}
            }
            (*target.as_ptr()).key = new_key;

            if let Some(parent) = (*target.as_ptr()).parent {
                if (*target.as_ptr()).key < (*parent.as_ptr()).key {
                    self.cut(target, parent);
                    self.cascading_cut(parent);
                }
            }
            if let Some(min) = self.min {
                if (*target.as_ptr()).key < (*min.as_ptr()).key {
                    self.min = Some(target);
                }
            }
        }
        Ok(())
    }

    /// Collapses the root ring so at most one root per degree remains, then
    /// rebuilds the ring from the survivors and recomputes the minimum.
    fn consolidate(&mut self) {
        let Some(start) = self.min else { return };
        unsafe {
            // Snapshot the roots up front: linking below rewires `right`
            // pointers mid-pass.
            let roots = node::ring_members(start);

            // Degree table, grown on demand; the true bound is
            // floor(log_phi(len)) but no fixed cap is needed for
            // correctness.
            let mut by_degree: SmallVec<[Option<NonNull<Node<K>>>; 16]> = SmallVec::new();

            for root in roots {
                let mut x = root;
                let mut degree = (*x.as_ptr()).degree;
                loop {
                    if degree >= by_degree.len() {
                        by_degree.resize(degree + 1, None);
                    }
                    match by_degree[degree].take() {
                        None => {
                            by_degree[degree] = Some(x);
                            break;
                        }
                        Some(y) => {
                            // The smaller key becomes the parent; on a tie
                            // the node currently being visited stays root.
                            let (parent, child) = if (*y.as_ptr()).key < (*x.as_ptr()).key {
                                (y, x)
                            } else {
                                (x, y)
                            };
                            Self::link(child, parent);
                            x = parent;
                            degree += 1;
                        }
                    }
                }
            }

            // Rebuild the root ring from the table's survivors.
            self.min = None;
            for root in by_degree.into_iter().flatten() {
                (*root.as_ptr()).left = root;
                (*root.as_ptr()).right = root;
                match self.min {
                    None => self.min = Some(root),
                    Some(min) => {
                        node::splice_before(min, root);
                        if (*root.as_ptr()).key < (*min.as_ptr()).key {
                            self.min = Some(root);
                        }
                    }
                }
            }
        }
    }

    /// Links `child` under `parent`: removes it from the root ring, clears
    /// its mark, and splices it into `parent`'s child ring.
    unsafe fn link(child: NonNull<Node<K>>, parent: NonNull<Node<K>>) {
        node::remove(child);
        (*child.as_ptr()).parent = Some(parent);
        (*child.as_ptr()).marked = false;
        match (*parent.as_ptr()).child {
            // `remove` left `child` as a singleton ring, so it is already
            // a valid child ring of one.
            None => (*parent.as_ptr()).child = Some(child),
            Some(first) => node::splice_before(first, child),
        }
        (*parent.as_ptr()).degree += 1;
    }

    /// Detaches `target` from `parent`'s child ring and promotes it to an
    /// unmarked root.
    unsafe fn cut(&mut self, target: NonNull<Node<K>>, parent: NonNull<Node<K>>) {
        let next = (*target.as_ptr()).right;
        let was_only = node::remove(target);
        if (*parent.as_ptr()).child == Some(target) {
            (*parent.as_ptr()).child = if was_only { None } else { Some(next) };
        }
        (*parent.as_ptr()).degree -= 1;

        match self.min {
            Some(min) => node::splice_before(min, target),
            None => self.min = Some(target),
        }
        (*target.as_ptr()).parent = None;
        (*target.as_ptr()).marked = false;
    }

    /// Walks up the parent chain after a cut. The first unmarked non-root
    /// is marked and the walk stops; a marked node is cut and the walk
    /// continues at its parent. Depth is bounded by tree height.
    unsafe fn cascading_cut(&mut self, start: NonNull<Node<K>>) {
        let mut current = start;
        while let Some(parent) = (*current.as_ptr()).parent {
            if !(*current.as_ptr()).marked {
                (*current.as_ptr()).marked = true;
                break;
            }
            self.cut(current, parent);
            current = parent;
        }
    }
}

impl<K: Ord> Drop for FibonacciHeap<K> {
    fn drop(&mut self) {
        // Free the whole forest without consolidating: walk every ring,
        // queueing child rings as they are encountered.
        unsafe {
            let mut pending: Vec<NonNull<Node<K>>> = Vec::new();
            if let Some(min) = self.min.take() {
                pending.extend(node::ring_members(min));
            }
            while let Some(n) = pending.pop() {
                if let Some(child) = (*n.as_ptr()).child {
                    pending.extend(node::ring_members(child));
                }
                drop(Box::from_raw(n.as_ptr()));
            }
        }
        self.len = 0;
    }
}

impl<K: Ord> Default for FibonacciHeap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord> Extend<K> for FibonacciHeap<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K: Ord> FromIterator<K> for FibonacciHeap<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut heap = Self::new();
        heap.extend(iter);
        heap
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for FibonacciHeap<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FibonacciHeap")
            .field("len", &self.len)
            .field("min", &self.find_min())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl<K: Ord> FibonacciHeap<K> {
    /// Walks the whole structure and asserts every structural invariant:
    /// heap order, ring integrity, degree accounting, mark discipline on
    /// roots, size accounting, min correctness, and the degree bound
    /// `degree <= floor(log_phi(len)) + 1`.
    fn assert_invariants(&self) {
        let Some(min) = self.min else {
            assert_eq!(self.len, 0, "empty heap must have len 0");
            return;
        };
        assert!(self.len > 0, "non-empty heap must have len > 0");
        let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
        let degree_bound = ((self.len as f64).ln() / phi.ln()).floor() as usize + 1;

        unsafe {
            let mut total = 0usize;
            for root in node::ring_members(min) {
                assert!((*root.as_ptr()).parent.is_none(), "root has a parent");
                assert!(!(*root.as_ptr()).marked, "root is marked");
                assert!(
                    (*min.as_ptr()).key <= (*root.as_ptr()).key,
                    "min pointer does not hold the smallest root key"
                );
                assert!(
                    (*root.as_ptr()).degree <= degree_bound,
                    "root degree {} exceeds bound {} for len {}",
                    (*root.as_ptr()).degree,
                    degree_bound,
                    self.len
                );
                assert_eq!(
                    (*(*root.as_ptr()).right.as_ptr()).left,
                    root,
                    "left is not the inverse of right in the root ring"
                );
                assert_eq!(
                    (*(*root.as_ptr()).left.as_ptr()).right,
                    root,
                    "right is not the inverse of left in the root ring"
                );
                total += Self::check_subtree(root);
            }
            assert_eq!(total, self.len, "reachable node count does not match len");
        }
    }

    /// Recursively validates the subtree rooted at `top` and returns its
    /// node count. Recursion depth is bounded by tree height.
    unsafe fn check_subtree(top: NonNull<Node<K>>) -> usize {
        let mut count = 1;
        match (*top.as_ptr()).child {
            None => assert_eq!(
                (*top.as_ptr()).degree,
                0,
                "childless node with nonzero degree"
            ),
            Some(child) => {
                let members = node::ring_members(child);
                assert_eq!(
                    members.len(),
                    (*top.as_ptr()).degree,
                    "degree does not match child ring size"
                );
                for &c in members.iter() {
                    assert_eq!(
                        (*c.as_ptr()).parent,
                        Some(top),
                        "child ring member has a wrong parent link"
                    );
                    assert!(
                        (*c.as_ptr()).key >= (*top.as_ptr()).key,
                        "heap order violated between child and parent"
                    );
                    assert_eq!(
                        (*(*c.as_ptr()).right.as_ptr()).left,
                        c,
                        "left is not the inverse of right in a child ring"
                    );
                    assert_eq!(
                        (*(*c.as_ptr()).left.as_ptr()).right,
                        c,
                        "right is not the inverse of left in a child ring"
                    );
                    count += Self::check_subtree(c);
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn basic_operations() {
        let mut heap = FibonacciHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.len(), 0);
        assert_eq!(heap.find_min(), None);

        heap.insert(5);
        heap.insert(3);
        heap.insert(7);
        heap.assert_invariants();

        assert_eq!(heap.len(), 3);
        assert_eq!(heap.find_min(), Some(&3));

        assert_eq!(heap.extract_min(), Some(3));
        heap.assert_invariants();
        assert_eq!(heap.find_min(), Some(&5));
    }

    #[test]
    fn extract_on_empty_returns_none() {
        let mut heap: FibonacciHeap<i32> = FibonacciHeap::new();
        assert_eq!(heap.extract_min(), None);
        heap.insert(1);
        assert_eq!(heap.extract_min(), Some(1));
        assert_eq!(heap.extract_min(), None);
        heap.assert_invariants();
    }

    #[test]
    fn decrease_key_moves_min() {
        let mut heap = FibonacciHeap::new();
        let _a = heap.insert(10);
        let b = heap.insert(20);
        let c = heap.insert(30);

        heap.decrease_key(&b, 5).unwrap();
        heap.assert_invariants();
        assert_eq!(heap.find_min(), Some(&5));

        heap.decrease_key(&c, 1).unwrap();
        heap.assert_invariants();
        assert_eq!(heap.find_min(), Some(&1));
    }

    #[test]
    fn decrease_key_rejects_increase() {
        let mut heap = FibonacciHeap::new();
        let h = heap.insert(10);
        assert_eq!(heap.decrease_key(&h, 11), Err(HeapError::KeyNotDecreased));
        assert_eq!(heap.find_min(), Some(&10));
        heap.assert_invariants();
    }

    #[test]
    fn decrease_key_equal_is_noop() {
        let mut heap = FibonacciHeap::new();
        let h = heap.insert(10);
        heap.insert(20);
        assert_eq!(heap.decrease_key(&h, 10), Ok(()));
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.find_min(), Some(&10));
        heap.assert_invariants();
    }

    #[test]
    fn decrease_key_below_parent_cuts() {
        let mut heap = FibonacciHeap::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            handles.push(heap.insert(i * 10));
        }
        // Force consolidation so real trees exist.
        assert_eq!(heap.extract_min(), Some(0));
        heap.assert_invariants();

        // Cut a buried node below the current minimum.
        heap.decrease_key(&handles[15], 1).unwrap();
        heap.assert_invariants();
        assert_eq!(heap.find_min(), Some(&1));

        // Repeated cuts in the same tree exercise cascading cuts.
        heap.decrease_key(&handles[14], 2).unwrap();
        heap.decrease_key(&handles[13], 3).unwrap();
        heap.decrease_key(&handles[12], 4).unwrap();
        heap.assert_invariants();
        assert_eq!(heap.find_min(), Some(&1));
    }

    #[test]
    fn merge_takes_smaller_min() {
        let mut a = FibonacciHeap::new();
        a.insert(5);
        a.insert(10);

        let mut b = FibonacciHeap::new();
        b.insert(3);
        b.insert(7);

        a.merge(b);
        a.assert_invariants();
        assert_eq!(a.len(), 4);
        assert_eq!(a.find_min(), Some(&3));
    }

    #[test]
    fn merge_with_empty_either_way() {
        let mut a = FibonacciHeap::new();
        a.insert(1);
        a.merge(FibonacciHeap::new());
        assert_eq!(a.len(), 1);
        a.assert_invariants();

        let mut empty = FibonacciHeap::new();
        empty.merge(a);
        assert_eq!(empty.len(), 1);
        assert_eq!(empty.find_min(), Some(&1));
        empty.assert_invariants();
    }

    #[test]
    fn consolidation_leaves_unique_degrees() {
        let mut heap = FibonacciHeap::new();
        for i in 0..64 {
            heap.insert(i);
        }
        assert_eq!(heap.extract_min(), Some(0));
        heap.assert_invariants();

        // Drain the rest; every extraction re-consolidates.
        for expected in 1..64 {
            assert_eq!(heap.extract_min(), Some(expected));
            heap.assert_invariants();
        }
        assert!(heap.is_empty());
    }

    #[test]
    fn single_tree_consolidation_is_clean() {
        // Build a heap whose post-extraction forest is one nonzero-degree
        // tree, so consolidation performs no merges.
        let mut heap = FibonacciHeap::new();
        for i in 0..3 {
            heap.insert(i);
        }
        assert_eq!(heap.extract_min(), Some(0));
        heap.assert_invariants();
        assert_eq!(heap.extract_min(), Some(1));
        heap.assert_invariants();
        assert_eq!(heap.extract_min(), Some(2));
        assert!(heap.is_empty());
    }

    #[test]
    fn from_iter_and_extend() {
        let mut heap: FibonacciHeap<i32> = [4, 2, 9].into_iter().collect();
        heap.extend([1, 7]);
        heap.assert_invariants();
        assert_eq!(heap.len(), 5);

        let mut drained = Vec::new();
        while let Some(k) = heap.extract_min() {
            drained.push(k);
        }
        assert_eq!(drained, vec![1, 2, 4, 7, 9]);
    }

    #[test]
    fn debug_output_names_len_and_min() {
        let mut heap = FibonacciHeap::new();
        heap.insert(2);
        let rendered = format!("{heap:?}");
        assert!(rendered.contains("len: 1"));
        assert!(rendered.contains("min: Some(2)"));
    }

    proptest! {
        #[test]
        fn random_ops_preserve_invariants(
            ops in prop::collection::vec((any::<bool>(), -1000i32..1000), 0..200)
        ) {
            let mut heap = FibonacciHeap::new();
            let mut model: Vec<i32> = Vec::new();

            for (should_pop, key) in ops {
                if should_pop && !model.is_empty() {
                    let popped = heap.extract_min();
                    let expected = model.iter().min().copied();
                    prop_assert_eq!(popped, expected);
                    if let Some(k) = popped {
                        let pos = model.iter().position(|&m| m == k);
                        model.remove(pos.expect("popped key must be in the model"));
                    }
                } else {
                    heap.insert(key);
                    model.push(key);
                }
                heap.assert_invariants();
                prop_assert_eq!(heap.len(), model.len());
                prop_assert_eq!(heap.find_min().copied(), model.iter().min().copied());
            }
        }

        #[test]
        fn random_decreases_preserve_invariants(
            initial in prop::collection::vec(-1000i32..1000, 1..60),
            decreases in prop::collection::vec((0usize..60, -2000i32..1000), 0..40)
        ) {
            let mut heap = FibonacciHeap::new();
            let mut handles = Vec::new();
            let mut model = initial.clone();
            for &key in &initial {
                handles.push(heap.insert(key));
            }

            for (idx, new_key) in decreases {
                if idx >= handles.len() {
                    continue;
                }
                match heap.decrease_key(&handles[idx], new_key) {
                    Ok(()) => {
                        if new_key < model[idx] {
                            model[idx] = new_key;
                        }
                    }
                    Err(HeapError::KeyNotDecreased) => {
                        prop_assert!(new_key > model[idx]);
                    }
                }
                heap.assert_invariants();
                prop_assert_eq!(heap.find_min().copied(), model.iter().min().copied());
            }

            model.sort_unstable();
            let mut drained = Vec::new();
            while let Some(k) = heap.extract_min() {
                heap.assert_invariants();
                drained.push(k);
            }
            prop_assert_eq!(drained, model);
        }
    }
}
