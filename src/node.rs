//! Heap node and circular sibling-ring primitives.
//!
//! Every node in the heap lives in exactly one circular doubly-linked ring:
//! either the root ring or the child ring of its parent. A singleton ring is
//! a node whose `left` and `right` both point at itself. The functions here
//! are the only code that rewires `left`/`right` pointers, so the ring
//! invariant (`left` is the exact inverse of `right`) is enforced in one
//! place.

use std::ptr::NonNull;

use smallvec::SmallVec;

/// Scratch buffer for ring snapshots. Root rings are short in practice
/// (at most one tree per degree after consolidation), so this rarely spills.
pub(crate) type RingBuf<K> = SmallVec<[NonNull<Node<K>>; 16]>;

pub(crate) struct Node<K> {
    pub(crate) key: K,
    /// Non-owning back-reference; `None` for roots.
    pub(crate) parent: Option<NonNull<Node<K>>>,
    /// Entry point into the child ring; the node owns its children.
    pub(crate) child: Option<NonNull<Node<K>>>,
    pub(crate) left: NonNull<Node<K>>,
    pub(crate) right: NonNull<Node<K>>,
    /// Number of nodes in the child ring.
    pub(crate) degree: usize,
    /// Whether this node has lost a child since it last became a child.
    pub(crate) marked: bool,
}

impl<K> Node<K> {
    /// Allocates a node as a singleton ring: unmarked, degree 0, no parent,
    /// no children, `left`/`right` pointing back at itself.
    pub(crate) fn singleton(key: K) -> NonNull<Node<K>> {
        let raw = Box::into_raw(Box::new(Node {
            key,
            parent: None,
            child: None,
            left: NonNull::dangling(), // set immediately below
            right: NonNull::dangling(),
            degree: 0,
            marked: false,
        }));
        let ptr = unsafe { NonNull::new_unchecked(raw) };
        unsafe {
            (*raw).left = ptr;
            (*raw).right = ptr;
        }
        ptr
    }
}

/// Inserts `node` into the ring containing `at`, immediately to the left
/// of `at`. `node`'s previous links are overwritten.
///
/// # Safety
///
/// Both pointers must be valid. `node` must not currently be a member of
/// any ring other nodes still reference.
pub(crate) unsafe fn splice_before<K>(at: NonNull<Node<K>>, node: NonNull<Node<K>>) {
    let prev = (*at.as_ptr()).left;
    (*node.as_ptr()).right = at;
    (*node.as_ptr()).left = prev;
    (*prev.as_ptr()).right = node;
    (*at.as_ptr()).left = node;
}

/// Removes `node` from its ring and re-closes it into a singleton ring.
/// Returns `true` if `node` was the only member.
///
/// # Safety
///
/// `node` must be a valid member of a well-formed ring.
pub(crate) unsafe fn remove<K>(node: NonNull<Node<K>>) -> bool {
    let left = (*node.as_ptr()).left;
    let right = (*node.as_ptr()).right;
    let was_only = left == node;
    if !was_only {
        (*left.as_ptr()).right = right;
        (*right.as_ptr()).left = left;
        (*node.as_ptr()).left = node;
        (*node.as_ptr()).right = node;
    }
    was_only
}

/// Splices the rings containing `a` and `b` into one ring with a
/// four-pointer relink. Both rings stay circular throughout.
///
/// # Safety
///
/// Both pointers must be members of valid, disjoint rings.
pub(crate) unsafe fn splice_rings<K>(a: NonNull<Node<K>>, b: NonNull<Node<K>>) {
    let a_prev = (*a.as_ptr()).left;
    let b_prev = (*b.as_ptr()).left;
    (*a_prev.as_ptr()).right = b;
    (*b.as_ptr()).left = a_prev;
    (*b_prev.as_ptr()).right = a;
    (*a.as_ptr()).left = b_prev;
}

/// Snapshots every member of the ring containing `start`, in `right` order
/// beginning at `start`. Callers that relink the ring mid-iteration walk
/// the snapshot instead of the live pointers.
///
/// # Safety
///
/// `start` must be a member of a well-formed ring.
pub(crate) unsafe fn ring_members<K>(start: NonNull<Node<K>>) -> RingBuf<K> {
    let mut members = RingBuf::new();
    let mut current = start;
    loop {
        members.push(current);
        current = (*current.as_ptr()).right;
        if current == start {
            break;
        }
    }
    members
}
