//! Concurrent ordered set: a lazy optimistic skip list
//!
//! Implements the lock-based lazy skip list of Herlihy, Lev, Luchangco and
//! Shavit. Traversals never lock; mutations lock only the handful of nodes
//! they touch and re-validate them afterwards, retrying when a concurrent
//! mutation moved the neighborhood.
//!
//! # Algorithm Overview
//!
//! - Every node carries forward pointers for levels `0..=top_level`, where
//!   `top_level` is sampled geometrically at creation and never changes.
//!   Level 0 is the canonical sorted list; higher levels are shortcuts.
//! - A node is logically in the set iff `fully_linked && !marked`.
//! - **Insert** splices bottom-up and only then raises `fully_linked` (the
//!   publication point), so a traversal that sees the node at any level sees
//!   a node whose links are all installed.
//! - **Remove** is two-phase: set `marked` under the victim's lock (the
//!   logical removal), then unlink top-down under the predecessors' locks.
//!   Higher levels lose the node before level 0 does, so the bottom list
//!   stays authoritative.
//! - After taking locks, both paths validate that each predecessor is
//!   unmarked and still points at the expected successor; otherwise they
//!   release and retry from a fresh traversal.
//!
//! Lock acquisition is deadlock-free: within any operation, locks are taken
//! in descending key order (predecessors at rising levels sit earlier in the
//! list, and a removal victim sorts after all its predecessors), and each
//! distinct node is locked once.
//!
//! # Memory Reclamation
//!
//! Unlinked nodes are moved to a quarantine list instead of being freed: a
//! concurrent traversal may still be standing on one. Quarantined nodes are
//! released in `Drop`, where exclusive access guarantees no reader remains.
//! This trades peak memory for the simplest safe scheme; an epoch-based
//! reclaimer could be swapped in without changing the algorithm.
//!
//! # References
//!
//! - Herlihy, Lev, Luchangco, Shavit. "A Simple Optimistic Skiplist
//!   Algorithm" (2007)
//! - Herlihy, Shavit. "The Art of Multiprocessor Programming", ch. 14
//!
//! # Examples
//!
//! ```
//! use sift_oxide::ordered::SkipList;
//!
//! let list: SkipList<String> = SkipList::new(1000).unwrap();
//! assert!(list.insert("m".to_string()));
//! assert!(list.insert("a".to_string()));
//! assert!(!list.insert("m".to_string()), "duplicate keys are rejected");
//!
//! assert!(list.contains(&"a".to_string()));
//! assert_eq!(list.range(&"b".to_string(), &"z".to_string()), vec!["m".to_string()]);
//!
//! assert!(list.remove(&"m".to_string()));
//! assert!(!list.contains(&"m".to_string()));
//! ```

use std::cmp::Ordering as KeyOrdering;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use rand::Rng;

use crate::common::validation::validate_max_elements;
use crate::common::Result;

/// Hard ceiling on the level count, independent of `max_elements`
const LEVEL_CAP: usize = 31;

/// Node key with the sentinels folded in: `Head < every item < Tail`
#[derive(Debug)]
enum NodeKey<K> {
    Head,
    Item(K),
    Tail,
}

impl<K: Ord> NodeKey<K> {
    /// Compares this node's key against a probe key
    #[inline]
    fn cmp_key(&self, key: &K) -> KeyOrdering {
        match self {
            NodeKey::Head => KeyOrdering::Less,
            NodeKey::Item(k) => k.cmp(key),
            NodeKey::Tail => KeyOrdering::Greater,
        }
    }
}

/// Skip-list node
///
/// `top_level` is immutable after creation; `next` holds exactly
/// `top_level + 1` forward pointers. The lock serializes writers of the
/// node's outgoing links; `marked` is the tombstone and `fully_linked` the
/// publication flag, both with acquire/release semantics.
struct Node<K> {
    key: NodeKey<K>,
    next: Box<[AtomicPtr<Node<K>>]>,
    top_level: usize,
    lock: Mutex<()>,
    marked: AtomicBool,
    fully_linked: AtomicBool,
}

impl<K> Node<K> {
    fn alloc(key: NodeKey<K>, top_level: usize, fully_linked: bool) -> *mut Node<K> {
        let next = (0..=top_level)
            .map(|_| AtomicPtr::new(ptr::null_mut()))
            .collect();
        Box::into_raw(Box::new(Node {
            key,
            next,
            top_level,
            lock: Mutex::new(()),
            marked: AtomicBool::new(false),
            fully_linked: AtomicBool::new(fully_linked),
        }))
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // Poisoning would mean a mutator panicked between validation and
        // splice; propagate rather than limp on.
        self.lock.lock().expect("skip list node lock poisoned")
    }
}

/// Concurrent sorted set of keys
///
/// Shared-reference API throughout: wrap the list in an `Arc` and call
/// `insert`/`remove`/`contains`/`range` from any number of threads.
pub struct SkipList<K> {
    head: *mut Node<K>,
    max_level: usize,
    len: AtomicUsize,
    /// Unlinked nodes awaiting reclamation in `Drop`
    graveyard: Mutex<Vec<*mut Node<K>>>,
    _marker: PhantomData<Box<Node<K>>>,
}

// SAFETY: all shared mutation goes through per-node mutexes and
// acquire/release atomics; raw node pointers never leave the structure and
// stay valid until `Drop` takes `&mut self`.
unsafe impl<K: Send> Send for SkipList<K> {}
unsafe impl<K: Send + Sync> Sync for SkipList<K> {}

impl<K: Ord> SkipList<K> {
    /// Creates a list whose level structure is sized for `max_elements`
    ///
    /// The top level is `floor(log2(max_elements))`, capped at 31; the
    /// geometric level sampler uses p = 1/2 to match.
    ///
    /// # Errors
    ///
    /// Returns `SiftError::InvalidParameter` if `max_elements` is 0.
    pub fn new(max_elements: u64) -> Result<Self> {
        validate_max_elements(max_elements)?;
        let max_level = ((max_elements as f64).log2().floor() as usize).min(LEVEL_CAP);

        let tail = Node::alloc(NodeKey::Tail, max_level, true);
        let head = Node::alloc(NodeKey::Head, max_level, true);
        // SAFETY: head was just allocated with max_level + 1 slots.
        unsafe {
            for level in 0..=max_level {
                (*head).next[level].store(tail, Ordering::Release);
            }
        }

        Ok(Self {
            head,
            max_level,
            len: AtomicUsize::new(0),
            graveyard: Mutex::new(Vec::new()),
            _marker: PhantomData,
        })
    }

    /// Highest level index any node of this list can occupy
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Number of keys logically in the set
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns true if the set holds no keys
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples a node height: geometric with p = 1/2, capped at `max_level`
    fn random_level(&self) -> usize {
        let mut rng = rand::rng();
        let mut level = 0;
        while level < self.max_level && rng.random::<bool>() {
            level += 1;
        }
        level
    }

    /// Lock-free traversal recording the neighborhood of `key`
    ///
    /// On return, `preds[ℓ]` is the rightmost node before `key` at level `ℓ`
    /// and `succs[ℓ]` its successor there. Both slices must have exactly
    /// `max_level + 1` slots. Returns the highest level whose successor
    /// carries `key`, marked or not.
    fn find(
        &self,
        key: &K,
        preds: &mut [*mut Node<K>],
        succs: &mut [*mut Node<K>],
    ) -> Option<usize> {
        debug_assert_eq!(preds.len(), self.max_level + 1);
        debug_assert_eq!(succs.len(), self.max_level + 1);

        let mut found = None;
        let mut pred = self.head;
        for level in (0..=self.max_level).rev() {
            // SAFETY: `pred` is the head or a node reached through a
            // level-`level` link, so it has a slot at `level`; nodes are not
            // freed while the list is shared.
            let mut curr = unsafe { (*pred).next[level].load(Ordering::Acquire) };
            loop {
                let curr_ref = unsafe { &*curr };
                if curr_ref.key.cmp_key(key) == KeyOrdering::Less {
                    pred = curr;
                    curr = curr_ref.next[level].load(Ordering::Acquire);
                } else {
                    break;
                }
            }
            // SAFETY: `curr` is reachable, see above.
            if found.is_none() && unsafe { (*curr).key.cmp_key(key) } == KeyOrdering::Equal {
                found = Some(level);
            }
            preds[level] = pred;
            succs[level] = curr;
        }
        found
    }

    /// Adds `key` to the set
    ///
    /// Returns `false` if an unmarked node with the same key is already
    /// present. Retries internally when validation loses a race.
    pub fn insert(&self, key: K) -> bool {
        let top_level = self.random_level();
        let mut preds = vec![ptr::null_mut(); self.max_level + 1];
        let mut succs = vec![ptr::null_mut(); self.max_level + 1];

        loop {
            if let Some(found) = self.find(&key, &mut preds, &mut succs) {
                // SAFETY: nodes recorded by `find` stay allocated.
                let node = unsafe { &*succs[found] };
                if !node.marked.load(Ordering::Acquire) {
                    // A concurrent inserter may still be splicing; once the
                    // node is published the key is simply taken.
                    while !node.fully_linked.load(Ordering::Acquire) {
                        std::hint::spin_loop();
                    }
                    return false;
                }
                // Marked victim still being unlinked; try again.
                continue;
            }

            let (guards, valid) = self.lock_and_validate_preds(&preds, &succs, top_level);
            if !valid {
                drop(guards);
                continue;
            }

            let node = Node::alloc(NodeKey::Item(key), top_level, false);
            // SAFETY: fresh allocation, not yet visible to anyone.
            let node_ref = unsafe { &*node };
            for level in 0..=top_level {
                node_ref.next[level].store(succs[level], Ordering::Relaxed);
            }
            // Splice bottom-up so the node is on the canonical level-0 list
            // before any shortcut level can reach it.
            for level in 0..=top_level {
                // SAFETY: validated predecessors, locked by `guards`.
                unsafe { &(*preds[level]).next[level] }.store(node, Ordering::Release);
            }
            node_ref.fully_linked.store(true, Ordering::Release);
            self.len.fetch_add(1, Ordering::AcqRel);
            return true;
        }
    }

    /// Removes `key` from the set
    ///
    /// Returns `false` if no published, unmarked node carries the key. Once
    /// the victim is marked the removal is committed: unlinking retries
    /// until it succeeds.
    pub fn remove(&self, key: &K) -> bool {
        let mut preds = vec![ptr::null_mut(); self.max_level + 1];
        let mut succs = vec![ptr::null_mut(); self.max_level + 1];

        let mut victim_guard: Option<MutexGuard<'_, ()>> = None;
        let mut victim: *mut Node<K> = ptr::null_mut();

        loop {
            let found = self.find(key, &mut preds, &mut succs);

            if victim_guard.is_none() {
                let Some(found) = found else { return false };
                victim = succs[found];
                // SAFETY: nodes recorded by `find` stay allocated.
                let v = unsafe { &*victim };
                // The candidate must be published, seen at its true top
                // level (otherwise a concurrent insert is mid-splice), and
                // not already claimed by another remover.
                if !v.fully_linked.load(Ordering::Acquire)
                    || v.top_level != found
                    || v.marked.load(Ordering::Acquire)
                {
                    return false;
                }
                let guard = v.guard();
                if v.marked.load(Ordering::Acquire) {
                    return false;
                }
                // Logical removal commits here; searches skip us from now on.
                v.marked.store(true, Ordering::Release);
                self.len.fetch_sub(1, Ordering::AcqRel);
                victim_guard = Some(guard);
            }

            // SAFETY: victim is marked and locked by us; it stays in place
            // until we unlink it.
            let v = unsafe { &*victim };
            let top_level = v.top_level;

            let (guards, valid) = self.lock_and_validate_victim(&preds, victim, top_level);
            if !valid {
                // The neighborhood moved. The mark stands; only the
                // physical unlink is retried.
                drop(guards);
                continue;
            }

            // Unlink top-down: shortcut levels lose the node first, the
            // canonical level-0 list last.
            for level in (0..=top_level).rev() {
                let succ = v.next[level].load(Ordering::Acquire);
                // SAFETY: validated predecessors, locked by `guards`.
                unsafe { &(*preds[level]).next[level] }.store(succ, Ordering::Release);
            }

            drop(guards);
            drop(victim_guard);

            // Readers may still stand on the node; quarantine it for `Drop`.
            self.graveyard
                .lock()
                .expect("skip list graveyard lock poisoned")
                .push(victim);
            return true;
        }
    }

    /// Tests whether `key` is logically in the set
    ///
    /// Lock-free; linearizes on the publication and tombstone flags.
    pub fn contains(&self, key: &K) -> bool {
        let mut preds = vec![ptr::null_mut(); self.max_level + 1];
        let mut succs = vec![ptr::null_mut(); self.max_level + 1];
        match self.find(key, &mut preds, &mut succs) {
            Some(found) => {
                // SAFETY: nodes recorded by `find` stay allocated.
                let node = unsafe { &*succs[found] };
                node.fully_linked.load(Ordering::Acquire) && !node.marked.load(Ordering::Acquire)
            }
            None => false,
        }
    }

    /// Collects the keys in `[lo, hi]`, in ascending order
    ///
    /// Takes no locks. Keys present and unmodified for the whole scan are
    /// guaranteed included; keys mutated concurrently may or may not appear.
    pub fn range(&self, lo: &K, hi: &K) -> Vec<K>
    where
        K: Clone,
    {
        if lo > hi {
            return Vec::new();
        }

        // Descend to the rightmost node before `lo` at level 0.
        let mut pred = self.head;
        for level in (0..=self.max_level).rev() {
            // SAFETY: same reachability argument as in `find`.
            let mut curr = unsafe { (*pred).next[level].load(Ordering::Acquire) };
            loop {
                let curr_ref = unsafe { &*curr };
                if curr_ref.key.cmp_key(lo) == KeyOrdering::Less {
                    pred = curr;
                    curr = curr_ref.next[level].load(Ordering::Acquire);
                } else {
                    break;
                }
            }
        }

        let mut out = Vec::new();
        // SAFETY: `pred` is reachable; walk the canonical bottom list.
        let mut curr = unsafe { (*pred).next[0].load(Ordering::Acquire) };
        loop {
            let node = unsafe { &*curr };
            match &node.key {
                NodeKey::Tail => break,
                NodeKey::Head => unreachable!("head cannot follow another node"),
                NodeKey::Item(k) => {
                    if k.cmp(hi) == KeyOrdering::Greater {
                        break;
                    }
                    if k.cmp(lo) != KeyOrdering::Less
                        && node.fully_linked.load(Ordering::Acquire)
                        && !node.marked.load(Ordering::Acquire)
                    {
                        out.push(k.clone());
                    }
                    curr = node.next[0].load(Ordering::Acquire);
                }
            }
        }
        out
    }

    /// Locks each distinct predecessor of levels `0..=top_level` and checks
    /// it still brackets the recorded successor
    fn lock_and_validate_preds<'a>(
        &'a self,
        preds: &[*mut Node<K>],
        succs: &[*mut Node<K>],
        top_level: usize,
    ) -> (Vec<MutexGuard<'a, ()>>, bool) {
        let guards = self.lock_distinct_preds(preds, top_level);
        for level in 0..=top_level {
            // SAFETY: nodes recorded by `find` stay allocated.
            let pred = unsafe { &*preds[level] };
            if pred.marked.load(Ordering::Acquire)
                || pred.next[level].load(Ordering::Acquire) != succs[level]
            {
                return (guards, false);
            }
        }
        (guards, true)
    }

    /// Remove-side validation: every predecessor must still point at the
    /// victim
    fn lock_and_validate_victim<'a>(
        &'a self,
        preds: &[*mut Node<K>],
        victim: *mut Node<K>,
        top_level: usize,
    ) -> (Vec<MutexGuard<'a, ()>>, bool) {
        let guards = self.lock_distinct_preds(preds, top_level);
        for level in 0..=top_level {
            // SAFETY: nodes recorded by `find` stay allocated.
            let pred = unsafe { &*preds[level] };
            if pred.marked.load(Ordering::Acquire)
                || pred.next[level].load(Ordering::Acquire) != victim
            {
                return (guards, false);
            }
        }
        (guards, true)
    }

    /// Locks each distinct predecessor once, in ascending level order of
    /// first occurrence
    ///
    /// One node may be the predecessor at several levels; locking it twice
    /// with a non-reentrant mutex would self-deadlock, so duplicates are
    /// skipped. Ascending levels mean descending key order, which is the
    /// crate-wide acquisition order.
    fn lock_distinct_preds<'a>(
        &'a self,
        preds: &[*mut Node<K>],
        top_level: usize,
    ) -> Vec<MutexGuard<'a, ()>> {
        let mut locked: Vec<*mut Node<K>> = Vec::with_capacity(top_level + 1);
        let mut guards = Vec::with_capacity(top_level + 1);
        for &pred in &preds[..=top_level] {
            if !locked.contains(&pred) {
                locked.push(pred);
                // SAFETY: nodes recorded by `find` stay allocated; the guard
                // borrows `self`'s lifetime, within which no node is freed.
                guards.push(unsafe { &*pred }.guard());
            }
        }
        guards
    }
}

impl<K> Drop for SkipList<K> {
    fn drop(&mut self) {
        // Exclusive access: no traversal can be in flight. Free the live
        // chain through level 0, then the quarantined nodes, which are
        // disjoint from it.
        let mut curr = self.head;
        while !curr.is_null() {
            // SAFETY: every chain node was allocated by `Node::alloc` and is
            // freed exactly once here.
            let node = unsafe { Box::from_raw(curr) };
            curr = node.next[0].load(Ordering::Relaxed);
        }
        let graveyard = std::mem::take(
            self.graveyard
                .get_mut()
                .expect("skip list graveyard lock poisoned"),
        );
        for ptr in graveyard {
            // SAFETY: quarantined nodes were unlinked from every level and
            // never re-enter the chain.
            drop(unsafe { Box::from_raw(ptr) });
        }
    }
}

impl<K: Ord + fmt::Debug> fmt::Debug for SkipList<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkipList")
            .field("len", &self.len())
            .field("max_level", &self.max_level)
            .finish()
    }
}
