use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::level::LevelGenerator;

type Link<K, V> = Option<Arc<Node<K, V>>>;

/// Everything a node's mutex protects: its payload and its forward links.
struct Tower<K, V> {
    value: Option<V>,
    forward: Vec<Link<K, V>>,
}

pub(crate) struct Node<K, V> {
    /// `None` only on the header sentinel. Immutable after construction, so
    /// traversals may compare keys without taking the node's lock.
    key: Option<K>,
    links: Mutex<Tower<K, V>>,
}

impl<K, V> Node<K, V> {
    fn new(key: K, value: V, level: usize, forward: Vec<Link<K, V>>) -> Arc<Node<K, V>> {
        debug_assert_eq!(forward.len(), level + 1);
        Arc::new(Node {
            key: Some(key),
            links: Mutex::new(Tower {
                value: Some(value),
                forward,
            }),
        })
    }

    fn header(max_level: usize) -> Arc<Node<K, V>> {
        Arc::new(Node {
            key: None,
            links: Mutex::new(Tower {
                value: None,
                forward: vec![None; max_level + 1],
            }),
        })
    }
}

impl<K: Ord, V> Node<K, V> {
    fn precedes(&self, key: &K) -> bool {
        match self.key.as_ref() {
            Some(k) => k < key,
            None => false,
        }
    }
}

/// A node together with its held lock. Handoff acquires the successor's
/// `Locked` before the predecessor's is dropped, which is the entire
/// lock-coupling discipline expressed in guard lifetimes.
struct Locked<K: 'static, V: 'static> {
    // Declared before `node` so the guard drops first.
    guard: MutexGuard<'static, Tower<K, V>>,
    node: Arc<Node<K, V>>,
}

impl<K: 'static, V: 'static> Locked<K, V> {
    fn acquire(node: Arc<Node<K, V>>) -> Locked<K, V> {
        let guard = node.links.lock().unwrap();
        // SAFETY: the guard borrows the mutex inside `node`, and `node` lives
        // in this struct for at least as long as the guard does. The arc's
        // pointee does not move.
        let guard = unsafe {
            mem::transmute::<MutexGuard<'_, Tower<K, V>>, MutexGuard<'static, Tower<K, V>>>(guard)
        };
        Locked { guard, node }
    }

    fn key(&self) -> Option<&K> {
        self.node.key.as_ref()
    }

    fn next(&self, level: usize) -> Option<&Arc<Node<K, V>>> {
        self.guard.forward[level].as_ref()
    }
}

/// Concurrent ordered index: a skip list whose nodes each carry their own
/// mutex, traversed hand over hand.
///
/// Writers descend the tower recording the frontier of predecessors whose
/// forward pointers they will rewrite; every recorded predecessor stays
/// locked until the splice is done. Locks are only ever taken in key order
/// along the list and top-down across levels, so waits cannot cycle.
pub(crate) struct SkipList<K, V> {
    header: Arc<Node<K, V>>,
    levels: Arc<dyn LevelGenerator>,
    max_level: usize,
    /// Highest level with at least one non-header node. Only written while
    /// the header's lock is held.
    top_level: AtomicUsize,
    count: AtomicUsize,
}

impl<K: Ord + 'static, V: 'static> SkipList<K, V> {
    pub(crate) fn new(max_level: usize, levels: Arc<dyn LevelGenerator>) -> SkipList<K, V> {
        SkipList {
            header: Node::header(max_level),
            levels,
            max_level,
            top_level: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) fn search(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let mut current = Locked::acquire(self.header.clone());
        let top = self.top_level.load(Ordering::SeqCst);

        for level in (0..=top).rev() {
            loop {
                let next = match current.next(level) {
                    Some(n) if n.precedes(key) => n.clone(),
                    _ => break,
                };
                // Assignment locks the successor before the old guard drops.
                current = Locked::acquire(next);
            }
        }

        let candidate = match current.next(0) {
            Some(n) => n.clone(),
            None => return None,
        };
        let candidate = Locked::acquire(candidate);
        drop(current);

        if candidate.key() == Some(key) {
            candidate.guard.value.clone()
        } else {
            None
        }
    }

    pub(crate) fn insert(&self, key: K, value: V) -> bool {
        let new_level = self.levels.random_level(self.max_level);

        let mut current = Locked::acquire(self.header.clone());
        let top = self.top_level.load(Ordering::SeqCst);

        // Retained predecessor locks in the order they were first passed.
        // `update[i]` is the index in `preds` of the node whose forward[i]
        // may be rewritten; the node itself lands at that index once the
        // descent moves past it (or with the final push below).
        let mut preds: Vec<Locked<K, V>> = Vec::new();
        let mut update = vec![0usize; top + 1];
        // When the new tower tops out above `top`, the header's own cells get
        // spliced, so its lock must survive the whole descent.
        let mut hold = new_level > top;

        for level in (0..=top).rev() {
            loop {
                let next = match current.next(level) {
                    Some(n) if n.precedes(&key) => n.clone(),
                    _ => break,
                };
                let next = Locked::acquire(next);
                let prev = mem::replace(&mut current, next);
                if hold {
                    preds.push(prev);
                } else {
                    drop(prev);
                }
                hold = false;
            }
            update[level] = preds.len();
            hold = true;
        }

        // The candidate's key is stable without its lock: its level-0
        // predecessor is `current`, which we hold.
        let exists = match current.next(0) {
            Some(n) => n.key.as_ref() == Some(&key),
            None => false,
        };
        if exists {
            // First writer wins; every retained guard drops exactly once.
            return false;
        }

        preds.push(current);
        let pred_at = |level: usize| if level <= top { update[level] } else { 0 };

        let mut forward = Vec::with_capacity(new_level + 1);
        for level in 0..=new_level {
            forward.push(preds[pred_at(level)].guard.forward[level].clone());
        }
        let node = Node::new(key, value, new_level, forward);

        for level in 0..=new_level {
            preds[pred_at(level)].guard.forward[level] = Some(node.clone());
        }

        if new_level > top {
            // Still under the header's lock, per the `hold` seed above.
            self.top_level.store(new_level, Ordering::SeqCst);
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        true
    }

    pub(crate) fn delete(&self, key: &K) {
        let mut current = Locked::acquire(self.header.clone());
        let top = self.top_level.load(Ordering::SeqCst);

        let mut preds: Vec<Locked<K, V>> = Vec::new();
        let mut update = vec![0usize; top + 1];
        let mut hold = false;

        for level in (0..=top).rev() {
            loop {
                let next = match current.next(level) {
                    Some(n) if n.precedes(key) => n.clone(),
                    _ => break,
                };
                let next = Locked::acquire(next);
                let prev = mem::replace(&mut current, next);
                if hold {
                    preds.push(prev);
                } else {
                    drop(prev);
                }
                hold = false;
            }
            update[level] = preds.len();
            hold = true;
        }

        let victim = match current.next(0) {
            Some(n) if n.key.as_ref() == Some(key) => n.clone(),
            _ => return,
        };
        preds.push(current);

        // The victim sits after update[0] in key order, so locking it here
        // keeps the forward acquisition order. Its forward links are read
        // under its own lock.
        let victim = Locked::acquire(victim);

        for level in 0..=top {
            let pred = &mut preds[update[level]];
            let linked = match pred.guard.forward[level] {
                Some(ref n) => Arc::ptr_eq(n, &victim.node),
                None => false,
            };
            // The first level where the victim is absent bounds its height.
            if !linked {
                break;
            }
            // The victim's own link goes in even when absent; that is what
            // empties the header's cell when the last node of a level dies.
            pred.guard.forward[level] = victim.guard.forward[level].clone();
        }

        // Trimming reads the header's cells, which is only legal under the
        // header's lock. When the header is not a retained predecessor, some
        // node below `key` still populates every level up to `top`, and no
        // trim is possible anyway.
        let mut new_top = top;
        loop {
            if new_top == 0 {
                break;
            }
            let pred = &preds[update[new_top]];
            if !Arc::ptr_eq(&pred.node, &self.header) || pred.guard.forward[new_top].is_some() {
                break;
            }
            new_top -= 1;
        }
        if new_top < top {
            self.top_level.store(new_top, Ordering::SeqCst);
        }

        self.count.fetch_sub(1, Ordering::SeqCst);
        // The list's references are gone; the node is freed once the last
        // concurrent traverser drops its own arc.
    }

    /// Walks the level-0 chain hand over hand, yielding each pair under the
    /// node's lock. Concurrent writers elsewhere in the list proceed; the
    /// window under the walk is pinned.
    pub(crate) fn scan<F>(&self, mut visit: F) -> crate::error::Result<()>
    where
        F: FnMut(&K, &V) -> crate::error::Result<()>,
    {
        let mut current = Locked::acquire(self.header.clone());
        loop {
            let next = match current.next(0) {
                Some(n) => n.clone(),
                None => return Ok(()),
            };
            current = Locked::acquire(next);
            if let (Some(key), Some(value)) = (current.node.key.as_ref(), current.guard.value.as_ref())
            {
                visit(key, value)?;
            }
        }
    }
}

impl<K, V> Drop for SkipList<K, V> {
    fn drop(&mut self) {
        // Unchain level 0 iteratively; letting the arc chain unwind on its
        // own would recurse once per node.
        let mut next = {
            let mut header = match self.header.links.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let first = header.forward[0].take();
            for link in header.forward.iter_mut() {
                *link = None;
            }
            first
        };
        while let Some(node) = next {
            let mut tower = match node.links.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            next = tower.forward[0].take();
            for link in tower.forward.iter_mut() {
                *link = None;
            }
        }
    }
}

#[cfg(test)]
impl<K: Ord, V> SkipList<K, V> {
    pub(crate) fn top(&self) -> usize {
        self.top_level.load(Ordering::SeqCst)
    }

    /// Structural self-check for quiescent moments in tests: per-level
    /// ordering, level containment, height bounds, top-level tightness and
    /// count accuracy.
    pub(crate) fn check_invariants(&self) {
        let top = self.top_level.load(Ordering::SeqCst);
        assert!(top <= self.max_level);

        let header = self.header.links.lock().unwrap();
        assert_eq!(header.forward.len(), self.max_level + 1);
        assert!(top == 0 || header.forward[top].is_some(), "top level is tight");
        for level in top + 1..=self.max_level {
            assert!(header.forward[level].is_none());
        }

        let mut chains: Vec<Vec<*const Node<K, V>>> = Vec::with_capacity(top + 1);
        for level in 0..=top {
            let mut chain = Vec::new();
            let mut prev: Option<Arc<Node<K, V>>> = None;
            let mut link = header.forward[level].clone();
            while let Some(node) = link {
                if let Some(ref p) = prev {
                    assert!(
                        p.key.as_ref().unwrap() < node.key.as_ref().unwrap(),
                        "keys strictly increase along level {}",
                        level
                    );
                }
                let tower = node.links.lock().unwrap();
                assert!(tower.forward.len() <= self.max_level + 1);
                assert!(tower.forward.len() > level);
                chain.push(Arc::as_ptr(&node));
                link = tower.forward[level].clone();
                drop(tower);
                prev = Some(node);
            }
            chains.push(chain);
        }

        for level in 1..chains.len() {
            for node in &chains[level] {
                assert!(
                    chains[level - 1].contains(node),
                    "every node at level {} also appears one level down",
                    level
                );
            }
        }

        assert_eq!(chains[0].len(), self.count.load(Ordering::SeqCst));
    }
}
