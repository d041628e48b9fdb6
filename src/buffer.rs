//! This module provides the in-memory, per-session buffers the pipeline
//! accumulates log entries in between flush sweeps.
//!
//! Each session owns its own bucket behind its own mutex, so concurrent
//! requests for different sessions never contend. The outer map lock is held
//! only long enough to look up or create a bucket handle — never across a
//! drain and never during I/O.
use std::collections::HashMap;
use std::mem;
use std::sync::{Arc, Mutex, RwLock};

type Bucket<E> = Arc<Mutex<Vec<E>>>;

/// A concurrent buffer of log entries, keyed by session identifier.
///
/// Entries are immutable once added and leave the buffer only through a
/// drain. Draining a bucket and adding to it are serialized by the bucket's
/// mutex, so an entry is either part of the current drain or buffered for
/// the next one — never both, never neither.
///
/// A drained bucket stays in the map (empty) rather than being removed:
/// a concurrent writer may still hold its handle, and removal could strand
/// that writer's entries. The forced full-sweep cadence is the reclamation
/// path for sessions that never report again.
pub struct SessionBuffer<E> {
    buckets: RwLock<HashMap<String, Bucket<E>>>,
}

impl<E> Default for SessionBuffer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SessionBuffer<E> {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the session's bucket handle, creating it on first write.
    fn bucket(&self, session_id: &str) -> Bucket<E> {
        if let Some(bucket) = self.buckets.read().unwrap().get(session_id) {
            return bucket.clone();
        }

        self.buckets
            .write()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Appends a single entry to the session's bucket.
    pub fn add(&self, session_id: &str, entry: E) {
        self.bucket(session_id).lock().unwrap().push(entry);
    }

    /// Appends a batch of entries to the session's bucket, preserving order.
    pub fn add_all(&self, session_id: &str, entries: impl IntoIterator<Item = E>) {
        self.bucket(session_id).lock().unwrap().extend(entries);
    }

    /// Atomically removes and returns everything buffered for one session.
    ///
    /// Entries added after the swap belong to the next drain. An unknown
    /// session yields an empty vec.
    pub fn drain(&self, session_id: &str) -> Vec<E> {
        match self.buckets.read().unwrap().get(session_id) {
            Some(bucket) => mem::take(&mut *bucket.lock().unwrap()),
            None => Vec::new(),
        }
    }

    /// Drains, per session, exactly the entries matching `predicate` —
    /// but only from sessions holding at least `min_count` matches.
    ///
    /// Sessions below the threshold are left untouched so their entries
    /// accumulate toward the next sweep. Non-matching entries stay buffered
    /// in insertion order. Bucket handles are snapshotted up front; the map
    /// lock is not held while buckets are visited.
    pub fn drain_matching<F>(&self, min_count: usize, predicate: F) -> HashMap<String, Vec<E>>
    where
        F: Fn(&E) -> bool,
    {
        let snapshot: Vec<(String, Bucket<E>)> = self
            .buckets
            .read()
            .unwrap()
            .iter()
            .map(|(session_id, bucket)| (session_id.clone(), bucket.clone()))
            .collect();

        let mut drained = HashMap::new();
        for (session_id, bucket) in snapshot {
            let mut entries = bucket.lock().unwrap();

            let matches = entries.iter().filter(|entry| predicate(entry)).count();
            if matches == 0 || matches < min_count {
                continue;
            }

            let (matched, kept): (Vec<E>, Vec<E>) =
                mem::take(&mut *entries).into_iter().partition(&predicate);
            *entries = kept;

            drained.insert(session_id, matched);
        }

        drained
    }

    /// Atomically empties every session's bucket and returns the contents.
    ///
    /// Sessions that happened to be empty are omitted from the result.
    pub fn drain_all(&self) -> HashMap<String, Vec<E>> {
        let snapshot: Vec<(String, Bucket<E>)> = self
            .buckets
            .read()
            .unwrap()
            .iter()
            .map(|(session_id, bucket)| (session_id.clone(), bucket.clone()))
            .collect();

        let mut drained = HashMap::new();
        for (session_id, bucket) in snapshot {
            let entries = mem::take(&mut *bucket.lock().unwrap());
            if !entries.is_empty() {
                drained.insert(session_id, entries);
            }
        }

        drained
    }

    /// Number of entries currently buffered for one session.
    pub fn count(&self, session_id: &str) -> usize {
        match self.buckets.read().unwrap().get(session_id) {
            Some(bucket) => bucket.lock().unwrap().len(),
            None => 0,
        }
    }

    /// Number of sessions that have written at least once since startup.
    pub fn session_count(&self) -> usize {
        self.buckets.read().unwrap().len()
    }
}
