//! Shared types for the map-reduce-lite runtime.
//!
//! Users specify a map and a reduce function, and a coordinator hands out
//! map and reduce tasks to a pool of workers running in the same process.
//! Intermediate and output data is kept as tab-separated text files in a
//! working directory.

use std::fmt;
use std::fmt::Formatter;
use std::hash::Hasher;

use bytes::Bytes;

pub mod codec;
pub mod task;
pub mod utils;

pub use task::{MapTask, ReduceTask, Task, TaskId, TaskKind};

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// The output of an application map function.
///
/// There are 2 layers of [`anyhow::Result`]s here. The outer layer
/// accounts for errors that arise while creating the iterator.
/// The inner layer accounts for errors that occur during iteration.
///
/// This accomodates both batch (all keys emitted at once) and lazy
/// (keys only emitted when the iterator is consumed) map operations.
pub type MapOutput = anyhow::Result<Box<dyn Iterator<Item = anyhow::Result<KeyValue>>>>;

/// A map function takes a key-value pair and auxiliary arguments.
///
/// The input pair is `(source name, source content)`. It returns an
/// iterator that yields new key-value pairs.
pub type MapFn = fn(kv: KeyValue, aux: Bytes) -> MapOutput;

/// A reduce function takes in a key, an iterator over values for that key,
/// and an auxiliary argument. It returns an [`anyhow::Result`]
/// containing a single output value.
pub type ReduceFn = fn(
    key: Bytes,
    values: Box<dyn Iterator<Item = Bytes> + '_>,
    aux: Bytes,
) -> anyhow::Result<Bytes>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

impl fmt::Debug for Workload {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workload").finish_non_exhaustive()
    }
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KeyValue {
    /// The key.
    pub key: Bytes,

    /// The value.
    pub value: Bytes,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}",
            String::from_utf8_lossy(&self.key),
            String::from_utf8_lossy(&self.value)
        )
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Get the key of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn key(&self) -> Bytes {
        self.key.clone()
    }

    /// Get the value of this key-value pair.
    ///
    /// This method is cheap, since [`Bytes`] are cheaply cloneable.
    #[inline]
    pub fn value(&self) -> Bytes {
        self.value.clone()
    }

    /// Consumes the key-value pair and returns the key.
    #[inline]
    pub fn into_key(self) -> Bytes {
        self.key
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> Bytes {
        self.value
    }
}

/////////////////////////////////////////////////////////////////////////////
// Partitioning
/////////////////////////////////////////////////////////////////////////////

/// Hashes an intermediate key with 64-bit FNV-1a, masked to 31 bits.
///
/// The hash is fixed (no per-process seed), so every map task in a run
/// sends a given key to the same partition.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Compute the reduce bucket for a given key by calculating
/// `ihash(key) % n_reduce`.
///
/// `n_reduce` must be positive.
pub fn partition(key: &[u8], n_reduce: u32) -> u32 {
    ihash(key) % n_reduce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihash_is_deterministic() {
        assert_eq!(ihash(b"fox"), ihash(b"fox"));
        assert_ne!(ihash(b"fox"), ihash(b"the"));
    }

    #[test]
    fn ihash_matches_fnv1a() {
        // FNV-1a 64 of the empty input is the offset basis.
        assert_eq!(ihash(b""), (0xcbf2_9ce4_8422_2325u64 & 0x7fff_ffff) as u32);
    }

    #[test]
    fn partition_stays_in_range() {
        for n_reduce in 1..8 {
            for word in ["the", "quick", "fox", "lazy", "", "ünïcode"] {
                assert!(partition(word.as_bytes(), n_reduce) < n_reduce);
            }
        }
    }

    #[test]
    fn single_partition_takes_every_key() {
        for word in ["a", "b", "zebra"] {
            assert_eq!(partition(word.as_bytes(), 1), 0);
        }
    }

    #[test]
    fn key_value_display_is_tab_separated() {
        let kv = KeyValue::new("fox", "2");
        assert_eq!(kv.to_string(), "fox\t2");
        assert_eq!(kv.key(), Bytes::from("fox"));
        assert_eq!(kv.into_value(), Bytes::from("2"));
    }
}
