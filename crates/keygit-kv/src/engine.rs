use crate::error::KvResult;

/// A key/value pair returned by prefix scans.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KvPair {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KvPair {
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }
}

/// Persistent, ordered, byte-string key-value store.
///
/// One instance is shared by every repository in the process, so
/// implementations must be safe for concurrent point operations. Keys and
/// values are opaque bytes; the engine knows nothing about repositories,
/// objects or references.
pub trait KvEngine: Send + Sync {
    /// Read the value stored under `key`. Returns `Ok(None)` on a miss.
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// Remove `key`. Returns `true` if it existed.
    fn delete(&self, key: &[u8]) -> KvResult<bool>;

    /// Every pair whose key starts with `prefix`, in ascending key order.
    ///
    /// The result is fully materialized; callers hold no engine lock while
    /// consuming it.
    fn scan_prefix(&self, prefix: &[u8]) -> KvResult<Vec<KvPair>>;

    /// Atomic single-key write-if-unchanged.
    ///
    /// Succeeds (returns `true`) only if the current value equals `expected`,
    /// where `None` means "absent". `new = None` deletes the key. No other
    /// writer can interleave between the comparison and the write.
    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> KvResult<bool>;

    /// Returns `true` if `key` is present.
    fn contains(&self, key: &[u8]) -> KvResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
