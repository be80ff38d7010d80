use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::engine::{KvEngine, KvPair};
use crate::error::{KvError, KvResult};

/// In-memory, `BTreeMap`-based engine.
///
/// Intended for tests and throwaway servers. Ordering matches the byte-wise
/// ordering of the persistent engines, so prefix scans behave identically.
pub struct MemoryEngine {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    /// Create a new empty engine.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if the engine holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All physical keys, in order. Handy for asserting on the persisted layout.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.entries
            .read()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> KvResult<Option<Vec<u8>>> {
        let map = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(map.get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> KvResult<()> {
        let mut map = self.entries.write().map_err(|_| KvError::Poisoned)?;
        map.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> KvResult<bool> {
        let mut map = self.entries.write().map_err(|_| KvError::Poisoned)?;
        Ok(map.remove(key).is_some())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> KvResult<Vec<KvPair>> {
        let map = self.entries.read().map_err(|_| KvError::Poisoned)?;
        Ok(scan_sorted(&map, prefix))
    }

    fn compare_and_swap(
        &self,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> KvResult<bool> {
        let mut map = self.entries.write().map_err(|_| KvError::Poisoned)?;
        if map.get(key).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        match new {
            Some(value) => {
                map.insert(key.to_vec(), value.to_vec());
            }
            None => {
                map.remove(key);
            }
        }
        Ok(true)
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("key_count", &self.len())
            .finish()
    }
}

/// Prefix scan over an ordered map, starting at the first key `>= prefix`.
pub(crate) fn scan_sorted(map: &BTreeMap<Vec<u8>, Vec<u8>>, prefix: &[u8]) -> Vec<KvPair> {
    map.range(prefix.to_vec()..)
        .take_while(|(k, _)| k.starts_with(prefix))
        .map(|(k, v)| KvPair::new(k.clone(), v.clone()))
        .collect()
}
