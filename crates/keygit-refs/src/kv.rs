//! Engine-backed reference store.
//!
//! Each ref is one logical key (its full name) inside the repository's
//! partition. HEAD is synthesized from the configured default branch and
//! never touches storage.

use std::sync::Arc;

use keygit_kv::ScopedKv;
use tracing::debug;

use crate::error::{RefError, Result};
use crate::traits::RefStore;
use crate::types::{Reference, HEAD};

/// Default branch HEAD points at unless configured otherwise.
pub const DEFAULT_BRANCH: &str = "refs/heads/master";

const REFS_PREFIX: &[u8] = b"refs/";

/// A [`RefStore`] over one repository partition of the shared engine.
#[derive(Clone, Debug)]
pub struct KvRefStore {
    kv: ScopedKv,
    default_branch: Arc<str>,
}

impl KvRefStore {
    /// Create a store whose HEAD points at `default_branch`.
    pub fn new(kv: ScopedKv, default_branch: impl Into<Arc<str>>) -> Self {
        Self {
            kv,
            default_branch: default_branch.into(),
        }
    }

    /// The branch the synthesized HEAD points at.
    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    fn head(&self) -> Reference {
        Reference::symbolic(HEAD, self.default_branch.as_ref())
    }

    fn reject_head(name: &str) -> Result<()> {
        if name == HEAD {
            return Err(RefError::SynthesizedHead);
        }
        Ok(())
    }
}

impl RefStore for KvRefStore {
    fn set(&self, reference: &Reference) -> Result<()> {
        Self::reject_head(reference.name())?;
        self.kv.put(reference.name().as_bytes(), &reference.encode())?;
        debug!(repo = self.kv.repo(), reference = %reference, "set ref");
        Ok(())
    }

    fn compare_and_set(&self, new: &Reference, old: Option<&Reference>) -> Result<()> {
        let name = new.name();
        Self::reject_head(name)?;
        let key = name.as_bytes();
        let conflict = || RefError::Conflict {
            name: name.to_string(),
        };

        let current = self.kv.get(key)?;
        if let Some(expected) = old {
            let Some(raw) = current.as_deref() else {
                return Err(conflict());
            };
            // An undecodable stored value cannot equal `expected`.
            match Reference::decode(name, raw) {
                Ok(stored) if stored.encode() == expected.encode() => {}
                _ => return Err(conflict()),
            }
        }

        let swapped = self
            .kv
            .compare_and_swap(key, current.as_deref(), Some(&new.encode()))?;
        if !swapped {
            return Err(conflict());
        }
        debug!(repo = self.kv.repo(), reference = %new, "compare-and-set ref");
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Reference> {
        if name == HEAD {
            return Ok(self.head());
        }
        match self.kv.get(name.as_bytes())? {
            Some(raw) => Reference::decode(name, &raw),
            None => Err(RefError::NotFound {
                name: name.to_string(),
            }),
        }
    }

    fn iter_all(&self) -> Result<Vec<Reference>> {
        self.kv
            .scan(REFS_PREFIX)?
            .into_iter()
            .map(|pair| {
                let name = String::from_utf8(pair.key).map_err(|e| RefError::Decode {
                    name: String::from_utf8_lossy(e.as_bytes()).into_owned(),
                    reason: "ref name is not valid UTF-8".into(),
                })?;
                Reference::decode(&name, &pair.value)
            })
            .collect()
    }

    fn remove(&self, name: &str) -> Result<()> {
        Self::reject_head(name)?;
        let existed = self.kv.delete(name.as_bytes())?;
        debug!(repo = self.kv.repo(), name, existed, "removed ref");
        Ok(())
    }

    fn count_loose(&self) -> Result<usize> {
        Ok(self.kv.scan(REFS_PREFIX)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygit_kv::{KvEngine, MemoryEngine};
    use keygit_types::ObjectId;
    use proptest::prelude::*;

    fn id(byte: u8) -> ObjectId {
        ObjectId::from_hash([byte; 20])
    }

    fn store_on(engine: &Arc<MemoryEngine>, repo: &str) -> KvRefStore {
        KvRefStore::new(ScopedKv::new(engine.clone(), repo), DEFAULT_BRANCH)
    }

    fn store() -> KvRefStore {
        store_on(&Arc::new(MemoryEngine::new()), "/owner/repo")
    }

    // -----------------------------------------------------------------------
    // HEAD
    // -----------------------------------------------------------------------

    #[test]
    fn head_is_synthesized_on_empty_repo() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = store_on(&engine, "/nobody/nothing");
        let head = refs.get("HEAD").unwrap();
        assert_eq!(head, Reference::symbolic("HEAD", "refs/heads/master"));
        assert!(engine.is_empty());
    }

    #[test]
    fn head_follows_configured_default() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = KvRefStore::new(ScopedKv::new(engine, "/o/r"), "refs/heads/main");
        assert_eq!(refs.default_branch(), "refs/heads/main");
        assert_eq!(
            refs.get("HEAD").unwrap().symbolic_target(),
            Some("refs/heads/main")
        );
    }

    #[test]
    fn writes_to_head_are_rejected() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = store_on(&engine, "/o/r");
        let direct = Reference::direct("HEAD", id(1));

        assert!(matches!(refs.set(&direct), Err(RefError::SynthesizedHead)));
        assert!(matches!(
            refs.compare_and_set(&direct, None),
            Err(RefError::SynthesizedHead)
        ));
        assert!(matches!(refs.remove("HEAD"), Err(RefError::SynthesizedHead)));
        assert!(engine.is_empty());
        assert!(refs.get("HEAD").unwrap().is_symbolic());
    }

    #[test]
    fn head_resolves_through_default_branch() {
        let refs = store();
        assert!(matches!(
            refs.resolve("HEAD"),
            Err(RefError::NotFound { ref name }) if name == "refs/heads/master"
        ));
        refs.set(&Reference::direct("refs/heads/master", id(3))).unwrap();
        assert_eq!(refs.resolve("HEAD").unwrap(), id(3));
    }

    #[test]
    fn resolve_stops_on_cycles() {
        let refs = store();
        refs.set(&Reference::symbolic("refs/heads/a", "refs/heads/b")).unwrap();
        refs.set(&Reference::symbolic("refs/heads/b", "refs/heads/a")).unwrap();
        assert!(matches!(
            refs.resolve("refs/heads/a"),
            Err(RefError::Decode { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // set / get / remove
    // -----------------------------------------------------------------------

    #[test]
    fn set_and_get_direct() {
        let refs = store();
        let r = Reference::direct("refs/heads/main", id(7));
        refs.set(&r).unwrap();
        assert_eq!(refs.get("refs/heads/main").unwrap(), r);
    }

    #[test]
    fn set_and_get_symbolic() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = store_on(&engine, "/o/r");
        let r = Reference::symbolic("refs/remotes/origin/HEAD", "refs/remotes/origin/main");
        refs.set(&r).unwrap();
        assert_eq!(refs.get("refs/remotes/origin/HEAD").unwrap(), r);
        assert_eq!(
            engine.get(b"/o/r/refs/remotes/origin/HEAD").unwrap(),
            Some(b"ref: refs/remotes/origin/main\n".to_vec())
        );
    }

    #[test]
    fn set_overwrites() {
        let refs = store();
        refs.set(&Reference::direct("refs/heads/main", id(1))).unwrap();
        refs.set(&Reference::direct("refs/heads/main", id(2))).unwrap();
        assert_eq!(refs.get("refs/heads/main").unwrap().object_id(), Some(id(2)));
    }

    #[test]
    fn get_missing_is_not_found() {
        let refs = store();
        assert!(matches!(
            refs.get("refs/heads/nope"),
            Err(RefError::NotFound { .. })
        ));
    }

    #[test]
    fn get_garbage_is_decode_error() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = store_on(&engine, "/o/r");
        engine.put(b"/o/r/refs/heads/bad", b"zzzz").unwrap();
        assert!(matches!(
            refs.get("refs/heads/bad"),
            Err(RefError::Decode { .. })
        ));
        assert!(matches!(refs.iter_all(), Err(RefError::Decode { .. })));
    }

    #[test]
    fn remove_deletes_and_tolerates_absence() {
        let refs = store();
        refs.set(&Reference::direct("refs/tags/v1", id(1))).unwrap();
        refs.remove("refs/tags/v1").unwrap();
        assert!(matches!(refs.get("refs/tags/v1"), Err(RefError::NotFound { .. })));
        refs.remove("refs/tags/v1").unwrap();
    }

    // -----------------------------------------------------------------------
    // Enumeration
    // -----------------------------------------------------------------------

    #[test]
    fn iter_all_is_sorted_and_scoped_to_refs() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = store_on(&engine, "/o/r");
        refs.set(&Reference::direct("refs/tags/v1", id(2))).unwrap();
        refs.set(&Reference::direct("refs/heads/main", id(1))).unwrap();
        engine.put(b"/o/r/refsfoo", b"ignored").unwrap();
        engine.put(b"/o/r/objects/abc", b"ignored").unwrap();

        let names: Vec<String> = refs
            .iter_all()
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["refs/heads/main", "refs/tags/v1"]);
        assert_eq!(refs.count_loose().unwrap(), 2);
    }

    #[test]
    fn empty_repo_has_no_loose_refs() {
        let refs = store();
        assert!(refs.iter_all().unwrap().is_empty());
        assert_eq!(refs.count_loose().unwrap(), 0);
    }

    #[test]
    fn pack_refs_is_not_implemented() {
        let refs = store();
        assert!(matches!(refs.pack_refs(), Err(RefError::NotImplemented(_))));
    }

    // -----------------------------------------------------------------------
    // compare_and_set
    // -----------------------------------------------------------------------

    #[test]
    fn cas_succeeds_when_old_matches() {
        let refs = store();
        let old = Reference::direct("refs/heads/main", id(1));
        let new = Reference::direct("refs/heads/main", id(2));
        refs.set(&old).unwrap();
        refs.compare_and_set(&new, Some(&old)).unwrap();
        assert_eq!(refs.get("refs/heads/main").unwrap(), new);
    }

    #[test]
    fn cas_conflicts_on_stale_old() {
        let refs = store();
        refs.set(&Reference::direct("refs/heads/main", id(1))).unwrap();
        let stale = Reference::direct("refs/heads/main", id(9));
        let new = Reference::direct("refs/heads/main", id(2));

        assert!(matches!(
            refs.compare_and_set(&new, Some(&stale)),
            Err(RefError::Conflict { .. })
        ));
        assert_eq!(refs.get("refs/heads/main").unwrap().object_id(), Some(id(1)));
    }

    #[test]
    fn cas_conflicts_when_ref_is_absent() {
        let refs = store();
        let old = Reference::direct("refs/heads/main", id(1));
        let new = Reference::direct("refs/heads/main", id(2));
        assert!(matches!(
            refs.compare_and_set(&new, Some(&old)),
            Err(RefError::Conflict { .. })
        ));
        assert!(matches!(refs.get("refs/heads/main"), Err(RefError::NotFound { .. })));
    }

    #[test]
    fn cas_conflicts_on_undecodable_stored_value() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = store_on(&engine, "/o/r");
        engine.put(b"/o/r/refs/heads/main", b"zzzz").unwrap();
        let old = Reference::direct("refs/heads/main", id(1));
        let new = Reference::direct("refs/heads/main", id(2));

        assert!(matches!(
            refs.compare_and_set(&new, Some(&old)),
            Err(RefError::Conflict { .. })
        ));
        assert_eq!(
            engine.get(b"/o/r/refs/heads/main").unwrap(),
            Some(b"zzzz".to_vec())
        );
    }

    #[test]
    fn cas_without_old_stores_unconditionally() {
        let refs = store();
        let first = Reference::direct("refs/heads/main", id(1));
        refs.compare_and_set(&first, None).unwrap();
        let second = Reference::direct("refs/heads/main", id(2));
        refs.compare_and_set(&second, None).unwrap();
        assert_eq!(refs.get("refs/heads/main").unwrap(), second);
    }

    #[test]
    fn cas_does_not_touch_other_keys() {
        let engine = Arc::new(MemoryEngine::new());
        let refs = store_on(&engine, "/o/r");
        engine.put(b"/o/r/key", b"keep").unwrap();
        refs.compare_and_set(&Reference::direct("refs/heads/main", id(1)), None)
            .unwrap();
        assert_eq!(engine.get(b"/o/r/key").unwrap(), Some(b"keep".to_vec()));
    }

    #[test]
    fn concurrent_cas_has_single_winner() {
        use std::thread;

        let refs = store();
        let old = Reference::direct("refs/heads/main", id(0));
        refs.set(&old).unwrap();

        let handles: Vec<_> = (1..=8u8)
            .map(|i| {
                let refs = refs.clone();
                let old = old.clone();
                thread::spawn(move || {
                    refs.compare_and_set(&Reference::direct("refs/heads/main", id(i)), Some(&old))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread should not panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    // -----------------------------------------------------------------------
    // Partition isolation
    // -----------------------------------------------------------------------

    #[test]
    fn repositories_do_not_share_refs() {
        let engine = Arc::new(MemoryEngine::new());
        let a = store_on(&engine, "/a");
        let ab = store_on(&engine, "/ab");

        a.set(&Reference::direct("refs/heads/main", id(1))).unwrap();
        assert!(matches!(ab.get("refs/heads/main"), Err(RefError::NotFound { .. })));
        assert!(ab.iter_all().unwrap().is_empty());

        ab.set(&Reference::direct("refs/heads/main", id(2))).unwrap();
        assert_eq!(a.get("refs/heads/main").unwrap().object_id(), Some(id(1)));
    }

    proptest! {
        #[test]
        fn set_get_preserves_target(
            branch in "[a-z][a-z0-9-]{0,15}",
            bytes in prop::array::uniform20(any::<u8>()),
        ) {
            let refs = store();
            let name = format!("refs/heads/{branch}");
            let r = Reference::direct(name.clone(), ObjectId::from_hash(bytes));
            refs.set(&r).unwrap();
            prop_assert_eq!(refs.get(&name).unwrap(), r);
        }
    }
}
