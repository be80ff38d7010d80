//! Object reachability.
//!
//! Links followed: commit → tree and parents, tree → entries (submodule
//! gitlinks excluded), tag → tagged object.

use std::collections::{HashSet, VecDeque};

use keygit_store::{ObjectStore, StoreError, StoredObject};
use keygit_types::{ObjectId, ObjectKind, OBJECT_ID_LEN};

use crate::error::{ProtocolError, ProtocolResult};

/// Tree entry mode of a submodule commit, which lives in another repository.
const GITLINK_MODE: &[u8] = b"160000";

/// Objects directly referenced by `object`.
pub fn links(object: &StoredObject) -> ProtocolResult<Vec<ObjectId>> {
    match object.kind {
        ObjectKind::Commit => header_links(object, &["tree", "parent"]),
        ObjectKind::Tag => header_links(object, &["object"]),
        ObjectKind::Tree => tree_links(object),
        ObjectKind::Blob => Ok(Vec::new()),
    }
}

fn malformed(object: &StoredObject, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::MalformedObject {
        id: object.id,
        kind: object.kind.as_str(),
        reason: reason.into(),
    }
}

/// Ids named by `<field> <hex>` header lines, which end at the first blank line.
fn header_links(object: &StoredObject, fields: &[&str]) -> ProtocolResult<Vec<ObjectId>> {
    let mut ids = Vec::new();
    for line in object.data.split(|&b| b == b'\n') {
        if line.is_empty() {
            break;
        }
        let Some(space) = line.iter().position(|&b| b == b' ') else {
            continue;
        };
        let (field, value) = (&line[..space], &line[space + 1..]);
        if !fields.iter().any(|f| f.as_bytes() == field) {
            continue;
        }
        let hex = std::str::from_utf8(value).map_err(|_| malformed(object, "non-UTF-8 header"))?;
        let id = ObjectId::from_hex(hex).map_err(|e| malformed(object, e.to_string()))?;
        ids.push(id);
    }
    Ok(ids)
}

/// Entries are `<mode> <name>\0<20-byte id>`, back to back.
fn tree_links(object: &StoredObject) -> ProtocolResult<Vec<ObjectId>> {
    let data = &object.data;
    let mut ids = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let space = data[pos..]
            .iter()
            .position(|&b| b == b' ')
            .ok_or_else(|| malformed(object, "entry without mode"))?;
        let mode = &data[pos..pos + space];
        let nul = data[pos + space..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| malformed(object, "entry without name terminator"))?;
        let id_start = pos + space + nul + 1;
        let id_end = id_start + OBJECT_ID_LEN;
        let raw = data
            .get(id_start..id_end)
            .ok_or_else(|| malformed(object, "truncated entry id"))?;
        if mode != GITLINK_MODE {
            ids.push(ObjectId::from_slice(raw).map_err(|e| malformed(object, e.to_string()))?);
        }
        pos = id_end;
    }
    Ok(ids)
}

/// Every object reachable from `roots` that exists in `store`. Missing
/// objects are skipped.
pub fn reachable(store: &dyn ObjectStore, roots: &[ObjectId]) -> ProtocolResult<HashSet<ObjectId>> {
    let mut seen = HashSet::new();
    let mut queue: VecDeque<ObjectId> = roots.iter().copied().collect();
    while let Some(id) = queue.pop_front() {
        if seen.contains(&id) {
            continue;
        }
        let object = match store.get(&id) {
            Ok(object) => object,
            Err(StoreError::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        };
        seen.insert(id);
        queue.extend(links(&object)?);
    }
    Ok(seen)
}

/// Objects a client that wants `wants` and has `haves` is missing, in
/// breadth-first order from the wants.
///
/// Everything reachable from a have is assumed present on the client. Every
/// other object reachable from a want must exist in `store`.
pub fn objects_to_send(
    store: &dyn ObjectStore,
    wants: &[ObjectId],
    haves: &[ObjectId],
) -> ProtocolResult<Vec<StoredObject>> {
    let mut excluded = reachable(store, haves)?;
    let mut queue: VecDeque<ObjectId> = wants.iter().copied().collect();
    let mut out = Vec::new();
    while let Some(id) = queue.pop_front() {
        if !excluded.insert(id) {
            continue;
        }
        let object = store.get(&id)?;
        queue.extend(links(&object)?);
        out.push(object);
    }
    Ok(out)
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Builders for well-formed git objects.

    use super::*;

    pub fn blob(content: &[u8]) -> StoredObject {
        StoredObject::hashed(ObjectKind::Blob, content.to_vec())
    }

    /// Tree of `(mode, name, id)` entries.
    pub fn tree(entries: &[(&str, &str, ObjectId)]) -> StoredObject {
        let mut data = Vec::new();
        for (mode, name, id) in entries {
            data.extend_from_slice(format!("{mode} {name}\0").as_bytes());
            data.extend_from_slice(id.as_bytes());
        }
        StoredObject::hashed(ObjectKind::Tree, data)
    }

    pub fn commit(tree: ObjectId, parents: &[ObjectId], message: &str) -> StoredObject {
        let mut text = format!("tree {tree}\n");
        for parent in parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str("author A U Thor <author@example.com> 1700000000 +0000\n");
        text.push_str("committer A U Thor <author@example.com> 1700000000 +0000\n");
        text.push_str(&format!("\n{message}\n"));
        StoredObject::hashed(ObjectKind::Commit, text.into_bytes())
    }

    pub fn tag(object: ObjectId, kind: ObjectKind, name: &str) -> StoredObject {
        let text = format!(
            "object {object}\ntype {kind}\ntag {name}\ntagger A U Thor <author@example.com> 1700000000 +0000\n\nrelease\n"
        );
        StoredObject::hashed(ObjectKind::Tag, text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use keygit_kv::MemoryEngine;
    use keygit_repo::Repository;
    use std::sync::Arc;

    fn store_with(objects: &[&StoredObject]) -> Repository {
        let repo = Repository::open(Arc::new(MemoryEngine::new()), "/o/r", "refs/heads/master");
        for object in objects {
            repo.put(object).unwrap();
        }
        repo
    }

    #[test]
    fn commit_links_tree_and_parents() {
        let t = tree(&[]);
        let parent = commit(t.id, &[], "first");
        let child = commit(t.id, &[parent.id], "second");
        assert_eq!(links(&child).unwrap(), vec![t.id, parent.id]);
    }

    #[test]
    fn commit_message_is_not_parsed() {
        let t = tree(&[]);
        let c = commit(t.id, &[], &format!("parent {}", ObjectId::zero()));
        assert_eq!(links(&c).unwrap(), vec![t.id]);
    }

    #[test]
    fn tree_links_skip_gitlinks() {
        let file = blob(b"file");
        let sub = tree(&[]);
        let module = ObjectId::from_hash([9; 20]);
        let t = tree(&[
            ("100644", "a.txt", file.id),
            ("40000", "dir", sub.id),
            ("160000", "vendor", module),
        ]);
        assert_eq!(links(&t).unwrap(), vec![file.id, sub.id]);
    }

    #[test]
    fn tag_links_object() {
        let b = blob(b"x");
        let t = tag(b.id, ObjectKind::Blob, "v1");
        assert_eq!(links(&t).unwrap(), vec![b.id]);
    }

    #[test]
    fn malformed_objects_rejected() {
        let bad_commit = StoredObject::hashed(ObjectKind::Commit, b"tree nothex\n\n".to_vec());
        assert!(matches!(
            links(&bad_commit),
            Err(ProtocolError::MalformedObject { .. })
        ));
        let bad_tree = StoredObject::hashed(ObjectKind::Tree, b"100644 name\0short".to_vec());
        assert!(matches!(
            links(&bad_tree),
            Err(ProtocolError::MalformedObject { .. })
        ));
    }

    #[test]
    fn full_history_when_client_has_nothing() {
        let file = blob(b"v1");
        let t1 = tree(&[("100644", "f", file.id)]);
        let c1 = commit(t1.id, &[], "one");
        let store = store_with(&[&file, &t1, &c1]);

        let objects = objects_to_send(&store, &[c1.id], &[]).unwrap();
        let ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![c1.id, t1.id, file.id]);
    }

    #[test]
    fn haves_prune_shared_history() {
        let f1 = blob(b"v1");
        let t1 = tree(&[("100644", "f", f1.id)]);
        let c1 = commit(t1.id, &[], "one");
        let f2 = blob(b"v2");
        let t2 = tree(&[("100644", "f", f2.id)]);
        let c2 = commit(t2.id, &[c1.id], "two");
        let store = store_with(&[&f1, &t1, &c1, &f2, &t2, &c2]);

        let objects = objects_to_send(&store, &[c2.id], &[c1.id]).unwrap();
        let mut ids: Vec<ObjectId> = objects.iter().map(|o| o.id).collect();
        ids.sort();
        let mut expected = vec![c2.id, t2.id, f2.id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn unknown_haves_are_ignored() {
        let file = blob(b"only");
        let store = store_with(&[&file]);
        let stranger = ObjectId::from_hash([3; 20]);
        let objects = objects_to_send(&store, &[file.id], &[stranger]).unwrap();
        assert_eq!(objects, vec![file]);
    }

    #[test]
    fn missing_wanted_object_is_an_error() {
        let store = store_with(&[]);
        let err = objects_to_send(&store, &[ObjectId::from_hash([1; 20])], &[]).unwrap_err();
        assert!(matches!(err, ProtocolError::Store(StoreError::NotFound(_))));
    }

    #[test]
    fn shared_subtrees_sent_once() {
        let file = blob(b"same");
        let t = tree(&[("100644", "a", file.id), ("100644", "b", file.id)]);
        let c = commit(t.id, &[], "dup");
        let store = store_with(&[&file, &t, &c]);
        let objects = objects_to_send(&store, &[c.id, c.id], &[]).unwrap();
        assert_eq!(objects.len(), 3);
    }
}
