use std::collections::HashMap;

use keygit_kv::ScopedKv;
use keygit_types::{ObjectId, ObjectKind};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::StoredObject;
use crate::traits::ObjectStore;

const OBJECTS_PREFIX: &str = "objects/";
const TYPE_SUFFIX: &str = "/type";

/// Object store over one repository partition of the shared engine.
#[derive(Clone, Debug)]
pub struct KvObjectStore {
    kv: ScopedKv,
}

impl KvObjectStore {
    pub fn new(kv: ScopedKv) -> Self {
        Self { kv }
    }

    fn payload_key(id: &ObjectId) -> Vec<u8> {
        format!("{OBJECTS_PREFIX}{id}").into_bytes()
    }

    fn type_key(id: &ObjectId) -> Vec<u8> {
        format!("{OBJECTS_PREFIX}{id}{TYPE_SUFFIX}").into_bytes()
    }
}

fn parse_kind(key: &[u8], value: &[u8]) -> StoreResult<ObjectKind> {
    let decode_err = |reason: String| StoreError::Decode {
        key: String::from_utf8_lossy(key).into_owned(),
        reason,
    };
    let name = std::str::from_utf8(value).map_err(|e| decode_err(e.to_string()))?;
    name.parse().map_err(|e: keygit_types::TypeError| decode_err(e.to_string()))
}

impl ObjectStore for KvObjectStore {
    fn put(&self, object: &StoredObject) -> StoreResult<ObjectId> {
        self.kv
            .put(&Self::type_key(&object.id), object.kind.as_str().as_bytes())?;
        self.kv.put(&Self::payload_key(&object.id), &object.data)?;
        debug!(repo = self.kv.repo(), id = %object.id, kind = %object.kind, size = object.size, "stored object");
        Ok(object.id)
    }

    fn get(&self, id: &ObjectId) -> StoreResult<StoredObject> {
        let payload_key = Self::payload_key(id);
        let type_key = Self::type_key(id);

        let mut kind = None;
        let mut payload = None;
        for pair in self.kv.scan(&payload_key)? {
            if pair.key == type_key {
                kind = Some(parse_kind(&pair.key, &pair.value)?);
            } else if pair.key == payload_key {
                payload = Some(pair.value);
            }
        }

        match (payload, kind) {
            (Some(data), Some(kind)) => Ok(StoredObject::new(*id, kind, data)),
            (Some(_), None) => Err(StoreError::Decode {
                key: String::from_utf8_lossy(&payload_key).into_owned(),
                reason: "payload has no type tag".into(),
            }),
            (None, _) => Err(StoreError::NotFound(*id)),
        }
    }

    fn has(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.kv.contains(&Self::payload_key(id))?)
    }

    fn iter_kind(&self, kind: ObjectKind) -> StoreResult<Vec<StoredObject>> {
        let mut kinds: HashMap<String, ObjectKind> = HashMap::new();
        let mut payloads: HashMap<String, Vec<u8>> = HashMap::new();

        for pair in self.kv.scan(OBJECTS_PREFIX.as_bytes())? {
            let key = String::from_utf8_lossy(&pair.key);
            let Some(rest) = key.strip_prefix(OBJECTS_PREFIX) else {
                continue;
            };
            match rest.strip_suffix(TYPE_SUFFIX) {
                Some(hex) => {
                    kinds.insert(hex.to_string(), parse_kind(&pair.key, &pair.value)?);
                }
                None => {
                    payloads.insert(rest.to_string(), pair.value);
                }
            }
        }

        let mut objects = Vec::new();
        for (hex, found) in kinds {
            if found != kind {
                continue;
            }
            // A tag without payload is a half-finished put; skip it.
            let Some(data) = payloads.remove(&hex) else {
                continue;
            };
            let id = ObjectId::from_hex(&hex).map_err(|e| StoreError::Decode {
                key: format!("{OBJECTS_PREFIX}{hex}"),
                reason: e.to_string(),
            })?;
            objects.push(StoredObject::new(id, kind, data));
        }
        Ok(objects)
    }
}
