use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use keygit_store::StoredObject;
use keygit_types::ObjectHasher;

use crate::error::{ProtocolError, ProtocolResult};
use crate::pack::entry::{encode_entry_header, PackObjectType};
use crate::pack::PACK_SIGNATURE;

const PACK_VERSION: u32 = 2;

/// Builds a version 2 pack from whole objects.
#[derive(Debug, Default)]
pub struct PackWriter {
    objects: Vec<StoredObject>,
}

impl PackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an object; objects are written in insertion order.
    pub fn add(&mut self, object: StoredObject) {
        self.objects.push(object);
    }

    /// Number of objects queued.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Serialize header, entries and SHA-1 trailer.
    pub fn finish(self) -> ProtocolResult<Vec<u8>> {
        let count = u32::try_from(self.objects.len()).map_err(|_| ProtocolError::CorruptPack {
            offset: 0,
            reason: "too many objects for one pack".into(),
        })?;

        let mut pack = Vec::new();
        pack.extend_from_slice(PACK_SIGNATURE);
        pack.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack.extend_from_slice(&count.to_be_bytes());

        for object in &self.objects {
            encode_entry_header(
                &mut pack,
                PackObjectType::Full(object.kind),
                object.data.len() as u64,
            );
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&object.data)?;
            let compressed = encoder
                .finish()
                .map_err(|e| ProtocolError::Compression(e.to_string()))?;
            pack.extend_from_slice(&compressed);
        }

        let trailer = ObjectHasher::raw(&pack);
        pack.extend_from_slice(&trailer);
        Ok(pack)
    }
}
