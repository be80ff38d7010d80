use std::collections::HashMap;

use flate2::{Decompress, FlushDecompress, Status};
use keygit_store::{ObjectStore, StoreError, StoredObject};
use keygit_types::{ObjectHasher, ObjectId, ObjectKind, OBJECT_ID_LEN};
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::pack::delta::apply_delta;
use crate::pack::entry::{decode_entry_header, decode_ofs_distance, PackObjectType};
use crate::pack::{HEADER_LEN, PACK_SIGNATURE, TRAILER_LEN};

/// Upper bound on the inflate buffer reserved before any output exists.
const MAX_INITIAL_CAPACITY: usize = 1 << 20;

#[derive(Debug)]
enum RawKind {
    Full(ObjectKind),
    OfsDelta { base_offset: u64 },
    RefDelta { base: ObjectId },
}

#[derive(Debug)]
struct RawEntry {
    offset: u64,
    kind: RawKind,
    data: Vec<u8>,
}

/// Parses a complete in-memory packfile.
///
/// The header and trailing checksum are validated on construction; entries
/// are inflated and their deltas resolved by [`PackReader::read_all`].
#[derive(Debug)]
pub struct PackReader<'a> {
    data: &'a [u8],
    version: u32,
    count: u32,
}

impl<'a> PackReader<'a> {
    pub fn new(data: &'a [u8]) -> ProtocolResult<Self> {
        if data.len() < HEADER_LEN + TRAILER_LEN {
            return Err(ProtocolError::CorruptPack {
                offset: 0,
                reason: "pack data too short".into(),
            });
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(ProtocolError::InvalidPackSignature);
        }
        let version = read_u32(&data[4..8]);
        if version != 2 && version != 3 {
            return Err(ProtocolError::UnsupportedPackVersion(version));
        }
        let count = read_u32(&data[8..12]);

        let body_end = data.len() - TRAILER_LEN;
        if ObjectHasher::raw(&data[..body_end])[..] != data[body_end..] {
            return Err(ProtocolError::ChecksumMismatch);
        }

        Ok(Self {
            data,
            version,
            count,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Number of entries the header declares.
    pub fn object_count(&self) -> u32 {
        self.count
    }

    /// Inflate every entry and resolve deltas, returning whole objects in
    /// pack order with their git ids computed.
    ///
    /// `REF_DELTA` bases are looked up first among the pack's own objects,
    /// then in `bases`.
    pub fn read_all(&self, bases: &dyn ObjectStore) -> ProtocolResult<Vec<StoredObject>> {
        let raw = self.parse_entries()?;
        let by_offset: HashMap<u64, usize> = raw
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.offset, i))
            .collect();

        let mut resolved: Vec<Option<StoredObject>> = vec![None; raw.len()];
        let mut by_id: HashMap<ObjectId, usize> = HashMap::new();
        let mut remaining = raw.len();

        // Deltas may name bases that appear later in the pack, so sweep until
        // a pass makes no progress.
        while remaining > 0 {
            let before = remaining;
            for (i, entry) in raw.iter().enumerate() {
                if resolved[i].is_some() {
                    continue;
                }
                let object = match &entry.kind {
                    RawKind::Full(kind) => Some(StoredObject::hashed(*kind, entry.data.clone())),
                    RawKind::OfsDelta { base_offset } => {
                        let index = by_offset.get(base_offset).copied().ok_or_else(|| {
                            ProtocolError::CorruptPack {
                                offset: entry.offset,
                                reason: format!("no entry at base offset {base_offset}"),
                            }
                        })?;
                        match &resolved[index] {
                            Some(base) => Some(undelta(base.kind, &base.data, &entry.data)?),
                            None => None,
                        }
                    }
                    RawKind::RefDelta { base } => match by_id.get(base) {
                        Some(&index) => resolved[index]
                            .as_ref()
                            .map(|b| undelta(b.kind, &b.data, &entry.data))
                            .transpose()?,
                        None => match bases.get(base) {
                            Ok(b) => Some(undelta(b.kind, &b.data, &entry.data)?),
                            Err(StoreError::NotFound(_)) => None,
                            Err(e) => return Err(e.into()),
                        },
                    },
                };
                if let Some(object) = object {
                    by_id.insert(object.id, i);
                    resolved[i] = Some(object);
                    remaining -= 1;
                }
            }

            if remaining == before {
                let missing = raw
                    .iter()
                    .zip(&resolved)
                    .find_map(|(entry, done)| match (&entry.kind, done) {
                        (RawKind::RefDelta { base }, None) => Some(*base),
                        _ => None,
                    });
                return Err(match missing {
                    Some(base) => ProtocolError::DeltaBaseNotFound(base),
                    None => ProtocolError::CorruptPack {
                        offset: 0,
                        reason: "unresolvable delta chain".into(),
                    },
                });
            }
        }

        debug!(
            version = self.version,
            objects = resolved.len(),
            "unpacked pack"
        );
        Ok(resolved.into_iter().flatten().collect())
    }

    fn parse_entries(&self) -> ProtocolResult<Vec<RawEntry>> {
        let body_end = self.data.len() - TRAILER_LEN;
        let mut pos = HEADER_LEN;
        let mut entries = Vec::with_capacity((self.count as usize).min(1 << 16));

        for _ in 0..self.count {
            if pos >= body_end {
                return Err(ProtocolError::CorruptPack {
                    offset: pos as u64,
                    reason: format!("pack ends after {} of {} entries", entries.len(), self.count),
                });
            }
            let offset = pos as u64;
            let (ty, size, used) = decode_entry_header(&self.data[pos..body_end], offset)?;
            pos += used;

            let kind = match ty {
                PackObjectType::Full(kind) => RawKind::Full(kind),
                PackObjectType::OfsDelta => {
                    let (distance, used) = decode_ofs_distance(&self.data[pos..body_end], offset)?;
                    pos += used;
                    let base_offset = offset.checked_sub(distance).ok_or_else(|| {
                        ProtocolError::CorruptPack {
                            offset,
                            reason: "delta base before start of pack".into(),
                        }
                    })?;
                    RawKind::OfsDelta { base_offset }
                }
                PackObjectType::RefDelta => {
                    let end = pos + OBJECT_ID_LEN;
                    let base = self
                        .data
                        .get(pos..end.min(body_end))
                        .and_then(|b| ObjectId::from_slice(b).ok())
                        .ok_or_else(|| ProtocolError::CorruptPack {
                            offset,
                            reason: "truncated delta base id".into(),
                        })?;
                    pos = end;
                    RawKind::RefDelta { base }
                }
            };

            let (data, consumed) = inflate(&self.data[pos..body_end], size, offset)?;
            pos += consumed;
            entries.push(RawEntry { offset, kind, data });
        }

        if pos != body_end {
            return Err(ProtocolError::CorruptPack {
                offset: pos as u64,
                reason: format!("{} trailing bytes after last entry", body_end - pos),
            });
        }
        Ok(entries)
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_be_bytes(buf)
}

fn undelta(kind: ObjectKind, base: &[u8], delta: &[u8]) -> ProtocolResult<StoredObject> {
    let data = apply_delta(base, delta)?;
    Ok(StoredObject::hashed(kind, data))
}

/// Inflate one zlib stream from the front of `input`, which must produce
/// exactly `expected` bytes. Returns (data, input bytes consumed).
fn inflate(input: &[u8], expected: u64, offset: u64) -> ProtocolResult<(Vec<u8>, usize)> {
    let corrupt = |reason: String| ProtocolError::CorruptPack { offset, reason };
    let mut z = Decompress::new(true);
    let mut out = Vec::with_capacity((expected as usize).min(MAX_INITIAL_CAPACITY));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(64));
        }
        let consumed = z.total_in() as usize;
        let produced = out.len();
        let status = z
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| corrupt(format!("zlib: {e}")))?;

        if out.len() as u64 > expected {
            return Err(corrupt(format!("inflates past declared size {expected}")));
        }
        if status == Status::StreamEnd {
            break;
        }
        if z.total_in() as usize == consumed && out.len() == produced {
            return Err(corrupt("truncated zlib stream".into()));
        }
    }

    if out.len() as u64 != expected {
        return Err(corrupt(format!(
            "inflated {} bytes, header declares {expected}",
            out.len()
        )));
    }
    Ok((out, z.total_in() as usize))
}
