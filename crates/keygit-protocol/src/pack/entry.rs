use keygit_types::ObjectKind;

use crate::error::{ProtocolError, ProtocolResult};

/// Type field of a pack entry header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PackObjectType {
    /// Complete object of the given kind.
    Full(ObjectKind),
    /// Delta against the entry at a relative offset earlier in the pack.
    OfsDelta,
    /// Delta against an object named by id.
    RefDelta,
}

impl PackObjectType {
    pub fn type_number(&self) -> u8 {
        match self {
            Self::Full(ObjectKind::Commit) => 1,
            Self::Full(ObjectKind::Tree) => 2,
            Self::Full(ObjectKind::Blob) => 3,
            Self::Full(ObjectKind::Tag) => 4,
            Self::OfsDelta => 6,
            Self::RefDelta => 7,
        }
    }

    pub fn from_type_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Full(ObjectKind::Commit)),
            2 => Some(Self::Full(ObjectKind::Tree)),
            3 => Some(Self::Full(ObjectKind::Blob)),
            4 => Some(Self::Full(ObjectKind::Tag)),
            6 => Some(Self::OfsDelta),
            7 => Some(Self::RefDelta),
            _ => None,
        }
    }
}

/// Append an entry header: 3-bit type and the inflated size, 4 bits in the
/// first byte and 7 in each following byte.
pub(crate) fn encode_entry_header(buf: &mut Vec<u8>, ty: PackObjectType, size: u64) {
    let mut byte = (ty.type_number() << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;
    while rest > 0 {
        buf.push(byte | 0x80);
        byte = (rest & 0x7f) as u8;
        rest >>= 7;
    }
    buf.push(byte);
}

/// Decode an entry header. Returns (type, inflated size, bytes consumed).
pub(crate) fn decode_entry_header(
    data: &[u8],
    offset: u64,
) -> ProtocolResult<(PackObjectType, u64, usize)> {
    let corrupt = |reason: &str| ProtocolError::CorruptPack {
        offset,
        reason: reason.to_string(),
    };
    let first = *data.first().ok_or_else(|| corrupt("truncated entry header"))?;
    let type_number = (first >> 4) & 0x07;
    let ty = PackObjectType::from_type_number(type_number)
        .ok_or_else(|| corrupt(&format!("unknown object type {type_number}")))?;

    let mut size = u64::from(first & 0x0f);
    let mut shift = 4;
    let mut pos = 1;
    let mut byte = first;
    while byte & 0x80 != 0 {
        byte = *data.get(pos).ok_or_else(|| corrupt("truncated entry header"))?;
        if shift > 57 {
            return Err(corrupt("entry size overflows u64"));
        }
        size |= u64::from(byte & 0x7f) << shift;
        shift += 7;
        pos += 1;
    }
    Ok((ty, size, pos))
}

/// Decode the base distance of an `OFS_DELTA` entry. Returns (distance,
/// bytes consumed).
pub(crate) fn decode_ofs_distance(data: &[u8], offset: u64) -> ProtocolResult<(u64, usize)> {
    let truncated = || ProtocolError::CorruptPack {
        offset,
        reason: "truncated delta base offset".into(),
    };
    let mut byte = *data.first().ok_or_else(truncated)?;
    let mut distance = u64::from(byte & 0x7f);
    let mut pos = 1;
    while byte & 0x80 != 0 {
        byte = *data.get(pos).ok_or_else(truncated)?;
        distance = distance
            .checked_add(1)
            .and_then(|d| d.checked_mul(128))
            .ok_or_else(|| ProtocolError::CorruptPack {
                offset,
                reason: "delta base offset overflows".into(),
            })?
            | u64::from(byte & 0x7f);
        pos += 1;
    }
    Ok((distance, pos))
}

#[cfg(test)]
pub(crate) fn encode_ofs_distance(buf: &mut Vec<u8>, mut distance: u64) {
    let mut bytes = vec![(distance & 0x7f) as u8];
    distance >>= 7;
    while distance > 0 {
        distance -= 1;
        bytes.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }
    bytes.reverse();
    buf.extend_from_slice(&bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_numbers_match_git() {
        assert_eq!(PackObjectType::Full(ObjectKind::Commit).type_number(), 1);
        assert_eq!(PackObjectType::Full(ObjectKind::Tree).type_number(), 2);
        assert_eq!(PackObjectType::Full(ObjectKind::Blob).type_number(), 3);
        assert_eq!(PackObjectType::Full(ObjectKind::Tag).type_number(), 4);
        assert_eq!(PackObjectType::OfsDelta.type_number(), 6);
        assert_eq!(PackObjectType::RefDelta.type_number(), 7);
    }

    #[test]
    fn reserved_type_numbers_rejected() {
        assert!(PackObjectType::from_type_number(0).is_none());
        assert!(PackObjectType::from_type_number(5).is_none());
    }

    #[test]
    fn small_header_is_one_byte() {
        let mut buf = Vec::new();
        encode_entry_header(&mut buf, PackObjectType::Full(ObjectKind::Blob), 5);
        assert_eq!(buf, vec![0x35]);
    }

    #[test]
    fn multi_byte_header() {
        // Low nibble 4 in the first byte, then 0x123 in 7-bit groups.
        let mut buf = Vec::new();
        encode_entry_header(&mut buf, PackObjectType::Full(ObjectKind::Commit), 0x1234);
        assert_eq!(buf, vec![0x94, 0xa3, 0x02]);

        let (ty, size, used) = decode_entry_header(&buf, 0).unwrap();
        assert_eq!(ty, PackObjectType::Full(ObjectKind::Commit));
        assert_eq!(size, 0x1234);
        assert_eq!(used, 3);
    }

    #[test]
    fn truncated_header_rejected() {
        assert!(decode_entry_header(&[], 0).is_err());
        assert!(decode_entry_header(&[0x94], 0).is_err());
    }

    #[test]
    fn ofs_distance_known_values() {
        assert_eq!(decode_ofs_distance(&[0x05], 0).unwrap(), (5, 1));
        // Two-byte form adds the implicit 128.
        assert_eq!(decode_ofs_distance(&[0x80, 0x00], 0).unwrap(), (128, 2));

        for distance in [1u64, 127, 128, 300, 16_511, 16_512, 1 << 30] {
            let mut buf = Vec::new();
            encode_ofs_distance(&mut buf, distance);
            assert_eq!(decode_ofs_distance(&buf, 0).unwrap(), (distance, buf.len()));
        }
    }
}
