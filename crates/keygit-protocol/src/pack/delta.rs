//! Git delta application.
//!
//! A delta is two little-endian base-128 sizes (source, target) followed by
//! instructions: `1xxxxxxx` copies a range of the base, `0nnnnnnn` inserts
//! the next `n` literal bytes. Opcode `0` is reserved.

use crate::error::{ProtocolError, ProtocolResult};

fn invalid(reason: impl Into<String>) -> ProtocolError {
    ProtocolError::InvalidDelta(reason.into())
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
fn decode_varint(data: &[u8]) -> ProtocolResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(invalid("varint overflow"));
        }
    }
    Err(invalid("truncated varint"))
}

/// Rebuild the target object from `base` and `delta`.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> ProtocolResult<Vec<u8>> {
    let (source_size, used) = decode_varint(delta)?;
    let mut pos = used;
    let (target_size, used) = decode_varint(&delta[pos..])?;
    pos += used;

    if source_size != base.len() as u64 {
        return Err(invalid(format!(
            "base is {} bytes, delta expects {source_size}",
            base.len()
        )));
    }

    let mut out = Vec::with_capacity(target_size.min(1 << 20) as usize);
    while pos < delta.len() {
        let op = delta[pos];
        pos += 1;

        if op & 0x80 != 0 {
            let mut offset: u64 = 0;
            let mut size: u64 = 0;
            for bit in 0..4 {
                if op & (1 << bit) != 0 {
                    let byte = *delta.get(pos).ok_or_else(|| invalid("truncated copy"))?;
                    offset |= u64::from(byte) << (8 * bit);
                    pos += 1;
                }
            }
            for bit in 0..3 {
                if op & (0x10 << bit) != 0 {
                    let byte = *delta.get(pos).ok_or_else(|| invalid("truncated copy"))?;
                    size |= u64::from(byte) << (8 * bit);
                    pos += 1;
                }
            }
            if size == 0 {
                size = 0x10000;
            }
            let start = offset as usize;
            let end = start
                .checked_add(size as usize)
                .filter(|&end| end <= base.len())
                .ok_or_else(|| invalid("copy outside base"))?;
            out.extend_from_slice(&base[start..end]);
        } else if op != 0 {
            let end = pos + op as usize;
            let literal = delta.get(pos..end).ok_or_else(|| invalid("truncated insert"))?;
            out.extend_from_slice(literal);
            pos = end;
        } else {
            return Err(invalid("reserved opcode 0"));
        }

        if out.len() as u64 > target_size {
            return Err(invalid("result exceeds declared size"));
        }
    }

    if out.len() as u64 != target_size {
        return Err(invalid(format!(
            "result is {} bytes, delta declares {target_size}",
            out.len()
        )));
    }
    Ok(out)
}

/// Encode a variable-length integer.
#[cfg(test)]
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}
