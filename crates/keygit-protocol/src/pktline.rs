//! pkt-line framing.
//!
//! Every line is prefixed with its total length (payload plus the 4 prefix
//! bytes) as 4 lowercase hex digits. `0000` is a flush packet and carries no
//! payload.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{ProtocolError, ProtocolResult};
use crate::service::Service;

/// Largest payload a single pkt-line may carry.
pub const MAX_PKT_PAYLOAD: usize = 65516;

/// The flush packet.
pub const FLUSH: &[u8] = b"0000";

const PREFIX_LEN: usize = 4;

/// One decoded packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PktLine<'a> {
    Flush,
    Data(&'a [u8]),
}

impl<'a> PktLine<'a> {
    /// Payload with a single trailing `\n` removed. Flush yields an empty slice.
    pub fn text(&self) -> &'a [u8] {
        match *self {
            PktLine::Flush => &[],
            PktLine::Data(data) => data.strip_suffix(b"\n").unwrap_or(data),
        }
    }
}

/// Sequential reader over a buffer of pkt-lines.
#[derive(Debug)]
pub struct PktLineReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PktLineReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Next packet, or `None` at end of input.
    pub fn read(&mut self) -> ProtocolResult<Option<PktLine<'a>>> {
        if self.pos == self.data.len() {
            return Ok(None);
        }
        let rest = &self.data[self.pos..];
        if rest.len() < PREFIX_LEN {
            return Err(ProtocolError::Framing(format!(
                "truncated length prefix at byte {}",
                self.pos
            )));
        }
        let len = parse_len(&rest[..PREFIX_LEN])?;
        if len == 0 {
            self.pos += PREFIX_LEN;
            return Ok(Some(PktLine::Flush));
        }
        if len < PREFIX_LEN {
            return Err(ProtocolError::Framing(format!(
                "unsupported special packet {len:04x}"
            )));
        }
        if len - PREFIX_LEN > MAX_PKT_PAYLOAD {
            return Err(ProtocolError::LineTooLarge {
                size: len - PREFIX_LEN,
                max: MAX_PKT_PAYLOAD,
            });
        }
        if rest.len() < len {
            return Err(ProtocolError::Framing(format!(
                "incomplete packet: have {}, need {len}",
                rest.len()
            )));
        }
        self.pos += len;
        Ok(Some(PktLine::Data(&rest[PREFIX_LEN..len])))
    }

    /// Bytes not yet consumed (e.g. a packfile following the commands).
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

fn parse_len(prefix: &[u8]) -> ProtocolResult<usize> {
    let text = std::str::from_utf8(prefix)
        .map_err(|_| ProtocolError::Framing("non-ASCII length prefix".into()))?;
    usize::from_str_radix(text, 16)
        .map_err(|_| ProtocolError::Framing(format!("invalid length prefix {text:?}")))
}

/// Builds a pkt-line stream in memory.
#[derive(Debug, Default)]
pub struct PktLineWriter {
    buf: BytesMut,
}

impl PktLineWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame `payload` as one packet.
    pub fn write(&mut self, payload: &[u8]) -> ProtocolResult<()> {
        if payload.len() > MAX_PKT_PAYLOAD {
            return Err(ProtocolError::LineTooLarge {
                size: payload.len(),
                max: MAX_PKT_PAYLOAD,
            });
        }
        self.buf
            .put_slice(format!("{:04x}", payload.len() + PREFIX_LEN).as_bytes());
        self.buf.put_slice(payload);
        Ok(())
    }

    pub fn write_str(&mut self, line: &str) -> ProtocolResult<()> {
        self.write(line.as_bytes())
    }

    pub fn flush(&mut self) {
        self.buf.put_slice(FLUSH);
    }

    /// Append unframed bytes, such as packfile data.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }
}

/// `# service=<name>\n` followed by a flush, as sent before an
/// advertisement over HTTP.
pub fn service_announcement(service: Service) -> ProtocolResult<Bytes> {
    let mut writer = PktLineWriter::new();
    writer.write_str(&format!("# service={}\n", service.name()))?;
    writer.flush();
    Ok(writer.into_bytes())
}
