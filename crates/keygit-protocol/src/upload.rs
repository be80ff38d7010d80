//! The fetch side: `git-upload-pack` over stateless RPC.
//!
//! A request is a block of `want` lines (client capabilities trail the first
//! one), a flush, then any number of `have` lines and an optional `done`.
//! The reply is a single `ACK <id>` or `NAK`, followed by the pack once the
//! client has finished negotiating.

use bytes::Bytes;
use keygit_store::ObjectStore;
use keygit_types::ObjectId;
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::pack::PackWriter;
use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::storer::Storer;
use crate::walk::objects_to_send;

/// A decoded upload-pack request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadRequest {
    pub wants: Vec<ObjectId>,
    pub haves: Vec<ObjectId>,
    pub capabilities: Vec<String>,
    pub done: bool,
}

fn parse_id(line: &str, value: &str) -> ProtocolResult<ObjectId> {
    ObjectId::from_hex(value).map_err(|e| ProtocolError::Malformed(format!("{line:?}: {e}")))
}

impl UploadRequest {
    pub fn decode(body: &[u8]) -> ProtocolResult<Self> {
        let mut request = Self::default();
        let mut reader = PktLineReader::new(body);
        while let Some(pkt) = reader.read()? {
            let PktLine::Data(_) = pkt else {
                continue;
            };
            let line = std::str::from_utf8(pkt.text())
                .map_err(|_| ProtocolError::Malformed("non-UTF-8 request line".into()))?;
            let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
            match verb {
                "want" => {
                    let (hex, caps) = rest.split_once(' ').unwrap_or((rest, ""));
                    request.wants.push(parse_id(line, hex)?);
                    if request.wants.len() == 1 {
                        request.capabilities =
                            caps.split_whitespace().map(str::to_string).collect();
                    }
                }
                "have" => request.haves.push(parse_id(line, rest)?),
                "done" => {
                    request.done = true;
                    break;
                }
                "shallow" | "deepen" | "deepen-since" | "deepen-not" => {
                    return Err(ProtocolError::Unsupported(format!("{verb} requests")));
                }
                _ => {
                    return Err(ProtocolError::Malformed(format!(
                        "unexpected upload-pack line {line:?}"
                    )))
                }
            }
        }
        Ok(request)
    }

    /// Encode as a client would send it.
    pub fn encode(&self) -> ProtocolResult<Bytes> {
        let mut writer = PktLineWriter::new();
        for (i, want) in self.wants.iter().enumerate() {
            if i == 0 && !self.capabilities.is_empty() {
                writer.write_str(&format!("want {want} {}\n", self.capabilities.join(" ")))?;
            } else {
                writer.write_str(&format!("want {want}\n"))?;
            }
        }
        writer.flush();
        for have in &self.haves {
            writer.write_str(&format!("have {have}\n"))?;
        }
        if self.done {
            writer.write_str("done\n")?;
        }
        Ok(writer.into_bytes())
    }
}

/// One upload-pack exchange against a repository.
pub struct UploadPackSession<'a, S: Storer> {
    store: &'a S,
}

impl<'a, S: Storer> UploadPackSession<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Answer `request`. An empty want list gets an empty reply.
    pub fn upload_pack(&self, request: &UploadRequest) -> ProtocolResult<Bytes> {
        if request.wants.is_empty() {
            return Ok(Bytes::new());
        }
        for want in &request.wants {
            if !ObjectStore::has(self.store, want)? {
                return Err(ProtocolError::Malformed(format!("want {want} not found")));
            }
        }

        let mut common = Vec::new();
        for have in &request.haves {
            if ObjectStore::has(self.store, have)? {
                common.push(*have);
            }
        }

        let mut writer = PktLineWriter::new();
        match common.first() {
            Some(id) => writer.write_str(&format!("ACK {id}\n"))?,
            None => writer.write_str("NAK\n")?,
        }

        if !request.done && !request.haves.is_empty() {
            debug!(
                haves = request.haves.len(),
                common = common.len(),
                "upload-pack negotiation round"
            );
            return Ok(writer.into_bytes());
        }

        let objects = objects_to_send(self.store, &request.wants, &common)?;
        debug!(
            wants = request.wants.len(),
            common = common.len(),
            objects = objects.len(),
            "upload-pack sending pack"
        );
        let mut pack = PackWriter::new();
        for object in objects {
            pack.add(object);
        }
        writer.write_raw(&pack.finish()?);
        Ok(writer.into_bytes())
    }
}
