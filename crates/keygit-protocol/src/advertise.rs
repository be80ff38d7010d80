//! Reference advertisement.
//!
//! The first response of both services: every ref the client may fetch or
//! update, with the server's capabilities attached to the first line.

use bytes::Bytes;
use keygit_refs::{RefError, RefStore, Reference, HEAD};
use keygit_types::ObjectId;
use tracing::debug;

use crate::error::{ProtocolError, ProtocolResult};
use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::service::Service;

/// Value of the `agent` capability.
pub const AGENT: &str = concat!("keygit/", env!("CARGO_PKG_VERSION"));

/// Placeholder ref name advertised by an empty repository.
const NO_REFS: &str = "capabilities^{}";

/// The refs and capabilities a server announces for one service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvertisedRefs {
    /// Resolved HEAD, when the default branch exists (upload-pack only).
    pub head: Option<ObjectId>,
    /// Persisted refs, sorted by name.
    pub refs: Vec<(String, ObjectId)>,
    pub capabilities: Vec<String>,
}

impl AdvertisedRefs {
    /// Collect the advertisement for `service` from a repository's refs.
    ///
    /// Symbolic refs are advertised with the id they resolve to; ones that
    /// do not resolve are left out.
    pub fn load<S: RefStore + ?Sized>(store: &S, service: Service) -> ProtocolResult<Self> {
        let mut symref = None;
        let mut head = None;
        if service == Service::UploadPack {
            head = resolve_optional(store, HEAD)?;
            if head.is_some() {
                symref = store.get(HEAD)?.symbolic_target().map(str::to_string);
            }
        }

        let mut refs = Vec::new();
        for reference in store.iter_all()? {
            let id = match &reference {
                Reference::Direct { target, .. } => Some(*target),
                Reference::Symbolic { target, .. } => resolve_optional(store, target)?,
            };
            match id {
                Some(id) => refs.push((reference.name().to_string(), id)),
                None => debug!(name = reference.name(), "skipping dangling symbolic ref"),
            }
        }
        refs.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(Self {
            head,
            refs,
            capabilities: capabilities_for(service, symref.as_deref()),
        })
    }

    /// `true` when no refs at all are advertised.
    pub fn is_empty(&self) -> bool {
        self.head.is_none() && self.refs.is_empty()
    }

    /// Id advertised for `name` (`HEAD` included).
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        if name == HEAD {
            return self.head;
        }
        self.refs
            .iter()
            .find(|(ref_name, _)| ref_name == name)
            .map(|(_, id)| *id)
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c == name)
    }

    /// Encode as pkt-lines terminated by a flush.
    pub fn encode(&self) -> ProtocolResult<Bytes> {
        let caps = self.capabilities.join(" ");
        let mut writer = PktLineWriter::new();

        let lines: Vec<(&str, ObjectId)> = self
            .head
            .map(|id| (HEAD, id))
            .into_iter()
            .chain(self.refs.iter().map(|(name, id)| (name.as_str(), *id)))
            .collect();

        if lines.is_empty() {
            writer.write_str(&format!("{} {NO_REFS}\0{caps}\n", ObjectId::zero()))?;
        }
        for (i, (name, id)) in lines.iter().enumerate() {
            if i == 0 {
                writer.write_str(&format!("{id} {name}\0{caps}\n"))?;
            } else {
                writer.write_str(&format!("{id} {name}\n"))?;
            }
        }
        writer.flush();
        Ok(writer.into_bytes())
    }

    /// Parse an advertisement, optionally preceded by a service announcement.
    pub fn decode(data: &[u8]) -> ProtocolResult<Self> {
        let mut reader = PktLineReader::new(data);
        let mut adv = AdvertisedRefs::default();
        let mut first = true;

        while let Some(line) = reader.read()? {
            let text = match line {
                PktLine::Flush if first => continue,
                PktLine::Flush => break,
                PktLine::Data(_) => line.text(),
            };
            if first && text.starts_with(b"# service=") {
                continue;
            }

            let text = std::str::from_utf8(text)
                .map_err(|_| ProtocolError::Malformed("advertisement is not UTF-8".into()))?;
            let (entry, caps) = match text.split_once('\0') {
                Some((entry, caps)) if first => (entry, Some(caps)),
                Some(_) => {
                    return Err(ProtocolError::Malformed(
                        "capabilities after the first line".into(),
                    ))
                }
                None => (text, None),
            };
            first = false;

            if let Some(caps) = caps {
                adv.capabilities = caps.split_whitespace().map(str::to_string).collect();
            }
            let (hex, name) = entry
                .split_once(' ')
                .ok_or_else(|| ProtocolError::Malformed(format!("bad ref line {entry:?}")))?;
            let id = ObjectId::from_hex(hex)
                .map_err(|e| ProtocolError::Malformed(format!("bad ref id: {e}")))?;

            match name {
                NO_REFS if id.is_zero() => {}
                HEAD => adv.head = Some(id),
                _ => adv.refs.push((name.to_string(), id)),
            }
        }
        Ok(adv)
    }
}

/// Capabilities announced for `service`.
pub fn capabilities_for(service: Service, head_target: Option<&str>) -> Vec<String> {
    let mut caps = Vec::new();
    match service {
        Service::UploadPack => {
            if let Some(target) = head_target {
                caps.push(format!("symref=HEAD:{target}"));
            }
        }
        Service::ReceivePack => {
            caps.extend(["report-status", "delete-refs", "no-thin"].map(String::from));
        }
    }
    caps.push(format!("agent={AGENT}"));
    caps
}

fn resolve_optional<S: RefStore + ?Sized>(store: &S, name: &str) -> ProtocolResult<Option<ObjectId>> {
    match store.resolve(name) {
        Ok(id) => Ok(Some(id)),
        Err(RefError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
