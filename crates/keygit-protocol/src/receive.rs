//! The push side: `git-receive-pack` over stateless RPC.

use std::fmt;

use bytes::Bytes;
use keygit_refs::{validate_ref_name, RefError, RefStore, Reference, HEAD};
use keygit_store::ObjectStore;
use keygit_types::ObjectId;
use tracing::{debug, warn};

use crate::error::{ProtocolError, ProtocolResult};
use crate::pack::PackReader;
use crate::pktline::{PktLine, PktLineReader, PktLineWriter};
use crate::storer::Storer;

/// `<old> <new> <name>`; a zero old id creates, a zero new id deletes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RefCommand {
    pub old: ObjectId,
    pub new: ObjectId,
    pub name: String,
}

impl RefCommand {
    pub fn is_create(&self) -> bool {
        self.old.is_zero()
    }

    pub fn is_delete(&self) -> bool {
        self.new.is_zero()
    }

    fn parse(line: &str) -> ProtocolResult<Self> {
        let malformed = || ProtocolError::Malformed(format!("bad command {line:?}"));
        let mut parts = line.splitn(3, ' ');
        let (Some(old), Some(new), Some(name)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(malformed());
        };
        Ok(Self {
            old: ObjectId::from_hex(old).map_err(|_| malformed())?,
            new: ObjectId::from_hex(new).map_err(|_| malformed())?,
            name: name.to_string(),
        })
    }
}

/// A decoded receive-pack request: commands, then the pack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub commands: Vec<RefCommand>,
    pub capabilities: Vec<String>,
    pub pack: Vec<u8>,
}

impl ReceiveRequest {
    pub fn decode(body: &[u8]) -> ProtocolResult<Self> {
        let mut request = Self::default();
        let mut reader = PktLineReader::new(body);
        loop {
            match reader.read()? {
                None | Some(PktLine::Flush) => break,
                Some(pkt) => {
                    let text = pkt.text();
                    let (command, caps) = match text.iter().position(|&b| b == 0) {
                        Some(nul) => (&text[..nul], Some(&text[nul + 1..])),
                        None => (text, None),
                    };
                    let line = std::str::from_utf8(command)
                        .map_err(|_| ProtocolError::Malformed("non-UTF-8 command".into()))?;
                    if let Some(caps) = caps.filter(|_| request.commands.is_empty()) {
                        request.capabilities = String::from_utf8_lossy(caps)
                            .split_whitespace()
                            .map(str::to_string)
                            .collect();
                    }
                    request.commands.push(RefCommand::parse(line)?);
                }
            }
        }
        request.pack = reader.remaining().to_vec();
        Ok(request)
    }

    /// Encode as a client would send it.
    pub fn encode(&self) -> ProtocolResult<Bytes> {
        let mut writer = PktLineWriter::new();
        for (i, cmd) in self.commands.iter().enumerate() {
            let mut line = format!("{} {} {}", cmd.old, cmd.new, cmd.name).into_bytes();
            if i == 0 && !self.capabilities.is_empty() {
                line.push(0);
                line.extend_from_slice(self.capabilities.join(" ").as_bytes());
            }
            line.push(b'\n');
            writer.write(&line)?;
        }
        writer.flush();
        writer.write_raw(&self.pack);
        Ok(writer.into_bytes())
    }

    pub fn wants_report(&self) -> bool {
        self.capabilities.iter().any(|c| c == "report-status")
    }
}

/// Outcome of one ref command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Ok,
    Rejected(String),
}

/// The `report-status` reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveReport {
    pub unpack: Result<(), String>,
    pub commands: Vec<(String, CommandStatus)>,
}

impl ReceiveReport {
    pub fn all_ok(&self) -> bool {
        self.unpack.is_ok()
            && self
                .commands
                .iter()
                .all(|(_, status)| *status == CommandStatus::Ok)
    }

    pub fn encode(&self) -> ProtocolResult<Bytes> {
        let mut writer = PktLineWriter::new();
        match &self.unpack {
            Ok(()) => writer.write_str("unpack ok\n")?,
            Err(reason) => writer.write_str(&format!("unpack {reason}\n"))?,
        }
        for (name, status) in &self.commands {
            match status {
                CommandStatus::Ok => writer.write_str(&format!("ok {name}\n"))?,
                CommandStatus::Rejected(reason) => {
                    writer.write_str(&format!("ng {name} {reason}\n"))?
                }
            }
        }
        writer.flush();
        Ok(writer.into_bytes())
    }
}

impl fmt::Display for ReceiveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rejected = self
            .commands
            .iter()
            .filter(|(_, s)| *s != CommandStatus::Ok)
            .count();
        write!(
            f,
            "{} commands, {rejected} rejected",
            self.commands.len()
        )
    }
}

/// One receive-pack exchange against a repository.
pub struct ReceivePackSession<'a, S: Storer> {
    store: &'a S,
}

impl<'a, S: Storer> ReceivePackSession<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Store the pack's objects, then apply each command. Returns the encoded
    /// report, or nothing when the client did not ask for one.
    pub fn receive_pack(&self, request: &ReceiveRequest) -> ProtocolResult<Bytes> {
        let report = self.apply(request)?;
        debug!(%report, "receive-pack finished");
        if request.wants_report() {
            report.encode()
        } else {
            Ok(Bytes::new())
        }
    }

    /// Unpack and update refs without encoding the reply.
    pub fn apply(&self, request: &ReceiveRequest) -> ProtocolResult<ReceiveReport> {
        let unpacked = self.unpack(&request.pack)?;
        debug!(objects = unpacked, "unpacked objects");

        let commands = request
            .commands
            .iter()
            .map(|cmd| {
                let status = match self.update(cmd) {
                    Ok(()) => CommandStatus::Ok,
                    Err(reason) => {
                        warn!(reference = %cmd.name, %reason, "ref update rejected");
                        CommandStatus::Rejected(reason)
                    }
                };
                (cmd.name.clone(), status)
            })
            .collect();
        Ok(ReceiveReport {
            unpack: Ok(()),
            commands,
        })
    }

    fn unpack(&self, pack: &[u8]) -> ProtocolResult<usize> {
        if pack.is_empty() {
            return Ok(0);
        }
        let objects = PackReader::new(pack)?.read_all(self.store)?;
        for object in &objects {
            ObjectStore::put(self.store, object)?;
        }
        Ok(objects.len())
    }

    /// Apply one command; `Err` carries the `ng` reason.
    fn update(&self, cmd: &RefCommand) -> Result<(), String> {
        if cmd.name == HEAD {
            return Err("HEAD cannot be updated".into());
        }
        validate_ref_name(&cmd.name).map_err(|_| "invalid ref name".to_string())?;
        if !cmd.is_delete() && !ObjectStore::has(self.store, &cmd.new).map_err(|e| e.to_string())? {
            return Err("missing object".into());
        }

        let current = match RefStore::get(self.store, &cmd.name) {
            Ok(reference) => Some(reference),
            Err(RefError::NotFound { .. }) => None,
            // A stored value that does not decode matches no old id.
            Err(RefError::Decode { .. }) if cmd.is_create() => {
                return Err("already exists".into())
            }
            Err(RefError::Decode { .. }) => return Err("stale old value".into()),
            Err(e) => return Err(e.to_string()),
        };
        let current_id = current.as_ref().and_then(Reference::object_id);

        if cmd.is_create() {
            if current.is_some() {
                return Err("already exists".into());
            }
        } else if current_id != Some(cmd.old) {
            return Err("stale old value".into());
        }

        let result = if cmd.is_delete() {
            self.store.remove(&cmd.name)
        } else {
            let new = Reference::direct(cmd.name.as_str(), cmd.new);
            self.store.compare_and_set(&new, current.as_ref())
        };
        result.map_err(|e| match e {
            RefError::Conflict { .. } => "ref changed concurrently".to_string(),
            other => other.to_string(),
        })
    }
}
