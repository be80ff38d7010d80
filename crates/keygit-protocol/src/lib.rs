//! Git smart-HTTP wire protocol for keygit.
//!
//! Implements the server side of git's stateless-RPC transport, protocol
//! version 0, against any backend that provides the object and reference
//! store traits ([`Storer`]).
//!
//! # Modules
//!
//! - [`pktline`]: pkt-line framing and the service announcement
//! - [`service`]: the two services (`git-upload-pack`, `git-receive-pack`)
//! - [`advertise`]: reference advertisement with capabilities
//! - [`pack`]: packfile reader (with delta resolution) and writer
//! - [`walk`]: object reachability for building fetch packs
//! - [`upload`]: the fetch session
//! - [`receive`]: the push session
//!
//! Object ids are computed here, when objects are unpacked; the stores trust
//! whatever id they are handed.

pub mod advertise;
pub mod error;
pub mod pack;
pub mod pktline;
pub mod receive;
pub mod service;
pub mod storer;
pub mod upload;
pub mod walk;

pub use advertise::{AdvertisedRefs, AGENT};
pub use error::{ProtocolError, ProtocolResult};
pub use pack::{PackReader, PackWriter};
pub use pktline::{service_announcement, PktLine, PktLineReader, PktLineWriter};
pub use receive::{CommandStatus, ReceivePackSession, ReceiveReport, ReceiveRequest, RefCommand};
pub use service::Service;
pub use storer::Storer;
pub use upload::{UploadPackSession, UploadRequest};
