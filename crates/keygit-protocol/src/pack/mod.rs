//! Git packfile format (versions 2 and 3).
//!
//! ```text
//! "PACK" | version: u32 BE | count: u32 BE
//! entry*  : type+size varint header, [delta base], zlib stream
//! trailer : SHA-1 of everything above
//! ```
//!
//! The reader resolves `OFS_DELTA` and `REF_DELTA` entries; the writer only
//! emits whole objects.

pub mod delta;
pub mod entry;
pub mod reader;
pub mod writer;

pub use entry::PackObjectType;
pub use reader::PackReader;
pub use writer::PackWriter;

/// Pack signature.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";

/// Header length: signature, version, object count.
pub const HEADER_LEN: usize = 12;

/// Trailer length: SHA-1 of the preceding bytes.
pub const TRAILER_LEN: usize = 20;
