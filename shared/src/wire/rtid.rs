use std::fmt;

use super::{error::WireError, reader::ByteReader, writer::ByteWriter};

/// Wire size of an RTID: 32 bits for now
pub const RTID_WIRE_SIZE: usize = 4;

/// A runtime entity identifier, unique only for the lifetime of one connected
/// session. Never stable across reconnects. Zero is the "no entity" sentinel.
///
/// Held as a `u64` in memory so that a future 64-bit wire field widens
/// without touching call sites; the current wire field is 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rtid(u64);

impl Rtid {
    /// Sentinel meaning "no entity"
    pub const NULL: Rtid = Rtid(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Encodes the RTID into its 32-bit wire field, returning bytes written.
    // TODO: widen the wire field once the server grows 64-bit RTIDs; until
    // then values above u32::MAX cannot occur in a live session.
    pub fn ser(&self, writer: &mut ByteWriter) -> usize {
        writer.write_u32(self.0 as u32)
    }

    /// Decodes an RTID from its 32-bit wire field, widening to u64
    pub fn de(reader: &mut ByteReader) -> Result<Self, WireError> {
        Ok(Self(u64::from(reader.read_u32()?)))
    }
}

impl fmt::Display for Rtid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rtid:{}", self.0)
    }
}

impl From<u32> for Rtid {
    fn from(value: u32) -> Self {
        Self(u64::from(value))
    }
}
