use std::fmt;
use std::str::FromStr;

use super::{error::WireError, reader::ByteReader, writer::ByteWriter};

/// Wire size of a UUID: 16 raw bytes
pub const UUID_WIRE_SIZE: usize = 16;

/// A 128-bit identifier, stable across sessions. Canonical textual form is
/// lower-case hex in 8-4-4-4-12 hyphenated groups.
///
/// In-memory layout matches the textual (big-endian) order of the RFC 4122
/// fields. On the wire the first three fields (4 + 2 + 2 bytes) are
/// byte-swapped to little-endian; the remaining 8 bytes travel verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uuid {
    bytes: [u8; 16],
}

impl Uuid {
    /// The all-zero UUID
    pub const NIL: Uuid = Uuid { bytes: [0; 16] };

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.bytes
    }

    pub fn is_nil(&self) -> bool {
        self.bytes == [0; 16]
    }

    /// Encodes the UUID into its 16-byte wire form, returning bytes written
    pub fn ser(&self, writer: &mut ByteWriter) -> usize {
        writer.write_bytes(&swap_rfc4122_fields(&self.bytes))
    }

    /// Decodes a UUID from its 16-byte wire form
    pub fn de(reader: &mut ByteReader) -> Result<Self, WireError> {
        let raw = reader.read_bytes(UUID_WIRE_SIZE)?;
        let mut wire = [0u8; 16];
        wire.copy_from_slice(raw);
        Ok(Self {
            bytes: swap_rfc4122_fields(&wire),
        })
    }
}

/// Swaps the first three RFC 4122 fields (u32, u16, u16) between big- and
/// little-endian order. Involutive: applying it twice is the identity.
fn swap_rfc4122_fields(input: &[u8; 16]) -> [u8; 16] {
    let mut out = *input;
    out[0..4].reverse();
    out[4..6].reverse();
    out[6..8].reverse();
    out
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            b[8], b[9], b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

impl FromStr for Uuid {
    type Err = WireError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let malformed = || WireError::MalformedUuid {
            text: text.to_string(),
        };

        let groups: Vec<&str> = text.split('-').collect();
        let expected_lens = [8, 4, 4, 4, 12];
        if groups.len() != 5 {
            return Err(malformed());
        }
        for (group, expected) in groups.iter().zip(expected_lens) {
            if group.len() != expected {
                return Err(malformed());
            }
        }

        let hex: String = groups.concat();
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| malformed())?;
        }
        Ok(Self { bytes })
    }
}
