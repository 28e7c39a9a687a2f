//! Cursor-based little-endian byte codec for the gateway wire protocol.
//!
//! Every decode advances the reader's cursor by the number of bytes consumed;
//! every encode returns the number of bytes written. Reads past the end of the
//! buffer return [`WireError::BufferOverrun`] rather than panicking, since
//! these functions sit directly on untrusted network data.

mod error;
mod reader;
mod rtid;
mod uuid;
mod writer;

pub use error::WireError;
pub use reader::ByteReader;
pub use rtid::{Rtid, RTID_WIRE_SIZE};
pub use uuid::{Uuid, UUID_WIRE_SIZE};
pub use writer::ByteWriter;
