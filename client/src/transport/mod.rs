//! Non-blocking byte transports underneath the gateway and broker links.
//!
//! A transport moves opaque byte chunks; framing is the owning link's job
//! (the gateway splits on its 4-byte header, the broker on a length prefix).

pub mod mock;
pub mod tcp;

use thiserror::Error;

/// Errors surfaced by a transport. Not retried internally; the link reports
/// them upward as a link-level failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer closed the connection
    #[error("Connection closed by peer")]
    Closed,

    /// An I/O error other than would-block
    #[error("I/O error: {detail}")]
    Io { detail: String },
}

/// One duplex, non-blocking byte-stream connection.
///
/// `receive` returns `Ok(None)` when no bytes are currently available and
/// must never block; `send` writes the whole payload or fails.
pub trait Transport {
    fn send(&mut self, payload: &[u8]) -> Result<(), TransportError>;
    fn receive(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
    /// Closes the connection; idempotent
    fn close(&mut self);
}
