use thiserror::Error;

/// Errors that can occur while encoding or decoding wire-level values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A decode would read past the end of the buffer
    #[error("Buffer overrun: needed {needed} more bytes, only {remaining} remaining")]
    BufferOverrun { needed: usize, remaining: usize },

    /// A UUID string was not in canonical 8-4-4-4-12 hex form
    #[error("Malformed UUID string: {text}")]
    MalformedUuid { text: String },

    /// A declared count field exceeds the fixed slot capacity
    #[error("Declared count {declared} exceeds capacity {capacity}")]
    CountExceedsCapacity { declared: usize, capacity: usize },
}
