//! # Scenelink Shared
//! Wire codec and protocol types shared by the scenelink gateway & broker links.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod wire;

mod auth;
mod channel;
mod component;
mod frame;
mod timer;

pub use auth::{AuthenticationResponse, AuthenticationStatus, AUTH_RESPONSE_SIZE};
pub use channel::{Channel, FrameHeader, ProtocolError, FRAME_HEADER_SIZE, MAX_FRAME_PAYLOAD_SIZE};
pub use component::{ComponentKind, ComponentKinds, ComponentValue};
pub use frame::{
    ClientViewports, FrameMetadata, RemoteOperationHeader, Viewport, MAX_VIEWPORTS_PER_CLIENT,
    REMOTE_OPERATION_HEADER_SIZE, VIEWPORT_RECORD_SIZE,
};
pub use timer::Timer;
pub use wire::{ByteReader, ByteWriter, Rtid, Uuid, WireError};
