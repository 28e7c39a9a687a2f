//! # Scenelink Client
//! Connects to a remote rendering gateway and a scene-authority broker,
//! keeps a local mirror of the remote entity-component scene graph in sync,
//! and demultiplexes the gateway's binary streaming protocol.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub mod broker;
pub mod gateway;
pub mod transport;
pub mod world;

mod client;
mod config;
mod error;

pub use client::{Client, ClientEvent, Resolution};
pub use config::{LinkConfig, SessionInfo};
pub use error::{BrokerError, ClientError, LinkError, RegistryError};

pub use broker::{BrokerChannel, BrokerEvent, EntityRecord, RequestKind, ResponseKey};
pub use gateway::{GatewayEvent, GatewayLink};
pub use transport::{mock::MockTransport, tcp::TcpTransport, Transport, TransportError};
pub use world::{Entity, EntityRegistry};
