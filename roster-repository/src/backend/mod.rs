//! Lazily-connecting backend client.

mod client;

pub use client::{BackendClient, ConnectionStatus, Connector};
