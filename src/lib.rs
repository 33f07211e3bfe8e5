//! Enclave Key Exchange Protocol (EKEP) handshake.
//!
//! Two peers negotiate a protocol version, a Diffie-Hellman handshake cipher
//! and a record protocol, authenticate each other through pluggable
//! assertions, and derive keys for an external record layer.
//!
//! 增强密钥交换协议（EKEP）握手。

pub mod config;
pub mod crypto;
pub mod error;
pub mod handshake;
pub mod protocol;

pub use config::HandshakeConfig;
pub use error::{HandshakeError, Result};
pub use handshake::{EstablishedSession, HandshakeClient, HandshakeServer};
