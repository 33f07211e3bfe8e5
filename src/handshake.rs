//! The client and server handshake state machines.
//!
//! Each session is driven by one thread of control: feed it the peer's next
//! message and send whatever it returns. Any failure moves the session to
//! `Aborted` and queues an `Abort` message that can be taken with
//! `take_abort()` and sent best-effort.
//!
//! 客户端与服务器端握手状态机。

use crate::error::Result;
use crate::protocol::message::HandshakeMessage;
use crate::protocol::state::HandshakeState;

pub mod client;
pub mod driver;
pub mod server;
mod session;

pub use client::{HandshakeClient, HandshakeClientBuilder};
pub use server::{HandshakeServer, HandshakeServerBuilder};
pub use session::EstablishedSession;

/// Marker type for a missing field in the builders.
///
/// 用于在构建器中标记缺失字段的类型。
#[derive(Debug, Default)]
pub struct Missing;

/// Operations common to both roles, used by the transport drivers.
pub trait HandshakeEndpoint: Sized {
    fn state(&self) -> HandshakeState;

    /// Processes one inbound message, returning the messages to send in order.
    fn handle(&mut self, message: HandshakeMessage) -> Result<Vec<HandshakeMessage>>;

    /// Decodes and processes one inbound message.
    fn handle_bytes(&mut self, bytes: &[u8]) -> Result<Vec<HandshakeMessage>>;

    /// The `Abort` queued by the last failure, returned at most once.
    fn take_abort(&mut self) -> Option<HandshakeMessage>;

    /// Aborts the session locally, e.g. when waiting for the peer timed out.
    fn cancel(&mut self, reason: crate::error::HandshakeError) -> crate::error::HandshakeError;

    fn into_established(self) -> Result<EstablishedSession>;
}
