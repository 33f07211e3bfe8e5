//! Implements the server-side of the handshake protocol state machine.
//! 实现握手协议状态机的服务器端。

use super::session::{EstablishedSession, SessionCore};
use super::HandshakeEndpoint;
use crate::error::{HandshakeError, Result};
use crate::protocol::assertion::AssertionObligation;
use crate::protocol::message::HandshakeMessage;
use crate::protocol::negotiation::Selection;
use crate::protocol::state::HandshakeState;

mod builder;
mod state_finish_sent;
mod state_precommit_sent;
mod state_start;

pub use builder::HandshakeServerBuilder;

/// The server-side handshake state machine.
///
/// The server answers `ClientPrecommit` with `ServerPrecommit`, answers
/// `ClientId` with `ServerId` and `ServerFinish`, and completes once the
/// client's `ClientFinish` verifies.
///
/// 服务器端握手协议状态机。
#[derive(Debug)]
pub struct HandshakeServer {
    core: SessionCore,
}

impl HandshakeServer {
    pub fn builder() -> HandshakeServerBuilder<super::Missing> {
        HandshakeServerBuilder::new()
    }

    pub fn state(&self) -> HandshakeState {
        self.core.state
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.core.selection.as_ref()
    }

    pub fn obligations(&self) -> &[AssertionObligation] {
        self.core.broker.obligations()
    }

    /// Processes one message from the client.
    ///
    /// 处理一条来自客户端的消息。
    pub fn handle(&mut self, message: HandshakeMessage) -> Result<Vec<HandshakeMessage>> {
        self.core.admit(&message)?;
        let preceding = self.core.transcript.clone();
        if let Err(err) = self.core.record_received(&message) {
            return Err(self.core.fail(err));
        }
        let outcome = match message {
            HandshakeMessage::ClientPrecommit(payload) => self.process_client_precommit(payload),
            HandshakeMessage::ClientId(payload) => self.process_client_id(payload, &preceding),
            HandshakeMessage::ClientFinish(payload) => {
                self.process_client_finish(payload, &preceding)
            }
            other => Err(HandshakeError::UnexpectedMessage {
                state: self.core.state,
                received: other.message_type(),
            }),
        };
        outcome.map_err(|err| self.core.fail(err))
    }

    pub fn handle_bytes(&mut self, bytes: &[u8]) -> Result<Vec<HandshakeMessage>> {
        let message = self.core.decode(bytes)?;
        self.handle(message)
    }

    pub fn take_abort(&mut self) -> Option<HandshakeMessage> {
        self.core.take_abort()
    }

    pub fn cancel(&mut self, reason: HandshakeError) -> HandshakeError {
        self.core.fail(reason)
    }

    /// Aborts the handshake locally, reporting `detail` to the peer as an
    /// internal error.
    pub fn abort(&mut self, detail: impl Into<String>) -> HandshakeError {
        self.core.fail(HandshakeError::Internal(detail.into()))
    }

    pub fn into_established(self) -> Result<EstablishedSession> {
        self.core.into_established()
    }
}

impl HandshakeEndpoint for HandshakeServer {
    fn state(&self) -> HandshakeState {
        self.core.state
    }

    fn handle(&mut self, message: HandshakeMessage) -> Result<Vec<HandshakeMessage>> {
        HandshakeServer::handle(self, message)
    }

    fn handle_bytes(&mut self, bytes: &[u8]) -> Result<Vec<HandshakeMessage>> {
        HandshakeServer::handle_bytes(self, bytes)
    }

    fn take_abort(&mut self) -> Option<HandshakeMessage> {
        self.core.take_abort()
    }

    fn cancel(&mut self, reason: HandshakeError) -> HandshakeError {
        self.core.fail(reason)
    }

    fn into_established(self) -> Result<EstablishedSession> {
        self.core.into_established()
    }
}
