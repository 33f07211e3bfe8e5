//! Implements the client-side of the handshake protocol state machine.
//! 实现握手协议状态机的客户端。

use super::session::{EstablishedSession, SessionCore};
use super::HandshakeEndpoint;
use crate::error::{HandshakeError, Result};
use crate::protocol::assertion::AssertionObligation;
use crate::protocol::message::HandshakeMessage;
use crate::protocol::negotiation::Selection;
use crate::protocol::state::HandshakeState;

mod builder;
mod state_id_received;
mod state_id_sent;
mod state_precommit_sent;
mod state_start;

pub use builder::HandshakeClientBuilder;

/// The client-side handshake state machine.
///
/// The client sends `ClientPrecommit`, then answers `ServerPrecommit` with
/// `ClientId`, accepts `ServerId`, verifies `ServerFinish` and completes by
/// sending `ClientFinish`.
///
/// 客户端握手协议状态机。
#[derive(Debug)]
pub struct HandshakeClient {
    core: SessionCore,
}

impl HandshakeClient {
    /// Creates a new `HandshakeClientBuilder` to construct a `HandshakeClient`.
    ///
    /// 创建一个用于构造 `HandshakeClient` 的构建器。
    pub fn builder() -> HandshakeClientBuilder<super::Missing> {
        HandshakeClientBuilder::new()
    }

    pub fn state(&self) -> HandshakeState {
        self.core.state
    }

    /// The negotiated parameters, once the server's precommit was accepted.
    pub fn selection(&self) -> Option<&Selection> {
        self.core.selection.as_ref()
    }

    pub fn obligations(&self) -> &[AssertionObligation] {
        self.core.broker.obligations()
    }

    /// Processes one message from the server.
    ///
    /// 处理一条来自服务器的消息。
    pub fn handle(&mut self, message: HandshakeMessage) -> Result<Vec<HandshakeMessage>> {
        self.core.admit(&message)?;
        // Finish authenticators cover the transcript up to, not including, the Finish itself.
        let preceding = self.core.transcript.clone();
        if let Err(err) = self.core.record_received(&message) {
            return Err(self.core.fail(err));
        }
        let outcome = match message {
            HandshakeMessage::ServerPrecommit(payload) => self.process_server_precommit(payload),
            HandshakeMessage::ServerId(payload) => self.process_server_id(payload),
            HandshakeMessage::ServerFinish(payload) => {
                self.process_server_finish(payload, &preceding)
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

    /// Aborts the handshake locally with `reason`.
    pub fn cancel(&mut self, reason: HandshakeError) -> HandshakeError {
        self.core.fail(reason)
    }

    /// Aborts the handshake locally, reporting `detail` to the peer as an
    /// internal error.
    ///
    /// 在本地中止握手，并以内部错误的形式向对端报告 `detail`。
    pub fn abort(&mut self, detail: impl Into<String>) -> HandshakeError {
        self.core.fail(HandshakeError::Internal(detail.into()))
    }

    /// Hands the session over to the record layer. Only valid once complete.
    pub fn into_established(self) -> Result<EstablishedSession> {
        self.core.into_established()
    }
}

impl HandshakeEndpoint for HandshakeClient {
    fn state(&self) -> HandshakeState {
        self.core.state
    }

    fn handle(&mut self, message: HandshakeMessage) -> Result<Vec<HandshakeMessage>> {
        HandshakeClient::handle(self, message)
    }

    fn handle_bytes(&mut self, bytes: &[u8]) -> Result<Vec<HandshakeMessage>> {
        HandshakeClient::handle_bytes(self, bytes)
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
