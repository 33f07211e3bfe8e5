use super::HandshakeClient;
use crate::error::{HandshakeError, Result};
use crate::protocol::message::HandshakeMessage;
use crate::protocol::state::HandshakeState;

impl HandshakeClient {
    /// Starts the handshake by creating a `ClientPrecommit` message.
    ///
    /// The message carries the client's preference lists, its assertion offers
    /// and requests, and the session's fresh challenge. The client then waits
    /// for `ServerPrecommit`.
    ///
    /// 通过创建 `ClientPrecommit` 消息来启动握手。
    ///
    /// 该消息携带客户端的偏好列表、断言提供与请求，以及本会话的新挑战值。
    /// 随后客户端等待 `ServerPrecommit`。
    pub fn start(&mut self) -> Result<HandshakeMessage> {
        if self.core.state != HandshakeState::Start {
            return Err(HandshakeError::InvalidState(self.core.state));
        }

        let precommit = self.core.config.client_precommit(self.core.challenge.clone());

        if let Err(err) = self.core.record_sent(&precommit) {
            return Err(self.core.fail(err));
        }
        self.core.transition(HandshakeState::PrecommitSent);
        Ok(precommit)
    }
}
