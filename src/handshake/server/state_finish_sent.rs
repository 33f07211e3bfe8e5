use super::HandshakeServer;
use crate::error::Result;
use crate::protocol::message::{FinishPayload, HandshakeMessage};
use crate::protocol::state::{HandshakeState, Role};
use crate::protocol::transcript::{CLIENT_FINISH_LABEL, Transcript};

impl HandshakeServer {
    /// Handles `ClientFinish`: checks the client's authenticator over the
    /// transcript through `ServerFinish` and completes the handshake.
    ///
    /// 处理 `ClientFinish`：校验客户端基于截至 `ServerFinish` 的握手记录所生成的认证码，
    /// 并完成握手。
    pub(super) fn process_client_finish(
        &mut self,
        payload: FinishPayload,
        preceding: &Transcript,
    ) -> Result<Vec<HandshakeMessage>> {
        preceding.verify_authenticator(
            self.core.secrets()?.authenticator_secret(Role::Client),
            CLIENT_FINISH_LABEL,
            &payload.handshake_authenticator,
        )?;
        self.core.transition(HandshakeState::FinishReceived);
        self.core.transition(HandshakeState::Complete);
        Ok(Vec::new())
    }
}
