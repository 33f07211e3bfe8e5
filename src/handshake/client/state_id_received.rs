use super::HandshakeClient;
use crate::error::Result;
use crate::protocol::message::{FinishPayload, HandshakeMessage};
use crate::protocol::state::{HandshakeState, Role};
use crate::protocol::transcript::{CLIENT_FINISH_LABEL, SERVER_FINISH_LABEL, Transcript};

impl HandshakeClient {
    /// Handles `ServerFinish`: checks the server's authenticator over the
    /// transcript through `ServerId`, then sends `ClientFinish` and completes.
    ///
    /// 处理 `ServerFinish`：校验服务器基于截至 `ServerId` 的握手记录所生成的认证码，
    /// 然后发送 `ClientFinish` 并完成握手。
    pub(super) fn process_server_finish(
        &mut self,
        payload: FinishPayload,
        preceding: &Transcript,
    ) -> Result<Vec<HandshakeMessage>> {
        let secrets = self.core.secrets()?;
        preceding.verify_authenticator(
            secrets.authenticator_secret(Role::Server),
            SERVER_FINISH_LABEL,
            &payload.handshake_authenticator,
        )?;
        let authenticator = self
            .core
            .transcript
            .finish_authenticator(secrets.authenticator_secret(Role::Client), CLIENT_FINISH_LABEL)?;
        self.core.transition(HandshakeState::FinishReceived);

        let client_finish = HandshakeMessage::ClientFinish(FinishPayload {
            handshake_authenticator: authenticator,
        });
        self.core.record_sent(&client_finish)?;
        self.core.transition(HandshakeState::Complete);

        Ok(vec![client_finish])
    }
}
