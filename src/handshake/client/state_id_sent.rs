use super::HandshakeClient;
use crate::crypto::keys::derive_handshake_secrets;
use crate::error::{HandshakeError, Result};
use crate::protocol::assertion::AssertionContext;
use crate::protocol::message::{HandshakeMessage, IdPayload};
use crate::protocol::state::{HandshakeState, Role};

impl HandshakeClient {
    /// Handles `ServerId`: verifies the server's assertions, completes the
    /// key exchange and derives the handshake secrets.
    ///
    /// Nothing is sent; the client next expects `ServerFinish`.
    ///
    /// 处理 `ServerId`：验证服务器的断言，完成密钥交换并派生握手密钥。
    pub(super) fn process_server_id(
        &mut self,
        payload: IdPayload,
    ) -> Result<Vec<HandshakeMessage>> {
        let key_schedule_hash = self.core.key_schedule_hash()?;
        self.core.broker.verify(
            &payload.assertions,
            &AssertionContext {
                role: Role::Server,
                transcript_hash: &key_schedule_hash,
            },
        )?;

        let engine = self
            .core
            .key_exchange
            .take()
            .ok_or(HandshakeError::InvalidState(self.core.state))?;
        let shared_secret = engine.agree(&payload.dh_public_key)?;

        let selection = self.core.selection()?;
        let secrets = derive_handshake_secrets(
            selection.cipher,
            selection.record_protocol,
            &shared_secret,
            &key_schedule_hash,
        )?;
        self.core.secrets = Some(secrets);
        self.core.peer_assertions = payload.assertions;
        self.core.transition(HandshakeState::IdReceived);

        Ok(Vec::new())
    }
}
