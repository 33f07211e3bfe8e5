use super::HandshakeServer;
use crate::crypto::keys::derive_handshake_secrets;
use crate::crypto::suite::KeyExchangeEngine;
use crate::error::Result;
use crate::protocol::assertion::AssertionContext;
use crate::protocol::message::{FinishPayload, HandshakeMessage, IdPayload};
use crate::protocol::state::{HandshakeState, Role};
use crate::protocol::transcript::{SERVER_FINISH_LABEL, Transcript};

impl HandshakeServer {
    /// Handles `ClientId`: verifies the client's assertions, runs the key
    /// exchange, derives the handshake secrets and answers with `ServerId`
    /// followed by `ServerFinish`.
    ///
    /// 处理 `ClientId`：验证客户端断言，执行密钥交换，派生握手密钥，
    /// 并依次以 `ServerId` 和 `ServerFinish` 回应。
    pub(super) fn process_client_id(
        &mut self,
        payload: IdPayload,
        preceding: &Transcript,
    ) -> Result<Vec<HandshakeMessage>> {
        let key_schedule_hash = self.core.transcript.current_hash();
        self.core.key_schedule_hash = Some(key_schedule_hash);
        self.core.transition(HandshakeState::IdReceived);

        let precommit_hash = preceding.current_hash();
        self.core.broker.verify(
            &payload.assertions,
            &AssertionContext {
                role: Role::Client,
                transcript_hash: &precommit_hash,
            },
        )?;

        let selection = self.core.selection()?.clone();
        let engine = KeyExchangeEngine::generate(selection.cipher)?;
        let dh_public_key = engine.public_key();
        let shared_secret = engine.agree(&payload.dh_public_key)?;
        let secrets = derive_handshake_secrets(
            selection.cipher,
            selection.record_protocol,
            &shared_secret,
            &key_schedule_hash,
        )?;
        drop(shared_secret);
        self.core.peer_assertions = payload.assertions;

        let assertions = self.core.broker.produce(&AssertionContext {
            role: Role::Server,
            transcript_hash: &key_schedule_hash,
        })?;
        let server_id = HandshakeMessage::ServerId(IdPayload {
            dh_public_key,
            assertions,
        });
        self.core.record_sent(&server_id)?;
        self.core.transition(HandshakeState::IdSent);

        let authenticator = self
            .core
            .transcript
            .finish_authenticator(secrets.authenticator_secret(Role::Server), SERVER_FINISH_LABEL)?;
        self.core.secrets = Some(secrets);
        let server_finish = HandshakeMessage::ServerFinish(FinishPayload {
            handshake_authenticator: authenticator,
        });
        self.core.record_sent(&server_finish)?;
        self.core.transition(HandshakeState::FinishSent);

        Ok(vec![server_id, server_finish])
    }
}
