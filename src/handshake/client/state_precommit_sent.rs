use super::HandshakeClient;
use crate::crypto::suite::{KeyExchangeEngine, ensure_cipher_supported, record_key_len};
use crate::error::Result;
use crate::handshake::session::check_challenge;
use crate::protocol::assertion::AssertionContext;
use crate::protocol::message::{HandshakeMessage, IdPayload, ServerPrecommitPayload};
use crate::protocol::negotiation::{Selection, check_selection};
use crate::protocol::state::{HandshakeState, Role};

impl HandshakeClient {
    /// Handles `ServerPrecommit`: accepts the server's selection and assertion
    /// agreement, then answers with `ClientId`.
    ///
    /// 处理 `ServerPrecommit`：接受服务器的选择与断言协商，然后以 `ClientId` 回应。
    pub(super) fn process_server_precommit(
        &mut self,
        payload: ServerPrecommitPayload,
    ) -> Result<Vec<HandshakeMessage>> {
        check_challenge(&payload.challenge)?;

        let selection = Selection {
            version: payload.selected_version,
            cipher: payload.selected_cipher,
            record_protocol: payload.selected_record_protocol,
        };
        check_selection(&self.core.config.preferences(), &selection)?;
        ensure_cipher_supported(selection.cipher)?;
        record_key_len(selection.record_protocol)?;

        let config = &self.core.config;
        self.core.broker.agree_as_client(
            &config.offers,
            &config.requests,
            &payload.server_offered_assertions,
            &payload.server_requested_assertions,
        )?;

        let cipher = selection.cipher;
        self.core.selection = Some(selection);
        self.core.transition(HandshakeState::PrecommitReceived);

        let engine = KeyExchangeEngine::generate(cipher)?;
        let precommit_hash = self.core.transcript.current_hash();
        let assertions = self.core.broker.produce(&AssertionContext {
            role: Role::Client,
            transcript_hash: &precommit_hash,
        })?;

        let client_id = HandshakeMessage::ClientId(IdPayload {
            dh_public_key: engine.public_key(),
            assertions,
        });
        self.core.key_exchange = Some(engine);
        self.core.record_sent(&client_id)?;
        self.core.key_schedule_hash = Some(self.core.transcript.current_hash());
        self.core.transition(HandshakeState::IdSent);

        Ok(vec![client_id])
    }
}
