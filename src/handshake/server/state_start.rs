use super::HandshakeServer;
use crate::crypto::suite::{ensure_cipher_supported, record_key_len};
use crate::error::Result;
use crate::handshake::session::check_challenge;
use crate::protocol::message::{ClientPrecommitPayload, HandshakeMessage, ServerPrecommitPayload};
use crate::protocol::negotiation::{Preferences, negotiate};
use crate::protocol::state::HandshakeState;

impl HandshakeServer {
    /// Handles `ClientPrecommit`: negotiates version, cipher and record
    /// protocol, agrees on assertions and answers with `ServerPrecommit`.
    ///
    /// Negotiation failures abort here, before any key exchange material exists.
    ///
    /// 处理 `ClientPrecommit`：协商版本、密码与记录协议，完成断言协商，
    /// 并以 `ServerPrecommit` 回应。
    ///
    /// 协商失败会在此处中止，此时尚未产生任何密钥交换材料。
    pub(super) fn process_client_precommit(
        &mut self,
        payload: ClientPrecommitPayload,
    ) -> Result<Vec<HandshakeMessage>> {
        check_challenge(&payload.challenge)?;
        self.core.transition(HandshakeState::PrecommitReceived);

        let client = Preferences {
            versions: &payload.available_versions,
            ciphers: &payload.available_ciphers,
            record_protocols: &payload.available_record_protocols,
        };
        let selection = negotiate(&client, &self.core.config.preferences())?;
        ensure_cipher_supported(selection.cipher)?;
        record_key_len(selection.record_protocol)?;

        let config = &self.core.config;
        let (server_offers, server_requests) = self.core.broker.agree_as_server(
            &config.offers,
            &config.requests,
            &payload.client_offered_assertions,
            &payload.client_requested_assertions,
        )?;

        let server_precommit = HandshakeMessage::ServerPrecommit(ServerPrecommitPayload {
            selected_version: selection.version.clone(),
            selected_cipher: selection.cipher,
            selected_record_protocol: selection.record_protocol,
            options: config.options.clone(),
            server_offered_assertions: server_offers,
            server_requested_assertions: server_requests,
            challenge: self.core.challenge.clone(),
        });
        self.core.selection = Some(selection);
        self.core.record_sent(&server_precommit)?;
        self.core.transition(HandshakeState::PrecommitSent);

        Ok(vec![server_precommit])
    }
}
