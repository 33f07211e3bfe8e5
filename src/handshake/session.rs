//! State shared by both roles: the transcript, the negotiated parameters,
//! the secret material and the abort bookkeeping.
//!
//! 双方角色共享的状态：握手记录、协商参数、密钥材料以及中止记录。

use crate::config::HandshakeConfig;
use crate::crypto::keys::{HandshakeSecrets, RecordKeys};
use crate::crypto::suite::KeyExchangeEngine;
use crate::error::{HandshakeError, Result};
use crate::protocol::assertion::{AssertionBroker, AssertionRegistry};
use crate::protocol::message::{
    AbortCode, Assertion, CHALLENGE_SIZE, HandshakeCipher, HandshakeMessage, RecordProtocol,
};
use crate::protocol::negotiation::Selection;
use crate::protocol::state::{HandshakeState, Role};
use crate::protocol::transcript::Transcript;
use rand::RngCore;
use rand::rngs::OsRng;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Leading byte of an encoded `HandshakeMessage::Abort`.
const ABORT_TAG: u8 = 0;

/// The outcome of a completed handshake, ready for the record layer.
///
/// 握手成功完成后的结果，可直接交给记录层。
#[derive(Debug)]
pub struct EstablishedSession {
    role: Role,
    selection: Selection,
    record_keys: RecordKeys,
    peer_assertions: Vec<Assertion>,
}

impl EstablishedSession {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn version(&self) -> &str {
        &self.selection.version
    }

    pub fn cipher(&self) -> HandshakeCipher {
        self.selection.cipher
    }

    pub fn record_protocol(&self) -> RecordProtocol {
        self.selection.record_protocol
    }

    pub fn record_keys(&self) -> &RecordKeys {
        &self.record_keys
    }

    /// Consumes the session, yielding only the keys.
    pub fn into_record_keys(self) -> RecordKeys {
        self.record_keys
    }

    /// The assertions the peer presented, all of which verified.
    pub fn peer_assertions(&self) -> &[Assertion] {
        &self.peer_assertions
    }
}

#[derive(Debug)]
pub(crate) struct SessionCore {
    pub(crate) role: Role,
    pub(crate) state: HandshakeState,
    pub(crate) config: HandshakeConfig,
    pub(crate) transcript: Transcript,
    pub(crate) broker: AssertionBroker,
    pub(crate) challenge: Vec<u8>,
    pub(crate) selection: Option<Selection>,
    /// Transcript hash through `ClientId`; salts the key schedule.
    pub(crate) key_schedule_hash: Option<[u8; 32]>,
    pub(crate) key_exchange: Option<KeyExchangeEngine>,
    pub(crate) secrets: Option<HandshakeSecrets>,
    pub(crate) peer_assertions: Vec<Assertion>,
    pending_abort: Option<HandshakeMessage>,
}

impl SessionCore {
    pub(crate) fn new(
        role: Role,
        config: HandshakeConfig,
        registry: Arc<AssertionRegistry>,
    ) -> Self {
        let mut challenge = vec![0u8; CHALLENGE_SIZE];
        OsRng.fill_bytes(&mut challenge);
        Self {
            role,
            state: HandshakeState::Start,
            config,
            transcript: Transcript::new(),
            broker: AssertionBroker::new(registry),
            challenge,
            selection: None,
            key_schedule_hash: None,
            key_exchange: None,
            secrets: None,
            peer_assertions: Vec::new(),
            pending_abort: None,
        }
    }

    pub(crate) fn transition(&mut self, next: HandshakeState) {
        debug!(role = ?self.role, from = ?self.state, to = ?next, "handshake state transition");
        self.state = next;
        if next == HandshakeState::Complete {
            if let Some(selection) = &self.selection {
                info!(
                    role = ?self.role,
                    version = %selection.version,
                    cipher = ?selection.cipher,
                    record_protocol = ?selection.record_protocol,
                    "handshake complete"
                );
            }
        }
    }

    /// Decides whether `message` may be processed in the current state.
    ///
    /// A closed session rejects everything without side effects. A peer abort
    /// closes the session without a reply. Anything other than the one
    /// expected message type aborts the session.
    ///
    /// 判断 `message` 在当前状态下能否被处理。
    pub(crate) fn admit(&mut self, message: &HandshakeMessage) -> Result<()> {
        let received = message.message_type();
        if self.state.is_terminal() {
            debug!(
                role = ?self.role,
                state = ?self.state,
                ?received,
                "message after close ignored"
            );
            return Err(HandshakeError::SessionClosed(Some(received)));
        }
        if let HandshakeMessage::Abort(abort) = message {
            warn!(
                role = ?self.role,
                state = ?self.state,
                code = ?abort.code,
                detail = %abort.message,
                "peer aborted handshake"
            );
            self.enter_aborted();
            return Err(HandshakeError::PeerAborted {
                code: abort.code,
                message: abort.message.clone(),
            });
        }
        if self.state.expected_message(self.role) != Some(received) {
            return Err(self.fail(HandshakeError::UnexpectedMessage {
                state: self.state,
                received,
            }));
        }
        debug!(role = ?self.role, ?received, "received handshake message");
        Ok(())
    }

    /// Decodes raw bytes from the peer.
    ///
    /// A frame tagged as `Abort` closes the session even when its body does
    /// not decode, and is never answered with an abort of our own.
    ///
    /// 解码来自对端的原始字节。
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> Result<HandshakeMessage> {
        match HandshakeMessage::from_bytes(bytes) {
            Ok(message) => Ok(message),
            Err(_) if self.state.is_terminal() => Err(HandshakeError::SessionClosed(None)),
            Err(err) if bytes.first() == Some(&ABORT_TAG) => {
                warn!(
                    role = ?self.role,
                    state = ?self.state,
                    error = %err,
                    "peer sent a malformed abort"
                );
                self.enter_aborted();
                Err(HandshakeError::PeerAborted {
                    code: AbortCode::UnknownErrorCode,
                    message: err.to_string(),
                })
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    pub(crate) fn record_sent(&mut self, message: &HandshakeMessage) -> Result<()> {
        self.transcript.update(message)?;
        debug!(role = ?self.role, sent = ?message.message_type(), "sent handshake message");
        Ok(())
    }

    pub(crate) fn record_received(&mut self, message: &HandshakeMessage) -> Result<()> {
        self.transcript.update(message)
    }

    pub(crate) fn selection(&self) -> Result<&Selection> {
        self.selection
            .as_ref()
            .ok_or(HandshakeError::InvalidState(self.state))
    }

    pub(crate) fn secrets(&self) -> Result<&HandshakeSecrets> {
        self.secrets
            .as_ref()
            .ok_or(HandshakeError::InvalidState(self.state))
    }

    pub(crate) fn key_schedule_hash(&self) -> Result<[u8; 32]> {
        self.key_schedule_hash
            .ok_or(HandshakeError::InvalidState(self.state))
    }

    /// Aborts the session because of `err`, queuing an `Abort` for the peer.
    ///
    /// Returns `err` so callers can write `return Err(core.fail(err))`.
    ///
    /// 因 `err` 中止会话，并为对端排队一条 `Abort` 消息。
    pub(crate) fn fail(&mut self, err: HandshakeError) -> HandshakeError {
        if self.state.is_terminal() {
            return err;
        }
        let code = err.abort_code();
        warn!(role = ?self.role, state = ?self.state, ?code, error = %err, "aborting handshake");
        self.pending_abort = Some(HandshakeMessage::abort(code, err.to_string()));
        self.enter_aborted();
        err
    }

    fn enter_aborted(&mut self) {
        self.transition(HandshakeState::Aborted);
        self.key_exchange = None;
        self.secrets = None;
        self.key_schedule_hash = None;
    }

    pub(crate) fn take_abort(&mut self) -> Option<HandshakeMessage> {
        self.pending_abort.take()
    }

    /// Hands the negotiated parameters and record keys to the caller.
    ///
    /// The handshake secrets are dropped, and wiped, on return.
    ///
    /// 将协商参数与记录密钥交给调用方。
    ///
    /// 返回时握手密钥会被丢弃并清零。
    pub(crate) fn into_established(mut self) -> Result<EstablishedSession> {
        if self.state != HandshakeState::Complete {
            return Err(HandshakeError::InvalidState(self.state));
        }
        let selection = self
            .selection
            .take()
            .ok_or(HandshakeError::InvalidState(self.state))?;
        let secrets = self
            .secrets
            .take()
            .ok_or(HandshakeError::InvalidState(self.state))?;
        let record_keys = secrets.record_keys(self.role, selection.record_protocol);
        Ok(EstablishedSession {
            role: self.role,
            selection,
            record_keys,
            peer_assertions: std::mem::take(&mut self.peer_assertions),
        })
    }
}

/// Checks a precommit challenge has the required length.
pub(crate) fn check_challenge(challenge: &[u8]) -> Result<()> {
    if challenge.len() != CHALLENGE_SIZE {
        return Err(HandshakeError::Protocol(format!(
            "challenge is {} bytes, expected {CHALLENGE_SIZE}",
            challenge.len()
        )));
    }
    Ok(())
}
