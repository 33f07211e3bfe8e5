//! Per-peer handshake configuration.
//!
//! 每个对端的握手配置。

use crate::error::{BincodeError, HandshakeError, Result};
use crate::protocol::assertion::AssertionRegistry;
use crate::protocol::message::{
    AssertionDescription, CHALLENGE_SIZE, ClientPrecommitPayload, HandshakeCipher,
    HandshakeMessage, MAX_MESSAGE_SIZE, Options, RecordProtocol,
};
use crate::protocol::negotiation::Preferences;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Preference lists and assertion policy for one peer.
///
/// Lists are ordered, earlier entries preferred. Identifiers this crate cannot
/// execute are allowed: they are still negotiable values, and selecting one
/// fails the handshake with the matching abort code.
///
/// 单个对端的偏好列表与断言策略。
///
/// 列表有序，靠前的条目优先。允许出现本 crate 无法执行的标识符：
/// 它们仍是可协商的值，一旦被选中，握手会以相应的中止代码失败。
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub versions: Vec<String>,
    pub ciphers: Vec<HandshakeCipher>,
    pub record_protocols: Vec<RecordProtocol>,
    #[serde(default)]
    pub options: Options,
    /// Assertions this peer is able to produce.
    #[serde(default)]
    pub offers: Vec<AssertionDescription>,
    /// Assertions this peer requires from the other side.
    #[serde(default)]
    pub requests: Vec<AssertionDescription>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            versions: vec!["v1".to_string()],
            ciphers: vec![HandshakeCipher::CURVE25519_SHA256],
            record_protocols: vec![RecordProtocol::SEAL_AES128_GCM],
            options: Options::default(),
            offers: Vec::new(),
            requests: Vec::new(),
        }
    }
}

impl HandshakeConfig {
    pub fn preferences(&self) -> Preferences<'_> {
        Preferences {
            versions: &self.versions,
            ciphers: &self.ciphers,
            record_protocols: &self.record_protocols,
        }
    }

    /// Checks the configuration is usable with `registry`.
    ///
    /// 检查此配置能否与 `registry` 一起使用。
    pub fn validate(&self, registry: &AssertionRegistry) -> Result<()> {
        non_empty_unique("versions", &self.versions)?;
        non_empty_unique("ciphers", &self.ciphers)?;
        non_empty_unique("record_protocols", &self.record_protocols)?;

        if let Some(offer) = self.offers.iter().find(|d| registry.generator(d).is_none()) {
            return Err(HandshakeError::InvalidConfig(format!(
                "no generator registered for offered assertion {offer}"
            )));
        }
        if let Some(request) = self.requests.iter().find(|d| registry.verifier(d).is_none()) {
            return Err(HandshakeError::InvalidConfig(format!(
                "no verifier registered for requested assertion {request}"
            )));
        }

        match self.client_precommit(vec![0; CHALLENGE_SIZE]).to_bytes() {
            Err(HandshakeError::SerializationError(BincodeError::Oversized(len))) => {
                Err(HandshakeError::InvalidConfig(format!(
                    "precommit would encode to {len} bytes, limit is {MAX_MESSAGE_SIZE}"
                )))
            }
            Err(err) => Err(err),
            Ok(_) => Ok(()),
        }
    }

    /// The `ClientPrecommit` announcing this configuration.
    pub(crate) fn client_precommit(&self, challenge: Vec<u8>) -> HandshakeMessage {
        HandshakeMessage::ClientPrecommit(ClientPrecommitPayload {
            available_versions: self.versions.clone(),
            available_ciphers: self.ciphers.clone(),
            available_record_protocols: self.record_protocols.clone(),
            options: self.options.clone(),
            client_offered_assertions: self.offers.clone(),
            client_requested_assertions: self.requests.clone(),
            challenge,
        })
    }
}

fn non_empty_unique<T: Eq + Hash>(name: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(HandshakeError::InvalidConfig(format!("{name} must not be empty")));
    }
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    if !values.iter().all(|v| seen.insert(v)) {
        return Err(HandshakeError::InvalidConfig(format!(
            "{name} contains duplicate entries"
        )));
    }
    Ok(())
}
