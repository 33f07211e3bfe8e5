//! The cipher suites this crate can execute and the ephemeral Diffie-Hellman engine.
//!
//! 本 crate 能够执行的密码套件以及临时 Diffie-Hellman 引擎。

use crate::crypto::keys::SharedSecret;
use crate::error::{HandshakeError, Result};
use crate::protocol::message::{HandshakeCipher, RecordProtocol};
use rand::rngs::OsRng;
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey};

/// Length of a Curve25519 public value.
pub const X25519_PUBLIC_KEY_LEN: usize = 32;

/// Returns an error unless the engine can run `cipher`.
pub fn ensure_cipher_supported(cipher: HandshakeCipher) -> Result<()> {
    match cipher {
        HandshakeCipher::CURVE25519_SHA256 => Ok(()),
        other => Err(HandshakeError::UnsupportedCipher(other.0)),
    }
}

/// Size in bytes of each direction's record key for `protocol`.
pub fn record_key_len(protocol: RecordProtocol) -> Result<usize> {
    match protocol {
        RecordProtocol::SEAL_AES128_GCM => Ok(16),
        RecordProtocol::SEAL_AES256_GCM => Ok(32),
        other => Err(HandshakeError::UnsupportedRecordProtocol(other.0)),
    }
}

/// A helper struct to carry the ephemeral key pair during the handshake.
///
/// The private half is consumed by [`KeyExchangeEngine::agree`], so it cannot
/// outlive the single exchange it was generated for.
///
/// 一个在握手期间携带临时密钥对的辅助结构体。
///
/// 私钥部分会被 [`KeyExchangeEngine::agree`] 消耗，因此不会在其所属的单次交换之后继续存在。
pub struct KeyExchangeEngine {
    cipher: HandshakeCipher,
    secret: EphemeralSecret,
    public_key: PublicKey,
}

impl KeyExchangeEngine {
    /// Generates a fresh ephemeral key pair for `cipher`.
    ///
    /// 为 `cipher` 生成一个新的临时密钥对。
    pub fn generate(cipher: HandshakeCipher) -> Result<Self> {
        ensure_cipher_supported(cipher)?;
        let secret = EphemeralSecret::random_from_rng(OsRng);
        let public_key = PublicKey::from(&secret);
        Ok(Self {
            cipher,
            secret,
            public_key,
        })
    }

    pub fn cipher(&self) -> HandshakeCipher {
        self.cipher
    }

    /// The public value to place in the `Id` message.
    pub fn public_key(&self) -> Vec<u8> {
        self.public_key.as_bytes().to_vec()
    }

    /// Computes the shared secret with the peer's public value.
    ///
    /// Fails with a protocol error if the peer's value has the wrong length or
    /// is a low-order point that would force a predictable secret.
    ///
    /// 使用对端公钥计算共享密钥。
    ///
    /// 如果对端公钥长度错误，或是会导致可预测密钥的低阶点，则返回协议错误。
    pub fn agree(self, peer_public_key: &[u8]) -> Result<SharedSecret> {
        let peer: [u8; X25519_PUBLIC_KEY_LEN] = peer_public_key.try_into().map_err(|_| {
            HandshakeError::Protocol(format!(
                "peer public key is {} bytes, expected {}",
                peer_public_key.len(),
                X25519_PUBLIC_KEY_LEN
            ))
        })?;
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(HandshakeError::Protocol(
                "peer public key is a low-order point".into(),
            ));
        }
        Ok(SharedSecret::new(shared.as_bytes().to_vec()))
    }
}

impl fmt::Debug for KeyExchangeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExchangeEngine")
            .field("cipher", &self.cipher)
            .field("public_key", &self.public_key.as_bytes())
            .finish_non_exhaustive()
    }
}
