//! Manages the derivation of handshake and session keys from the shared secret.
//!
//! This module centralizes the key schedule used by both the client and the
//! server once the Diffie-Hellman exchange is complete. It ensures that both
//! parties derive the same secrets using the same labels.
//!
//! 管理从共享密钥派生握手密钥和会话密钥的过程。
//!
//! 该模块集中了客户端和服务器在 Diffie-Hellman 交换完成后使用的密钥派生逻辑。
//! 它确保双方使用相同的标签派生出相同的密钥。

use crate::crypto::suite::{ensure_cipher_supported, record_key_len};
use crate::error::{HandshakeError, Result};
use crate::protocol::message::{HandshakeCipher, RecordProtocol};
use crate::protocol::state::Role;
use hkdf::Hkdf;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const CLIENT_AUTHENTICATOR_LABEL: &[u8] = b"EKEP Client Authenticator Secret";
const SERVER_AUTHENTICATOR_LABEL: &[u8] = b"EKEP Server Authenticator Secret";
const CLIENT_RECORD_KEY_LABEL: &[u8] = b"EKEP Client Record Key";
const SERVER_RECORD_KEY_LABEL: &[u8] = b"EKEP Server Record Key";

/// Length of each authenticator secret.
pub const AUTHENTICATOR_SECRET_LEN: usize = 32;

/// The raw Diffie-Hellman output. Wiped when dropped.
///
/// 原始的 Diffie-Hellman 输出。在销毁时清零。
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

impl SharedSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}

/// Every secret the handshake derives from the shared secret.
///
/// 握手从共享密钥派生出的全部密钥。
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HandshakeSecrets {
    client_authenticator: [u8; AUTHENTICATOR_SECRET_LEN],
    server_authenticator: [u8; AUTHENTICATOR_SECRET_LEN],
    client_record_key: Vec<u8>,
    server_record_key: Vec<u8>,
}

impl HandshakeSecrets {
    /// The authenticator secret that keys the Finish message sent by `role`.
    pub fn authenticator_secret(&self, role: Role) -> &[u8] {
        match role {
            Role::Client => &self.client_authenticator,
            Role::Server => &self.server_authenticator,
        }
    }

    /// Splits the record keys into the send/receive pair seen from `role`.
    ///
    /// 按 `role` 的视角将记录密钥拆分为发送/接收密钥对。
    pub fn record_keys(&self, role: Role, protocol: RecordProtocol) -> RecordKeys {
        let (send_key, receive_key) = match role {
            Role::Client => (&self.client_record_key, &self.server_record_key),
            Role::Server => (&self.server_record_key, &self.client_record_key),
        };
        RecordKeys {
            protocol,
            send_key: send_key.clone(),
            receive_key: receive_key.clone(),
        }
    }
}

impl fmt::Debug for HandshakeSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandshakeSecrets(<redacted>)")
    }
}

/// Keys handed to the record layer once the handshake completes.
///
/// 握手完成后交给记录层的密钥。
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RecordKeys {
    #[zeroize(skip)]
    protocol: RecordProtocol,
    send_key: Vec<u8>,
    receive_key: Vec<u8>,
}

impl RecordKeys {
    pub fn protocol(&self) -> RecordProtocol {
        self.protocol
    }

    /// Key protecting records this side sends.
    pub fn send_key(&self) -> &[u8] {
        &self.send_key
    }

    /// Key protecting records this side receives.
    pub fn receive_key(&self) -> &[u8] {
        &self.receive_key
    }
}

impl fmt::Debug for RecordKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordKeys")
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

/// Derives the authenticator secrets and record keys.
///
/// `PRK = HKDF-Extract(transcript_hash, shared_secret)`, then one HKDF-Expand
/// per role-scoped label. The salt binds the secrets to everything negotiated
/// up to and including the client's `Id` message.
///
/// 派生认证密钥与记录密钥。
///
/// 先以握手记录哈希为盐执行 HKDF-Extract，再针对每个按角色区分的标签执行一次 HKDF-Expand。
pub fn derive_handshake_secrets(
    cipher: HandshakeCipher,
    record_protocol: RecordProtocol,
    shared_secret: &SharedSecret,
    transcript_hash: &[u8],
) -> Result<HandshakeSecrets> {
    ensure_cipher_supported(cipher)?;
    let record_len = record_key_len(record_protocol)?;
    let hkdf = Hkdf::<Sha256>::new(Some(transcript_hash), shared_secret.as_bytes());

    let expand = |label: &[u8], out: &mut [u8]| {
        hkdf.expand(label, out)
            .map_err(|_| HandshakeError::Internal("HKDF output length out of range".into()))
    };

    let mut secrets = HandshakeSecrets {
        client_authenticator: [0u8; AUTHENTICATOR_SECRET_LEN],
        server_authenticator: [0u8; AUTHENTICATOR_SECRET_LEN],
        client_record_key: vec![0u8; record_len],
        server_record_key: vec![0u8; record_len],
    };
    expand(CLIENT_AUTHENTICATOR_LABEL, &mut secrets.client_authenticator[..])?;
    expand(SERVER_AUTHENTICATOR_LABEL, &mut secrets.server_authenticator[..])?;
    expand(CLIENT_RECORD_KEY_LABEL, &mut secrets.client_record_key[..])?;
    expand(SERVER_RECORD_KEY_LABEL, &mut secrets.server_record_key[..])?;
    Ok(secrets)
}
