//! Manages the hashing of the handshake transcript.
//!
//! This struct centralizes the logic for updating the transcript hash and
//! computing the Finish authenticators over it, ensuring consistency between
//! the client and server.
//!
//! 管理握手记录的哈希计算。
//!
//! 此结构体集中了更新握手记录哈希以及基于其计算 Finish 认证码的逻辑，
//! 确保了客户端和服务器之间的一致性。
use crate::error::{HandshakeError, Result};
use crate::protocol::message::HandshakeMessage;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Label mixed into the authenticator the server sends in `ServerFinish`.
pub const SERVER_FINISH_LABEL: &[u8] = b"EKEP Handshake Authenticator: Server Finish";
/// Label mixed into the authenticator the client sends in `ClientFinish`.
pub const CLIENT_FINISH_LABEL: &[u8] = b"EKEP Handshake Authenticator: Client Finish";

#[derive(Debug, Clone)]
pub struct Transcript {
    hasher: Sha256,
    entries: usize,
}

impl Transcript {
    /// Creates a new, empty transcript.
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
            entries: 0,
        }
    }

    /// Updates the transcript with a handshake message.
    ///
    /// The message is serialized to its canonical bytes before being added to the hash.
    ///
    /// 使用握手消息更新握手记录。
    ///
    /// 在添加到哈希之前，消息被序列化为规范字节。
    pub fn update(&mut self, message: &HandshakeMessage) -> Result<()> {
        let bytes = message.to_bytes()?;
        self.append(&bytes);
        Ok(())
    }

    /// Appends one already-serialized message.
    pub fn append(&mut self, bytes: &[u8]) {
        // Length prefix keeps entry boundaries unambiguous.
        self.hasher.update((bytes.len() as u64).to_be_bytes());
        self.hasher.update(bytes);
        self.entries += 1;
    }

    /// Number of messages appended so far.
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Returns the current hash state without consuming the transcript.
    ///
    /// 返回当前的哈希状态，而不会消耗握手记录。
    pub fn current_hash(&self) -> [u8; 32] {
        self.hasher.clone().finalize().into()
    }

    /// Computes `HMAC-SHA256(secret, label || H(transcript))` over the transcript
    /// as it stands at the point of the call.
    ///
    /// 计算截至调用时刻握手记录的 `HMAC-SHA256(secret, label || H(transcript))`。
    pub fn finish_authenticator(&self, secret: &[u8], label: &[u8]) -> Result<Vec<u8>> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(secret)
            .map_err(|_| HandshakeError::Internal("invalid authenticator secret".into()))?;
        mac.update(label);
        mac.update(&self.current_hash());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Recomputes the authenticator and compares it with `received` in constant time.
    ///
    /// 重新计算认证码，并以常数时间与 `received` 比较。
    pub fn verify_authenticator(&self, secret: &[u8], label: &[u8], received: &[u8]) -> Result<()> {
        let expected = self.finish_authenticator(secret, label)?;
        if expected.len() == received.len() && bool::from(expected.ct_eq(received)) {
            Ok(())
        } else {
            Err(HandshakeError::BadAuthenticator)
        }
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
