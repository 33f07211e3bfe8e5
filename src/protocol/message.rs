//! Wire messages of the Enclave Key Exchange Protocol.
//!
//! Every message is derived with both `serde` and `bincode`. The canonical
//! encoding used on the wire and in the transcript is `bincode`'s standard
//! configuration: the `HandshakeMessage` variant tag acts as the
//! handshake message type, followed by the payload fields in order.
//!
//! 增强密钥交换协议（EKEP）的线上消息。
//!
//! 所有消息同时派生 `serde` 与 `bincode`。线上与握手记录中使用的规范编码
//! 是 `bincode` 的标准配置：`HandshakeMessage` 的变体标签即为握手消息类型，
//! 其后按顺序跟随载荷字段。

use crate::error::{BincodeError, Result};
use bincode::config::Config;
use bincode::de::{BorrowDecoder, Decoder};
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{BorrowDecode, Decode, Encode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the size of a single encoded handshake message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Length of the precommit challenge nonces.
pub const CHALLENGE_SIZE: usize = 32;

pub(crate) fn wire_config() -> impl Config {
    bincode::config::standard().with_limit::<MAX_MESSAGE_SIZE>()
}

/// A handshake cipher: a Diffie-Hellman group paired with a hash function.
///
/// The identifier is open: values this crate does not implement still travel
/// through negotiation unchanged.
///
/// 握手密码：Diffie-Hellman 群与哈希函数的组合。
#[derive(
    Serialize, Deserialize, bincode::Encode, bincode::Decode, Clone, Copy, PartialEq, Eq, Hash,
)]
#[serde(transparent)]
pub struct HandshakeCipher(pub u32);

impl HandshakeCipher {
    pub const UNKNOWN_HANDSHAKE_CIPHER: Self = Self(0);
    /// X25519 key exchange with SHA-256 for the key schedule and authenticators.
    pub const CURVE25519_SHA256: Self = Self(1);

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Self::UNKNOWN_HANDSHAKE_CIPHER => Some("UNKNOWN_HANDSHAKE_CIPHER"),
            Self::CURVE25519_SHA256 => Some("CURVE25519_SHA256"),
            _ => None,
        }
    }
}

impl fmt::Debug for HandshakeCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "HandshakeCipher({})", self.0),
        }
    }
}

/// The symmetric record protocol used once the handshake completes.
///
/// 握手完成后使用的对称记录协议。
#[derive(
    Serialize, Deserialize, bincode::Encode, bincode::Decode, Clone, Copy, PartialEq, Eq, Hash,
)]
#[serde(transparent)]
pub struct RecordProtocol(pub u32);

impl RecordProtocol {
    pub const UNKNOWN_RECORD_PROTOCOL: Self = Self(0);
    pub const SEAL_AES128_GCM: Self = Self(1);
    pub const SEAL_AES256_GCM: Self = Self(2);

    pub fn name(&self) -> Option<&'static str> {
        match *self {
            Self::UNKNOWN_RECORD_PROTOCOL => Some("UNKNOWN_RECORD_PROTOCOL"),
            Self::SEAL_AES128_GCM => Some("SEAL_AES128_GCM"),
            Self::SEAL_AES256_GCM => Some("SEAL_AES256_GCM"),
            _ => None,
        }
    }
}

impl fmt::Debug for RecordProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "RecordProtocol({})", self.0),
        }
    }
}

/// Reason carried by an `Abort` message.
///
/// On the wire the code is a `u32`. Codes this build does not know decode as
/// `UnknownErrorCode`, so an abort from a newer peer is still honoured.
///
/// 中止消息携带的原因代码。
///
/// 线上以 `u32` 表示。本版本未知的代码会被解码为 `UnknownErrorCode`。
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCode {
    UnknownErrorCode = 0,
    BadMessage = 1,
    DeserializationFailed = 2,
    BadProtocolVersion = 3,
    BadHandshakeCipher = 4,
    BadRecordProtocol = 5,
    BadAuthenticator = 6,
    BadAssertionType = 7,
    BadAssertion = 8,
    ProtocolError = 9,
    InternalError = 10,
}

impl AbortCode {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Self {
        match code {
            1 => AbortCode::BadMessage,
            2 => AbortCode::DeserializationFailed,
            3 => AbortCode::BadProtocolVersion,
            4 => AbortCode::BadHandshakeCipher,
            5 => AbortCode::BadRecordProtocol,
            6 => AbortCode::BadAuthenticator,
            7 => AbortCode::BadAssertionType,
            8 => AbortCode::BadAssertion,
            9 => AbortCode::ProtocolError,
            10 => AbortCode::InternalError,
            _ => AbortCode::UnknownErrorCode,
        }
    }
}

impl Encode for AbortCode {
    fn encode<E: Encoder>(&self, encoder: &mut E) -> std::result::Result<(), EncodeError> {
        self.code().encode(encoder)
    }
}

impl<Context> Decode<Context> for AbortCode {
    fn decode<D: Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        u32::decode(decoder).map(AbortCode::from_code)
    }
}

impl<'de, Context> BorrowDecode<'de, Context> for AbortCode {
    fn borrow_decode<D: BorrowDecoder<'de, Context = Context>>(
        decoder: &mut D,
    ) -> std::result::Result<Self, DecodeError> {
        u32::borrow_decode(decoder).map(AbortCode::from_code)
    }
}

/// Names an assertion kind: the identity type plus the authority that vouches for it.
///
/// 标识一种断言：身份类型以及为其担保的机构。
#[derive(
    Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq, Hash,
)]
pub struct AssertionDescription {
    pub identity_type: u32,
    pub authority_type: String,
}

impl AssertionDescription {
    pub fn new(identity_type: u32, authority_type: impl Into<String>) -> Self {
        Self {
            identity_type,
            authority_type: authority_type.into(),
        }
    }
}

impl fmt::Display for AssertionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.identity_type, self.authority_type)
    }
}

/// An opaque assertion proof, tagged with the kind that produced it.
#[derive(Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Assertion {
    pub description: AssertionDescription,
    pub assertion: Vec<u8>,
}

/// Handshake options. Reserved; no option is defined yet.
#[derive(
    Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, Default, PartialEq, Eq,
)]
pub struct Options {}

#[derive(Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct AbortPayload {
    pub code: AbortCode,
    pub message: String,
}

/// Client -> Server: the client's preference lists, assertion offers and requests,
/// and a fresh challenge.
#[derive(Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ClientPrecommitPayload {
    pub available_versions: Vec<String>,
    pub available_ciphers: Vec<HandshakeCipher>,
    pub available_record_protocols: Vec<RecordProtocol>,
    pub options: Options,
    pub client_offered_assertions: Vec<AssertionDescription>,
    pub client_requested_assertions: Vec<AssertionDescription>,
    pub challenge: Vec<u8>,
}

/// Server -> Client: the selected parameters and the server's side of the
/// assertion agreement.
#[derive(Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ServerPrecommitPayload {
    pub selected_version: String,
    pub selected_cipher: HandshakeCipher,
    pub selected_record_protocol: RecordProtocol,
    pub options: Options,
    pub server_offered_assertions: Vec<AssertionDescription>,
    pub server_requested_assertions: Vec<AssertionDescription>,
    pub challenge: Vec<u8>,
}

/// Either side's ephemeral public key and the assertions the peer asked for.
#[derive(Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct IdPayload {
    pub dh_public_key: Vec<u8>,
    pub assertions: Vec<Assertion>,
}

#[derive(Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub struct FinishPayload {
    pub handshake_authenticator: Vec<u8>,
}

/// Defines the messages exchanged during the handshake protocol.
///
/// 定义握手协议中交换的消息。
#[derive(Serialize, Deserialize, bincode::Encode, bincode::Decode, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage {
    /// Either direction: terminates the handshake.
    Abort(AbortPayload),
    /// Client -> Server: opens the handshake.
    ClientPrecommit(ClientPrecommitPayload),
    /// Server -> Client: answers the precommit with the negotiated parameters.
    ServerPrecommit(ServerPrecommitPayload),
    /// Client -> Server: client key exchange material and assertions.
    ClientId(IdPayload),
    /// Server -> Client: server key exchange material and assertions.
    ServerId(IdPayload),
    /// Server -> Client: authenticator over the transcript through `ServerId`.
    ServerFinish(FinishPayload),
    /// Client -> Server: authenticator over the transcript through `ServerFinish`.
    ClientFinish(FinishPayload),
}

/// The type tag of a `HandshakeMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Abort,
    ClientPrecommit,
    ServerPrecommit,
    ClientId,
    ServerId,
    ServerFinish,
    ClientFinish,
}

impl HandshakeMessage {
    pub fn message_type(&self) -> MessageType {
        match self {
            HandshakeMessage::Abort(_) => MessageType::Abort,
            HandshakeMessage::ClientPrecommit(_) => MessageType::ClientPrecommit,
            HandshakeMessage::ServerPrecommit(_) => MessageType::ServerPrecommit,
            HandshakeMessage::ClientId(_) => MessageType::ClientId,
            HandshakeMessage::ServerId(_) => MessageType::ServerId,
            HandshakeMessage::ServerFinish(_) => MessageType::ServerFinish,
            HandshakeMessage::ClientFinish(_) => MessageType::ClientFinish,
        }
    }

    pub fn abort(code: AbortCode, message: impl Into<String>) -> Self {
        HandshakeMessage::Abort(AbortPayload {
            code,
            message: message.into(),
        })
    }

    /// Serializes the message into its canonical wire encoding.
    ///
    /// Fails with `BincodeError::Oversized` when the encoding is larger than
    /// `MAX_MESSAGE_SIZE`, since no peer would accept it.
    ///
    /// 将消息序列化为其规范的线上编码。
    ///
    /// 若编码超过 `MAX_MESSAGE_SIZE`，则以 `BincodeError::Oversized` 失败。
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = bincode::encode_to_vec(self, wire_config()).map_err(BincodeError::from)?;
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(BincodeError::Oversized(bytes.len()).into());
        }
        Ok(bytes)
    }

    /// Parses a message, rejecting input that has bytes left over after the message.
    ///
    /// 解析一条消息，若消息之后仍有剩余字节则拒绝。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (message, read) =
            bincode::decode_from_slice(bytes, wire_config()).map_err(BincodeError::from)?;
        if read != bytes.len() {
            return Err(BincodeError::TrailingBytes(bytes.len() - read).into());
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_codes_keep_their_wire_values() {
        for code in [AbortCode::BadMessage, AbortCode::InternalError] {
            assert_eq!(AbortCode::from_code(code.code()), code);
        }
        assert_eq!(AbortCode::InternalError.code(), 10);
    }

    #[test]
    fn unknown_abort_code_decodes_as_unknown() {
        let message = HandshakeMessage::from_bytes(&[0x00, 0x0b, 0x00]).unwrap();
        assert_eq!(message, HandshakeMessage::abort(AbortCode::UnknownErrorCode, ""));
    }

    #[test]
    fn oversized_message_is_not_encoded() {
        let message = HandshakeMessage::ServerFinish(FinishPayload {
            handshake_authenticator: vec![0; MAX_MESSAGE_SIZE],
        });
        assert!(matches!(
            message.to_bytes(),
            Err(crate::error::HandshakeError::SerializationError(BincodeError::Oversized(_)))
        ));
    }
}
