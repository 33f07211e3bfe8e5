use thiserror::Error;

use crate::protocol::message::{AbortCode, AssertionDescription, MessageType};
use crate::protocol::state::HandshakeState;

/// An error related to `bincode` serialization or deserialization.
///
/// This is a wrapper around `bincode`'s own error types to provide a more
/// consistent error handling experience within this crate.
///
/// 与 `bincode` 序列化或反序列化相关的错误。
///
/// 这是对 `bincode` 自身错误类型的包装，以便在此 crate 中提供更一致的错误处理体验。
#[derive(Error, Debug)]
pub enum BincodeError {
    /// An error occurred during serialization (encoding).
    ///
    /// 在序列化（编码）过程中发生错误。
    #[error("Encode error: {0}")]
    Enc(#[source] Box<bincode::error::EncodeError>),
    /// An error occurred during deserialization (decoding).
    ///
    /// 在反序列化（解码）过程中发生错误。
    #[error("Decode error: {0}")]
    Dec(#[source] Box<bincode::error::DecodeError>),
    /// The input held bytes past the end of the decoded message.
    ///
    /// 输入在解码消息之后仍有多余字节。
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),
    /// The encoded message exceeds the wire size limit.
    ///
    /// 编码后的消息超出线上大小限制。
    #[error("encoded message is {0} bytes, over the wire size limit")]
    Oversized(usize),
}

impl From<bincode::error::EncodeError> for BincodeError {
    fn from(err: bincode::error::EncodeError) -> Self {
        BincodeError::Enc(Box::from(err))
    }
}

impl From<bincode::error::DecodeError> for BincodeError {
    fn from(err: bincode::error::DecodeError) -> Self {
        BincodeError::Dec(Box::from(err))
    }
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("serialization or deserialization failed: {0}")]
    SerializationError(#[from] BincodeError),

    #[error("operation is not valid in state {0:?}")]
    InvalidState(HandshakeState),

    #[error("received {received:?} while in state {state:?}")]
    UnexpectedMessage {
        state: HandshakeState,
        received: MessageType,
    },

    #[error("received {0:?} after the handshake was closed")]
    SessionClosed(Option<MessageType>),

    #[error("no protocol version in common with the peer")]
    NoCommonVersion,

    #[error("no handshake cipher in common with the peer")]
    NoCommonCipher,

    #[error("no record protocol in common with the peer")]
    NoCommonRecordProtocol,

    #[error("peer selected protocol version {0:?} which was never offered")]
    UnofferedVersion(String),

    #[error("handshake cipher {0} is not offered or not supported")]
    UnsupportedCipher(u32),

    #[error("record protocol {0} is not offered or not supported")]
    UnsupportedRecordProtocol(u32),

    #[error("handshake authenticator did not verify")]
    BadAuthenticator,

    #[error("unsupported assertion type {0}")]
    UnsupportedAssertionType(AssertionDescription),

    #[error("assertion {0} rejected: {1}")]
    BadAssertion(AssertionDescription, String),

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("peer aborted the handshake ({code:?}): {message}")]
    PeerAborted { code: AbortCode, message: String },

    #[error("timed out waiting for the peer")]
    Timeout,

    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    #[error("invalid handshake configuration: {0}")]
    InvalidConfig(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandshakeError {
    /// The abort code a peer is told when this error ends the handshake.
    ///
    /// 当此错误终止握手时告知对端的中止代码。
    pub fn abort_code(&self) -> AbortCode {
        match self {
            HandshakeError::SerializationError(
                BincodeError::Enc(_) | BincodeError::Oversized(_),
            ) => AbortCode::InternalError,
            HandshakeError::SerializationError(_) => AbortCode::DeserializationFailed,
            HandshakeError::InvalidState(_) => AbortCode::InternalError,
            HandshakeError::UnexpectedMessage { .. } | HandshakeError::SessionClosed(_) => {
                AbortCode::BadMessage
            }
            HandshakeError::NoCommonVersion | HandshakeError::UnofferedVersion(_) => {
                AbortCode::BadProtocolVersion
            }
            HandshakeError::NoCommonCipher | HandshakeError::UnsupportedCipher(_) => {
                AbortCode::BadHandshakeCipher
            }
            HandshakeError::NoCommonRecordProtocol
            | HandshakeError::UnsupportedRecordProtocol(_) => AbortCode::BadRecordProtocol,
            HandshakeError::BadAuthenticator => AbortCode::BadAuthenticator,
            HandshakeError::UnsupportedAssertionType(_) => AbortCode::BadAssertionType,
            HandshakeError::BadAssertion(..) => AbortCode::BadAssertion,
            HandshakeError::Protocol(_) => AbortCode::ProtocolError,
            HandshakeError::PeerAborted { code, .. } => *code,
            HandshakeError::Timeout
            | HandshakeError::Transport(_)
            | HandshakeError::InvalidConfig(_)
            | HandshakeError::Internal(_) => AbortCode::InternalError,
        }
    }
}

pub type Result<T> = std::result::Result<T, HandshakeError>;
