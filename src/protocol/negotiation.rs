//! Picks the protocol version, handshake cipher and record protocol from the
//! two peers' ordered preference lists.
//!
//! The client proposes and the server picks: the selected value is the first
//! entry of the client's list that also appears anywhere in the server's list.
//!
//! 从双方有序的偏好列表中选出协议版本、握手密码与记录协议。
//!
//! 客户端提议、服务器选择：选中值是客户端列表中第一个同时出现在服务器列表中的条目。

use crate::error::{HandshakeError, Result};
use crate::protocol::message::{HandshakeCipher, RecordProtocol};

/// One peer's ordered preference lists, earlier entries preferred.
#[derive(Debug, Clone, Copy)]
pub struct Preferences<'a> {
    pub versions: &'a [String],
    pub ciphers: &'a [HandshakeCipher],
    pub record_protocols: &'a [RecordProtocol],
}

/// The values agreed for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub version: String,
    pub cipher: HandshakeCipher,
    pub record_protocol: RecordProtocol,
}

/// Returns the first entry of `client` that is also present in `server`.
pub fn select<T: PartialEq + Clone>(client: &[T], server: &[T]) -> Option<T> {
    client
        .iter()
        .find(|candidate| server.contains(candidate))
        .cloned()
}

/// Negotiates every category, failing on the first one without a common entry.
///
/// Categories are checked in the order version, cipher, record protocol.
///
/// 协商所有类别，遇到第一个没有共同条目的类别即失败。
pub fn negotiate(client: &Preferences<'_>, server: &Preferences<'_>) -> Result<Selection> {
    let version = select(client.versions, server.versions).ok_or(HandshakeError::NoCommonVersion)?;
    let cipher = select(client.ciphers, server.ciphers).ok_or(HandshakeError::NoCommonCipher)?;
    let record_protocol = select(client.record_protocols, server.record_protocols)
        .ok_or(HandshakeError::NoCommonRecordProtocol)?;
    Ok(Selection {
        version,
        cipher,
        record_protocol,
    })
}

/// Client-side check that the server's selection was drawn from the client's own lists.
///
/// 客户端检查服务器的选择确实来自客户端自己的列表。
pub fn check_selection(client: &Preferences<'_>, selection: &Selection) -> Result<()> {
    if !client.versions.contains(&selection.version) {
        return Err(HandshakeError::UnofferedVersion(selection.version.clone()));
    }
    if !client.ciphers.contains(&selection.cipher) {
        return Err(HandshakeError::UnsupportedCipher(selection.cipher.0));
    }
    if !client.record_protocols.contains(&selection.record_protocol) {
        return Err(HandshakeError::UnsupportedRecordProtocol(
            selection.record_protocol.0,
        ));
    }
    Ok(())
}
