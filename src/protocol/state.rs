//! Defines the states of the handshake protocol state machine.
//!
//! Both roles walk the same set of states in mirror order. Each waiting state
//! admits exactly one inbound message type; `Complete` and `Aborted` admit none.
//!
//! 定义握手协议状态机的各个状态。
//!
//! 双方角色以镜像顺序经过同一组状态。每个等待状态只接受一种入站消息类型；
//! `Complete` 与 `Aborted` 不接受任何消息。

use crate::protocol::message::MessageType;

/// Which side of the handshake a session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl Role {
    pub fn peer(self) -> Role {
        match self {
            Role::Client => Role::Server,
            Role::Server => Role::Client,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Start,
    PrecommitSent,
    PrecommitReceived,
    IdSent,
    IdReceived,
    FinishSent,
    FinishReceived,
    Complete,
    Aborted,
}

impl HandshakeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeState::Complete | HandshakeState::Aborted)
    }

    /// The single message type `role` may receive while in this state.
    ///
    /// Transient states (the moment between receiving a message and answering
    /// it) and terminal states accept nothing.
    ///
    /// 在此状态下 `role` 唯一可以接收的消息类型。
    pub fn expected_message(self, role: Role) -> Option<MessageType> {
        match (role, self) {
            (Role::Client, HandshakeState::PrecommitSent) => Some(MessageType::ServerPrecommit),
            (Role::Client, HandshakeState::IdSent) => Some(MessageType::ServerId),
            (Role::Client, HandshakeState::IdReceived) => Some(MessageType::ServerFinish),
            (Role::Server, HandshakeState::Start) => Some(MessageType::ClientPrecommit),
            (Role::Server, HandshakeState::PrecommitSent) => Some(MessageType::ClientId),
            (Role::Server, HandshakeState::FinishSent) => Some(MessageType::ClientFinish),
            _ => None,
        }
    }
}
