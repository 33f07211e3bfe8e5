//! Drives a handshake session over an injected blocking transport.
//!
//! The transport only moves whole message frames; framing, connection setup
//! and timeouts belong to it. A transport timeout is reported as
//! `io::ErrorKind::TimedOut` (or `WouldBlock`) and cancels the session.
//!
//! 通过注入的阻塞式传输驱动握手会话。
//!
//! 传输层只负责移动完整的消息帧；分帧、连接建立与超时均由其负责。

use super::{EstablishedSession, HandshakeClient, HandshakeEndpoint, HandshakeServer};
use crate::error::{HandshakeError, Result};
use crate::protocol::message::HandshakeMessage;
use crate::protocol::state::HandshakeState;
use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;
use tracing::debug;

/// A blocking, message-oriented transport.
pub trait Transport {
    /// Sends one encoded handshake message.
    fn send(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Blocks until the next encoded handshake message arrives.
    fn receive(&mut self) -> io::Result<Vec<u8>>;
}

/// Runs the client side to completion.
///
/// 运行客户端直至握手完成。
pub fn run_client<T: Transport>(
    mut client: HandshakeClient,
    transport: &mut T,
) -> Result<EstablishedSession> {
    let precommit = match client.start() {
        Ok(precommit) => precommit,
        Err(err) => {
            send_abort(&mut client, transport);
            return Err(err);
        }
    };
    if let Err(err) = send(transport, &precommit) {
        return Err(abort(&mut client, transport, err));
    }
    drive(client, transport)
}

/// Runs the server side to completion.
///
/// 运行服务器端直至握手完成。
pub fn run_server<T: Transport>(
    server: HandshakeServer,
    transport: &mut T,
) -> Result<EstablishedSession> {
    drive(server, transport)
}

fn drive<E: HandshakeEndpoint, T: Transport>(
    mut endpoint: E,
    transport: &mut T,
) -> Result<EstablishedSession> {
    while endpoint.state() != HandshakeState::Complete {
        let frame = match transport.receive() {
            Ok(frame) => frame,
            Err(err) => {
                let reason = match err.kind() {
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => HandshakeError::Timeout,
                    _ => HandshakeError::Transport(err),
                };
                return Err(abort(&mut endpoint, transport, reason));
            }
        };

        let outbound = match endpoint.handle_bytes(&frame) {
            Ok(outbound) => outbound,
            Err(err) => {
                send_abort(&mut endpoint, transport);
                return Err(err);
            }
        };
        for message in &outbound {
            if let Err(err) = send(transport, message) {
                return Err(abort(&mut endpoint, transport, err));
            }
        }
    }
    endpoint.into_established()
}

fn send<T: Transport>(transport: &mut T, message: &HandshakeMessage) -> Result<()> {
    let frame = message.to_bytes()?;
    transport.send(&frame)?;
    debug!(sent = ?message.message_type(), len = frame.len(), "frame written");
    Ok(())
}

/// Sends the queued `Abort`, if any. The handshake is already lost, so a
/// failure here is only logged.
fn send_abort<E: HandshakeEndpoint, T: Transport>(endpoint: &mut E, transport: &mut T) {
    if let Some(abort) = endpoint.take_abort() {
        if let Err(err) = send(transport, &abort) {
            debug!(error = %err, "could not deliver abort to peer");
        }
    }
}

fn abort<E: HandshakeEndpoint, T: Transport>(
    endpoint: &mut E,
    transport: &mut T,
    reason: HandshakeError,
) -> HandshakeError {
    let err = endpoint.cancel(reason);
    send_abort(endpoint, transport);
    err
}

/// One end of an in-process duplex channel, mostly useful in tests.
///
/// 进程内双工通道的一端，主要用于测试。
#[derive(Debug)]
pub struct MemoryTransport {
    outgoing: Sender<Vec<u8>>,
    incoming: Receiver<Vec<u8>>,
    timeout: Option<Duration>,
}

impl MemoryTransport {
    /// Creates a connected pair of transports.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            Self {
                outgoing: a_tx,
                incoming: a_rx,
                timeout: None,
            },
            Self {
                outgoing: b_tx,
                incoming: b_rx,
                timeout: None,
            },
        )
    }

    /// Bounds how long `receive` waits for the peer.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, frame: &[u8]) -> io::Result<()> {
        self.outgoing
            .send(frame.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "peer transport dropped"))
    }

    fn receive(&mut self) -> io::Result<Vec<u8>> {
        let disconnected =
            || io::Error::new(io::ErrorKind::UnexpectedEof, "peer transport dropped");
        match self.timeout {
            Some(timeout) => self.incoming.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => {
                    io::Error::new(io::ErrorKind::TimedOut, "no message from peer")
                }
                RecvTimeoutError::Disconnected => disconnected(),
            }),
            None => self.incoming.recv().map_err(|_| disconnected()),
        }
    }
}
