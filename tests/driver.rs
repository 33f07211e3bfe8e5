//! Sessions driven end to end over an in-process transport.
//! 通过进程内传输端到端驱动的会话。

use ekep_handshake::error::{HandshakeError, Result};
use ekep_handshake::handshake::driver::{MemoryTransport, Transport, run_client, run_server};
use ekep_handshake::protocol::message::{AbortCode, HandshakeCipher, HandshakeMessage};
use ekep_handshake::{HandshakeClient, HandshakeConfig, HandshakeServer};
use std::thread;
use std::time::Duration;

#[test]
fn test_threaded_handshake() -> Result<()> {
    let (mut client_end, mut server_end) = MemoryTransport::pair();
    let client = HandshakeClient::builder().config(HandshakeConfig::default()).build()?;
    let server = HandshakeServer::builder().config(HandshakeConfig::default()).build()?;

    let server_thread = thread::spawn(move || run_server(server, &mut server_end));
    let client_session = run_client(client, &mut client_end)?;
    let server_session = server_thread.join().expect("server thread panicked")?;

    assert_eq!(
        client_session.record_keys().send_key(),
        server_session.record_keys().receive_key()
    );
    assert_eq!(
        client_session.record_keys().receive_key(),
        server_session.record_keys().send_key()
    );
    Ok(())
}

#[test]
fn test_selected_unknown_cipher_aborts_both_sides() -> Result<()> {
    // Both peers list cipher 99, so it is negotiated but cannot be run.
    let config = || HandshakeConfig {
        ciphers: vec![HandshakeCipher(99)],
        ..HandshakeConfig::default()
    };
    let (mut client_end, mut server_end) = MemoryTransport::pair();
    let client = HandshakeClient::builder().config(config()).build()?;
    let server = HandshakeServer::builder().config(config()).build()?;

    let server_thread = thread::spawn(move || run_server(server, &mut server_end));
    let client_err = run_client(client, &mut client_end).unwrap_err();
    let server_err = server_thread.join().expect("server thread panicked").unwrap_err();

    assert!(matches!(server_err, HandshakeError::UnsupportedCipher(99)));
    assert_eq!(server_err.abort_code(), AbortCode::BadHandshakeCipher);
    match client_err {
        HandshakeError::PeerAborted { code, .. } => assert_eq!(code, AbortCode::BadHandshakeCipher),
        other => panic!("unexpected error {other:?}"),
    }
    Ok(())
}

#[test]
fn test_silent_peer_times_out() -> Result<()> {
    let (client_end, mut server_end) = MemoryTransport::pair();
    let mut client_end = client_end.with_timeout(Duration::from_millis(50));
    let client = HandshakeClient::builder().config(HandshakeConfig::default()).build()?;

    let err = run_client(client, &mut client_end).unwrap_err();
    assert!(matches!(err, HandshakeError::Timeout));
    assert_eq!(err.abort_code(), AbortCode::InternalError);

    // The peer sees the precommit, then the abort.
    let precommit = HandshakeMessage::from_bytes(&server_end.receive()?)?;
    assert!(matches!(precommit, HandshakeMessage::ClientPrecommit(_)));
    match HandshakeMessage::from_bytes(&server_end.receive()?)? {
        HandshakeMessage::Abort(abort) => assert_eq!(abort.code, AbortCode::InternalError),
        other => panic!("unexpected {other:?}"),
    }
    Ok(())
}

#[test]
fn test_dropped_peer_is_a_transport_error() -> Result<()> {
    let (mut client_end, server_end) = MemoryTransport::pair();
    drop(server_end);
    let client = HandshakeClient::builder().config(HandshakeConfig::default()).build()?;

    let err = run_client(client, &mut client_end).unwrap_err();
    assert!(matches!(err, HandshakeError::Transport(_)));
    Ok(())
}

#[test]
fn test_unknown_abort_code_from_peer_gets_no_reply() -> Result<()> {
    let (client_end, server_end) = MemoryTransport::pair();
    let mut client_end = client_end.with_timeout(Duration::from_millis(50));
    let mut server_end = server_end.with_timeout(Duration::from_millis(50));
    let server = HandshakeServer::builder().config(HandshakeConfig::default()).build()?;

    // Abort tag, code 11 (not defined here), empty detail.
    client_end.send(&[0x00, 0x0b, 0x00])?;
    let err = run_server(server, &mut server_end).unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::PeerAborted {
            code: AbortCode::UnknownErrorCode,
            ..
        }
    ));

    // Nothing was written back.
    let err = client_end.receive().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    Ok(())
}
