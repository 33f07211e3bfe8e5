//! Integration tests for the complete handshake protocol.
//! 对完整握手协议的集成测试。

use ekep_handshake::error::{HandshakeError, Result};
use ekep_handshake::protocol::message::{
    AbortCode, FinishPayload, HandshakeCipher, HandshakeMessage, IdPayload, MessageType,
    RecordProtocol,
};
use ekep_handshake::protocol::state::HandshakeState;
use ekep_handshake::{EstablishedSession, HandshakeClient, HandshakeConfig, HandshakeServer};

fn client_with(config: HandshakeConfig) -> HandshakeClient {
    HandshakeClient::builder().config(config).build().unwrap()
}

fn server_with(config: HandshakeConfig) -> HandshakeServer {
    HandshakeServer::builder().config(config).build().unwrap()
}

fn single_message(mut messages: Vec<HandshakeMessage>) -> HandshakeMessage {
    assert_eq!(messages.len(), 1, "expected exactly one message, got {messages:?}");
    messages.remove(0)
}

fn abort_code(message: Option<HandshakeMessage>) -> AbortCode {
    match message {
        Some(HandshakeMessage::Abort(abort)) => abort.code,
        other => panic!("expected an Abort message, got {other:?}"),
    }
}

/// Runs both sides in lockstep, returning every message on the wire.
fn run(
    client: &mut HandshakeClient,
    server: &mut HandshakeServer,
) -> Result<Vec<HandshakeMessage>> {
    let mut wire = Vec::new();

    let client_precommit = client.start()?;
    wire.push(client_precommit.clone());
    let server_precommit = single_message(server.handle(client_precommit)?);
    wire.push(server_precommit.clone());
    let client_id = single_message(client.handle(server_precommit)?);
    wire.push(client_id.clone());
    let server_flight = server.handle(client_id)?;
    wire.extend(server_flight.iter().cloned());
    let mut client_out = Vec::new();
    for message in server_flight {
        client_out.extend(client.handle(message)?);
    }
    let client_finish = single_message(client_out);
    wire.push(client_finish.clone());
    assert!(server.handle(client_finish)?.is_empty());
    Ok(wire)
}

fn authenticators(wire: &[HandshakeMessage]) -> Vec<Vec<u8>> {
    wire.iter()
        .filter_map(|m| match m {
            HandshakeMessage::ServerFinish(f) | HandshakeMessage::ClientFinish(f) => {
                Some(f.handshake_authenticator.clone())
            }
            _ => None,
        })
        .collect()
}

#[test]
fn test_full_handshake() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let wire = run(&mut client, &mut server)?;
    let types: Vec<MessageType> = wire.iter().map(HandshakeMessage::message_type).collect();
    assert_eq!(
        types,
        vec![
            MessageType::ClientPrecommit,
            MessageType::ServerPrecommit,
            MessageType::ClientId,
            MessageType::ServerId,
            MessageType::ServerFinish,
            MessageType::ClientFinish,
        ]
    );
    assert_eq!(client.state(), HandshakeState::Complete);
    assert_eq!(server.state(), HandshakeState::Complete);

    let client_session = client.into_established()?;
    let server_session = server.into_established()?;
    for session in [&client_session, &server_session] {
        assert_eq!(session.version(), "v1");
        assert_eq!(session.cipher(), HandshakeCipher::CURVE25519_SHA256);
        assert_eq!(session.record_protocol(), RecordProtocol::SEAL_AES128_GCM);
    }
    assert_eq!(
        client_session.record_keys().send_key(),
        server_session.record_keys().receive_key()
    );
    assert_eq!(
        client_session.record_keys().receive_key(),
        server_session.record_keys().send_key()
    );
    assert_eq!(client_session.record_keys().send_key().len(), 16);
    Ok(())
}

#[test]
fn test_client_preference_order_decides() -> Result<()> {
    let mut client = client_with(HandshakeConfig {
        versions: vec!["v2".into(), "v1".into()],
        record_protocols: vec![RecordProtocol::SEAL_AES256_GCM, RecordProtocol::SEAL_AES128_GCM],
        ..HandshakeConfig::default()
    });
    let mut server = server_with(HandshakeConfig {
        versions: vec!["v1".into(), "v2".into()],
        record_protocols: vec![RecordProtocol::SEAL_AES128_GCM, RecordProtocol::SEAL_AES256_GCM],
        ..HandshakeConfig::default()
    });

    run(&mut client, &mut server)?;
    let session: EstablishedSession = client.into_established()?;
    assert_eq!(session.version(), "v2");
    assert_eq!(session.record_protocol(), RecordProtocol::SEAL_AES256_GCM);
    assert_eq!(session.record_keys().send_key().len(), 32);
    Ok(())
}

#[test]
fn test_unknown_cipher_aborts_before_key_exchange() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig {
        ciphers: vec![HandshakeCipher(99)],
        ..HandshakeConfig::default()
    });

    let precommit = client.start()?;
    let err = server.handle(precommit).unwrap_err();
    assert!(matches!(err, HandshakeError::NoCommonCipher));
    assert_eq!(server.state(), HandshakeState::Aborted);
    assert!(server.selection().is_none());

    let abort = server.take_abort().expect("server queues an abort");
    assert!(server.take_abort().is_none());

    let err = client.handle(abort).unwrap_err();
    match err {
        HandshakeError::PeerAborted { code, .. } => assert_eq!(code, AbortCode::BadHandshakeCipher),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(client.state(), HandshakeState::Aborted);
    // Receiving an abort never produces one in reply.
    assert!(client.take_abort().is_none());
    Ok(())
}

#[test]
fn test_version_mismatch_aborts() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig {
        versions: vec!["v2".into()],
        ..HandshakeConfig::default()
    });

    let err = server.handle(client.start()?).unwrap_err();
    assert_eq!(err.abort_code(), AbortCode::BadProtocolVersion);
    assert_eq!(abort_code(server.take_abort()), AbortCode::BadProtocolVersion);
    Ok(())
}

#[test]
fn test_tampered_server_finish_is_rejected() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let server_precommit = single_message(server.handle(client.start()?)?);
    let client_id = single_message(client.handle(server_precommit)?);
    let mut flight = server.handle(client_id)?;
    assert_eq!(flight.len(), 2);

    if let HandshakeMessage::ServerFinish(finish) = &mut flight[1] {
        finish.handshake_authenticator[0] ^= 0x01;
    } else {
        panic!("second message of the server flight must be ServerFinish");
    }

    assert!(client.handle(flight.remove(0))?.is_empty());
    let err = client.handle(flight.remove(0)).unwrap_err();
    assert!(matches!(err, HandshakeError::BadAuthenticator));
    assert_eq!(client.state(), HandshakeState::Aborted);
    assert_eq!(abort_code(client.take_abort()), AbortCode::BadAuthenticator);

    // No keys reach the record layer.
    assert!(matches!(
        client.into_established(),
        Err(HandshakeError::InvalidState(HandshakeState::Aborted))
    ));
    Ok(())
}

#[test]
fn test_tampered_client_finish_is_rejected() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let server_precommit = single_message(server.handle(client.start()?)?);
    let client_id = single_message(client.handle(server_precommit)?);
    let mut client_out = Vec::new();
    for message in server.handle(client_id)? {
        client_out.extend(client.handle(message)?);
    }
    let mut client_finish = single_message(client_out);
    if let HandshakeMessage::ClientFinish(finish) = &mut client_finish {
        finish.handshake_authenticator.pop();
    }

    let err = server.handle(client_finish).unwrap_err();
    assert!(matches!(err, HandshakeError::BadAuthenticator));
    assert_eq!(abort_code(server.take_abort()), AbortCode::BadAuthenticator);
    Ok(())
}

#[test]
fn test_finish_replayed_in_other_direction_is_rejected() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let server_precommit = single_message(server.handle(client.start()?)?);
    let client_id = single_message(client.handle(server_precommit)?);
    let flight = server.handle(client_id)?;
    let server_authenticator = match &flight[1] {
        HandshakeMessage::ServerFinish(f) => f.handshake_authenticator.clone(),
        other => panic!("unexpected {other:?}"),
    };
    for message in flight {
        client.handle(message)?;
    }

    // The server's own authenticator echoed back as a ClientFinish.
    let err = server
        .handle(HandshakeMessage::ClientFinish(FinishPayload {
            handshake_authenticator: server_authenticator,
        }))
        .unwrap_err();
    assert!(matches!(err, HandshakeError::BadAuthenticator));
    Ok(())
}

#[test]
fn test_messages_after_completion_are_rejected() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());
    let wire = run(&mut client, &mut server)?;

    let err = server.handle(wire[5].clone()).unwrap_err();
    assert!(matches!(err, HandshakeError::SessionClosed(Some(MessageType::ClientFinish))));
    assert_eq!(err.abort_code(), AbortCode::BadMessage);
    assert_eq!(server.state(), HandshakeState::Complete);
    assert!(server.take_abort().is_none());

    // Still complete: the late message had no side effects.
    let session = server.into_established()?;
    assert_eq!(session.version(), "v1");
    Ok(())
}

#[test]
fn test_messages_after_abort_are_rejected() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());
    let precommit = client.start()?;

    server.cancel(HandshakeError::Timeout);
    assert_eq!(server.state(), HandshakeState::Aborted);
    assert_eq!(abort_code(server.take_abort()), AbortCode::InternalError);

    let err = server.handle(precommit).unwrap_err();
    assert!(matches!(err, HandshakeError::SessionClosed(_)));
    assert_eq!(err.abort_code(), AbortCode::BadMessage);
    assert!(server.take_abort().is_none());

    let err = server.handle_bytes(&[0xff, 0x00]).unwrap_err();
    assert!(matches!(err, HandshakeError::SessionClosed(None)));
    assert!(server.take_abort().is_none());
    Ok(())
}

#[test]
fn test_out_of_order_message_aborts_with_bad_message() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());
    client.start()?;

    let err = server
        .handle(HandshakeMessage::ClientId(IdPayload {
            dh_public_key: vec![9; 32],
            assertions: Vec::new(),
        }))
        .unwrap_err();
    assert!(matches!(
        err,
        HandshakeError::UnexpectedMessage {
            state: HandshakeState::Start,
            received: MessageType::ClientId,
        }
    ));
    assert_eq!(abort_code(server.take_abort()), AbortCode::BadMessage);

    // A client never accepts a client message.
    let err = client
        .handle(HandshakeMessage::ClientFinish(FinishPayload {
            handshake_authenticator: vec![0; 32],
        }))
        .unwrap_err();
    assert_eq!(err.abort_code(), AbortCode::BadMessage);
    assert_eq!(client.state(), HandshakeState::Aborted);
    Ok(())
}

#[test]
fn test_malformed_bytes_abort_with_deserialization_failed() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let mut frame = client.start()?.to_bytes()?;
    frame.push(0);
    let err = server.handle_bytes(&frame).unwrap_err();
    assert_eq!(err.abort_code(), AbortCode::DeserializationFailed);
    assert_eq!(abort_code(server.take_abort()), AbortCode::DeserializationFailed);

    let mut server = server_with(HandshakeConfig::default());
    let err = server.handle_bytes(&[0x2a, 0x01, 0x02]).unwrap_err();
    assert_eq!(err.abort_code(), AbortCode::DeserializationFailed);
    Ok(())
}

#[test]
fn test_bytes_round_trip_through_the_sessions() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let mut to_server = vec![client.start()?.to_bytes()?];
    while client.state() != HandshakeState::Complete {
        let mut to_client = Vec::new();
        for frame in to_server.drain(..) {
            for message in server.handle_bytes(&frame)? {
                to_client.push(message.to_bytes()?);
            }
        }
        for frame in to_client {
            for message in client.handle_bytes(&frame)? {
                to_server.push(message.to_bytes()?);
            }
        }
    }
    for frame in to_server {
        server.handle_bytes(&frame)?;
    }
    assert_eq!(server.state(), HandshakeState::Complete);
    Ok(())
}

#[test]
fn test_low_order_public_key_is_a_protocol_error() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let server_precommit = single_message(server.handle(client.start()?)?);
    let mut client_id = single_message(client.handle(server_precommit)?);
    if let HandshakeMessage::ClientId(id) = &mut client_id {
        id.dh_public_key = vec![0; 32];
    }
    let err = server.handle(client_id).unwrap_err();
    assert_eq!(err.abort_code(), AbortCode::ProtocolError);
    assert_eq!(abort_code(server.take_abort()), AbortCode::ProtocolError);
    Ok(())
}

#[test]
fn test_short_challenge_is_a_protocol_error() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());

    let mut precommit = client.start()?;
    if let HandshakeMessage::ClientPrecommit(p) = &mut precommit {
        p.challenge.truncate(16);
    }
    let err = server.handle(precommit).unwrap_err();
    assert_eq!(err.abort_code(), AbortCode::ProtocolError);
    Ok(())
}

#[test]
fn test_sessions_are_independent() -> Result<()> {
    let mut first = (
        client_with(HandshakeConfig::default()),
        server_with(HandshakeConfig::default()),
    );
    let mut second = (
        client_with(HandshakeConfig::default()),
        server_with(HandshakeConfig::default()),
    );

    let first_wire = run(&mut first.0, &mut first.1)?;
    let second_wire = run(&mut second.0, &mut second.1)?;
    assert_ne!(authenticators(&first_wire), authenticators(&second_wire));

    let challenge = |wire: &[HandshakeMessage]| match &wire[0] {
        HandshakeMessage::ClientPrecommit(p) => p.challenge.clone(),
        other => panic!("unexpected {other:?}"),
    };
    assert_ne!(challenge(&first_wire), challenge(&second_wire));

    let a = first.0.into_established()?;
    let b = second.0.into_established()?;
    assert_ne!(a.record_keys().send_key(), b.record_keys().send_key());
    Ok(())
}

#[test]
fn test_start_twice_is_invalid() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    client.start()?;
    assert!(matches!(
        client.start(),
        Err(HandshakeError::InvalidState(HandshakeState::PrecommitSent))
    ));
    // Local misuse does not abort the session.
    assert_eq!(client.state(), HandshakeState::PrecommitSent);
    assert!(client.take_abort().is_none());
    Ok(())
}

#[test]
fn test_abort_with_unknown_code_is_honoured_without_reply() -> Result<()> {
    let mut server = server_with(HandshakeConfig::default());

    // Abort tag, code 11 (not defined here), empty detail.
    let err = server.handle_bytes(&[0x00, 0x0b, 0x00]).unwrap_err();
    match err {
        HandshakeError::PeerAborted { code, .. } => assert_eq!(code, AbortCode::UnknownErrorCode),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(server.state(), HandshakeState::Aborted);
    assert!(server.take_abort().is_none());
    Ok(())
}

#[test]
fn test_truncated_abort_is_never_answered() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    client.start()?;

    // Abort tag and code, but the detail string is missing.
    let err = client.handle_bytes(&[0x00, 0x04]).unwrap_err();
    assert!(matches!(err, HandshakeError::PeerAborted { .. }));
    assert_eq!(client.state(), HandshakeState::Aborted);
    assert!(client.take_abort().is_none());
    Ok(())
}

#[test]
fn test_config_too_large_for_one_frame_is_rejected() {
    let config = HandshakeConfig {
        versions: (0..20_000).map(|i| format!("version-{i}")).collect(),
        ..HandshakeConfig::default()
    };
    let result = HandshakeClient::builder().config(config).build();
    assert!(matches!(result, Err(HandshakeError::InvalidConfig(_))));
}

#[test]
fn test_oversized_message_fails_on_the_sender() {
    let message = HandshakeMessage::ClientFinish(FinishPayload {
        handshake_authenticator: vec![7; 70_000],
    });
    let err = message.to_bytes().unwrap_err();
    assert_eq!(err.abort_code(), AbortCode::InternalError);
}

#[test]
fn test_local_abort_reports_detail_to_peer() -> Result<()> {
    let mut client = client_with(HandshakeConfig::default());
    let mut server = server_with(HandshakeConfig::default());
    let server_precommit = single_message(server.handle(client.start()?)?);

    let err = client.abort("shutting down");
    assert_eq!(err.abort_code(), AbortCode::InternalError);
    assert_eq!(client.state(), HandshakeState::Aborted);
    let abort = match client.take_abort() {
        Some(HandshakeMessage::Abort(abort)) => abort,
        other => panic!("expected an Abort message, got {other:?}"),
    };
    assert_eq!(abort.code, AbortCode::InternalError);
    assert!(abort.message.contains("shutting down"));

    // The session is closed for anything that arrives later.
    let err = client.handle(server_precommit).unwrap_err();
    assert!(matches!(err, HandshakeError::SessionClosed(_)));

    let err = server.handle(HandshakeMessage::Abort(abort)).unwrap_err();
    assert!(matches!(err, HandshakeError::PeerAborted { code: AbortCode::InternalError, .. }));
    assert!(server.take_abort().is_none());
    Ok(())
}
