//! Tests for Connection
//!
//! These tests verify, against a loopback stub server:
//! - Connected signal and handshake per revision
//! - Action/response correlation
//! - Push delivery to observers
//! - Close semantics and errors after close

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, RecvTimeoutError, TryRecvError};
use radium::protocol::{EntryAdded, EntryExpired, ErrorCode, MessageType};
use radium::{
    Action, ConnectionMode, ConnectionState, Connection, DecodeError, ProtocolRevision,
    RadiumError, WatchMode,
};

use crate::common::{closed_port_config, read_n, read_to_eof, StubServer, WAIT};

// =============================================================================
// Connect / Handshake Tests
// =============================================================================

#[test]
fn test_connected_fires_once() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::connect(server.config(ProtocolRevision::V2)).unwrap();
    let signal = conn.connected();

    assert!(signal.wait_timeout(WAIT).unwrap().is_ok());
    assert!(signal.is_fired());
    assert_eq!(conn.state(), ConnectionState::Connected);

    // Waiting again observes the same single outcome
    assert!(conn.connected().wait().is_ok());

    conn.close().unwrap();
    assert!(server.join().is_empty());
}

#[test]
fn test_no_handshake_after_v1() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::open(server.config(ProtocolRevision::V3)).unwrap();

    conn.close().unwrap();
    assert!(server.join().is_empty());
}

#[test]
fn test_v1_handshake_and_ping() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 3);
        stream.write_all(&[0x00, 0x01]).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V1)).unwrap();

    let response = conn.request_timeout(Action::Ping, WAIT).unwrap();

    assert_eq!(response.value(), 1);
    assert_eq!(server.join(), vec![0x00, 0x00, 0x00]);
}

#[test]
fn test_v1_listen_handshake() {
    let server = StubServer::spawn(|mut stream| read_n(&mut stream, 1));
    let mut config = server.config(ProtocolRevision::V1);
    config.mode = ConnectionMode::Listen;

    let _conn = Connection::open(config).unwrap();

    assert_eq!(server.join(), vec![0x01]);
}

#[test]
fn test_connect_failure_rejects_signal() {
    let conn = Connection::connect(closed_port_config()).unwrap();

    match conn.connected().wait_timeout(WAIT) {
        Some(Err(RadiumError::Connect { addr, .. })) => {
            assert_eq!(addr, conn.config().addr());
        }
        other => panic!("Expected connect error, got {:?}", other),
    }
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(matches!(conn.send(Action::Ping), Err(RadiumError::ClosedConnection)));
}

#[test]
fn test_send_before_start_is_not_connected() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 1);
        stream.write_all(&[0x01]).unwrap();
        received
    });
    let conn = Connection::new(server.config(ProtocolRevision::V2)).unwrap();

    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(matches!(conn.send(Action::Ping), Err(RadiumError::NotConnected)));
    assert!(matches!(conn.action(Action::Ping), Err(RadiumError::NotConnected)));
    assert!(!conn.connected().is_fired());

    conn.start().unwrap();
    conn.connected().wait_timeout(WAIT).unwrap().unwrap();

    // The refused action released its slot and wrote nothing
    assert_eq!(conn.request_timeout(Action::Ping, WAIT).unwrap().value(), 1);
    assert_eq!(server.join(), vec![0x00]);
}

#[test]
fn test_start_twice_rejected() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::connect(server.config(ProtocolRevision::V2)).unwrap();

    assert!(matches!(conn.start(), Err(RadiumError::ProtocolMisuse(_))));

    conn.connected().wait_timeout(WAIT).unwrap().unwrap();
    conn.close().unwrap();
    server.join();
}

#[test]
fn test_close_before_start() {
    let conn = Connection::new(closed_port_config()).unwrap();
    let chunks = conn.subscribe();

    conn.close().unwrap();

    assert!(matches!(conn.start(), Err(RadiumError::ClosedConnection)));
    assert_eq!(chunks.try_recv(), Err(TryRecvError::Disconnected));
    assert_eq!(conn.subscribe().try_recv(), Err(TryRecvError::Disconnected));
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = closed_port_config();
    config.read_buffer_size = 0;

    assert!(matches!(Connection::connect(config), Err(RadiumError::Config(_))));
}

// =============================================================================
// Correlation Tests
// =============================================================================

#[test]
fn test_ping_resolves_with_echoed_byte() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 1);
        stream.write_all(&[0x01]).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    let response = conn.action(Action::Ping).unwrap().wait().unwrap();

    assert_eq!(response.value(), 1);
    assert_eq!(response.message_type().unwrap(), MessageType::Pong);
    assert_eq!(server.join(), vec![0x00]);
}

#[test]
fn test_v3_watch_mode_round_trip() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 2);
        stream.write_all(&[0x08]).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V3)).unwrap();

    let response = conn
        .request_timeout(Action::set_watch_mode(WatchMode::Watching), WAIT)
        .unwrap();

    assert_eq!(response.message_type().unwrap(), MessageType::Ok);
    assert_eq!(server.join(), vec![0x07, 0x01]);
}

#[test]
fn test_tagged_watch_mode_is_one_send() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 10);
        stream.write_all(&[0x08]).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    conn.request_timeout(Action::watch_tagged(42), WAIT).unwrap();

    assert_eq!(server.join(), vec![7, 2, 0, 0, 0, 0, 0, 0, 0, 42]);
}

#[test]
fn test_second_action_rejected_while_pending() {
    let (gate_tx, gate_rx) = channel::bounded::<()>(1);
    let server = StubServer::spawn(move |mut stream| {
        let mut received = read_n(&mut stream, 1);
        gate_rx.recv().unwrap();
        stream.write_all(&[0x01]).unwrap();
        received.extend(read_n(&mut stream, 1));
        stream.write_all(&[0x01]).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    let first = conn.action(Action::Ping).unwrap();
    assert!(matches!(
        conn.action(Action::Ping),
        Err(RadiumError::ProtocolMisuse(_))
    ));

    gate_tx.send(()).unwrap();
    assert_eq!(first.wait_timeout(WAIT).unwrap().value(), 1);

    // The rejected call never hit the wire, so the next one pairs correctly
    let second = conn.request_timeout(Action::Ping, WAIT).unwrap();
    assert_eq!(second.value(), 1);
    assert_eq!(server.join(), vec![0x00, 0x00]);
}

#[test]
fn test_short_v1_response_is_decode_error() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 3);
        stream.write_all(&[0x01]).unwrap();
        read_to_eof(&mut stream);
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V1)).unwrap();

    let result = conn.request_timeout(Action::Ping, WAIT);

    assert!(matches!(
        result,
        Err(RadiumError::Decode(DecodeError::BufferTooShort { expected: 2, actual: 1 }))
    ));
    conn.close().unwrap();
    server.join();
}

#[test]
fn test_unsupported_action_sends_nothing() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    assert!(matches!(
        conn.action(Action::Close),
        Err(RadiumError::Unsupported { .. })
    ));
    // The failed action released its slot
    conn.send(Action::Ping).unwrap();

    conn.close().unwrap();
    assert_eq!(server.join(), vec![0x00]);
}

#[test]
fn test_add_entry_returns_entry_added() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 11 + 4);
        let mut reply = vec![0x03];
        reply.extend_from_slice(&1_700_000_000i64.to_be_bytes());
        reply.extend_from_slice(&17u16.to_be_bytes());
        stream.write_all(&reply).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    let response = conn
        .request_timeout(Action::add_entry(1_700_000_000, &b"data"[..]), WAIT)
        .unwrap();

    assert_eq!(response.message_type().unwrap(), MessageType::EntryAdded);
    assert_eq!(
        response.entry_added().unwrap(),
        EntryAdded {
            timestamp: 1_700_000_000,
            id: 17
        }
    );

    let received = server.join();
    assert_eq!(received[0], 0x02);
    assert_eq!(&received[9..11], &[0x00, 0x04]);
    assert_eq!(&received[11..], b"data");
}

#[test]
fn test_remove_entry_refused_with_error() {
    let server = StubServer::spawn(|mut stream| {
        let received = read_n(&mut stream, 11);
        stream.write_all(&[0x09, 0x03]).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V3)).unwrap();

    let response = conn.request_timeout(Action::remove_entry(5, 2), WAIT).unwrap();

    assert_eq!(response.message_type().unwrap(), MessageType::Error);
    assert_eq!(
        response.error_message().unwrap().code,
        ErrorCode::ActionProcessingError
    );
    assert_eq!(server.join(), vec![0x04, 0, 0, 0, 0, 0, 0, 0, 5, 0, 2]);
}

// =============================================================================
// Observer Tests
// =============================================================================

#[test]
fn test_push_reaches_subscriber() {
    let (gate_tx, gate_rx) = channel::bounded::<()>(1);
    let push: Vec<u8> = {
        let mut bytes = vec![0x06];
        bytes.extend_from_slice(&1_600_000_000i64.to_be_bytes());
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(b"hi");
        bytes
    };
    let server_push = push.clone();
    let server = StubServer::spawn(move |mut stream| {
        let received = read_n(&mut stream, 2);
        stream.write_all(&[0x08]).unwrap();
        gate_rx.recv().unwrap();
        stream.write_all(&server_push).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();
    let chunks = conn.subscribe();

    let ack = conn
        .request_timeout(Action::set_watch_mode(WatchMode::All), WAIT)
        .unwrap();
    assert_eq!(ack.value(), 8);

    gate_tx.send(()).unwrap();
    assert_eq!(server.join(), vec![0x07, 0x01]);

    // Server hung up after pushing; drain until the subscription ends
    let mut stream = Vec::new();
    while let Ok(chunk) = chunks.recv_timeout(WAIT) {
        stream.extend_from_slice(&chunk);
    }

    assert_eq!(stream[0], 0x08);
    assert_eq!(&stream[1..], &push[..]);

    let entry = EntryExpired::parse(&stream[1..]).unwrap();
    assert_eq!(entry.id, 3);
    assert_eq!(&entry.data[..], b"hi");
}

#[test]
fn test_push_sharing_the_ack_chunk_is_kept() {
    let push: Vec<u8> = {
        let mut bytes = vec![0x06];
        bytes.extend_from_slice(&7i64.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(&0u64.to_be_bytes());
        bytes.extend_from_slice(&1u16.to_be_bytes());
        bytes.push(b'x');
        bytes
    };
    let server_push = push.clone();
    let server = StubServer::spawn(move |mut stream| {
        let received = read_n(&mut stream, 2);
        let mut reply = vec![0x08];
        reply.extend_from_slice(&server_push);
        stream.write_all(&reply).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();
    let chunks = conn.subscribe();

    let ack = conn
        .request_timeout(Action::set_watch_mode(WatchMode::All), WAIT)
        .unwrap();
    assert_eq!(ack.value(), 8);
    server.join();

    // Skip the ack chunk; what it carried past the ack is the response's
    // trailing bytes, and anything else arrives in later chunks.
    let first = chunks.recv_timeout(WAIT).unwrap();
    assert_eq!(&first[..], &ack.chunk()[..]);

    let mut pushed = ack.trailing().to_vec();
    while let Ok(chunk) = chunks.recv_timeout(WAIT) {
        pushed.extend_from_slice(&chunk);
    }

    assert_eq!(pushed, push);
    assert_eq!(EntryExpired::parse(&pushed).unwrap().id, 1);
}

#[test]
fn test_on_data_callback() {
    let (gate_tx, gate_rx) = channel::bounded::<()>(1);
    let server = StubServer::spawn(move |mut stream| {
        gate_rx.recv().unwrap();
        stream.write_all(&[1, 2, 3, 4]).unwrap();
        Vec::new()
    });
    let conn = Connection::open(server.config(ProtocolRevision::V3)).unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    conn.on_data(move |chunk| {
        counter.fetch_add(chunk.len(), Ordering::SeqCst);
    });
    let done = conn.subscribe();

    gate_tx.send(()).unwrap();
    server.join();

    // Subscription ends once the server's close is processed
    while done.recv_timeout(WAIT).is_ok() {}

    assert_eq!(seen.load(Ordering::SeqCst), 4);
}

// =============================================================================
// Close Tests
// =============================================================================

#[test]
fn test_send_after_close_fails() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    conn.close().unwrap();

    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(matches!(conn.send(Action::Ping), Err(RadiumError::ClosedConnection)));
    assert!(matches!(conn.action(Action::Ping), Err(RadiumError::ClosedConnection)));
    assert!(server.join().is_empty());
}

#[test]
fn test_close_is_idempotent() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    conn.close().unwrap();
    conn.close().unwrap();
    server.join();
}

#[test]
fn test_v1_close_sends_close_action() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::open(server.config(ProtocolRevision::V1)).unwrap();

    conn.close().unwrap();

    assert_eq!(server.join(), vec![0x00, 0x00, 0x02]);
}

#[test]
fn test_close_rejects_pending_response() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    let pending = conn.action(Action::Ping).unwrap();
    conn.close().unwrap();

    assert!(matches!(
        pending.wait_timeout(WAIT),
        Err(RadiumError::ConnectionClosed)
    ));
    assert_eq!(server.join(), vec![0x00]);
}

#[test]
fn test_remote_close_ends_connection() {
    let server = StubServer::spawn(|mut stream| read_n(&mut stream, 1));
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();
    let chunks = conn.subscribe();

    let pending = conn.action(Action::Ping).unwrap();
    server.join();

    assert!(matches!(
        pending.wait_timeout(WAIT),
        Err(RadiumError::ConnectionClosed)
    ));
    assert!(chunks.recv_timeout(WAIT).is_err());
    assert_eq!(conn.state(), ConnectionState::Closed);
    assert!(matches!(conn.send(Action::Ping), Err(RadiumError::ClosedConnection)));
}

#[test]
fn test_subscribe_after_connect_failure_is_disconnected() {
    let conn = Connection::connect(closed_port_config()).unwrap();
    let early = conn.subscribe();

    assert!(conn.connected().wait_timeout(WAIT).unwrap().is_err());

    assert_eq!(early.recv_timeout(WAIT), Err(RecvTimeoutError::Disconnected));
    assert_eq!(
        conn.subscribe().recv_timeout(Duration::from_millis(500)),
        Err(RecvTimeoutError::Disconnected)
    );
}

#[test]
fn test_subscribe_after_remote_close_is_disconnected() {
    let server = StubServer::spawn(|_stream| Vec::new());
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();
    let early = conn.subscribe();
    server.join();

    // Ends once the I/O thread has seen the hang-up
    assert_eq!(early.recv_timeout(WAIT), Err(RecvTimeoutError::Disconnected));

    assert_eq!(conn.state(), ConnectionState::Closed);
    assert_eq!(
        conn.subscribe().recv_timeout(Duration::from_millis(500)),
        Err(RecvTimeoutError::Disconnected)
    );
}

#[test]
fn test_subscribe_after_close_is_disconnected() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();
    let early = conn.subscribe();

    conn.close().unwrap();

    assert_eq!(early.try_recv(), Err(TryRecvError::Disconnected));
    assert_eq!(conn.subscribe().try_recv(), Err(TryRecvError::Disconnected));
    server.join();
}

#[test]
fn test_close_while_connecting_ends_subscriptions() {
    let server = StubServer::spawn(|mut stream| read_to_eof(&mut stream));
    let conn = Connection::connect(server.config(ProtocolRevision::V2)).unwrap();
    let chunks = conn.subscribe();

    conn.close().unwrap();

    // Whichever side wins, the signal fires and nothing stays subscribed
    let _ = conn.connected().wait_timeout(WAIT).unwrap();
    assert_eq!(chunks.recv_timeout(WAIT), Err(RecvTimeoutError::Disconnected));
    assert_eq!(
        conn.subscribe().recv_timeout(Duration::from_millis(500)),
        Err(RecvTimeoutError::Disconnected)
    );
    assert_eq!(conn.state(), ConnectionState::Closed);
    server.join();
}

#[test]
fn test_pending_timeout_can_be_retried() {
    let (gate_tx, gate_rx) = channel::bounded::<()>(1);
    let server = StubServer::spawn(move |mut stream| {
        let received = read_n(&mut stream, 1);
        gate_rx.recv().unwrap();
        stream.write_all(&[0x01]).unwrap();
        received
    });
    let conn = Connection::open(server.config(ProtocolRevision::V2)).unwrap();

    let pending = conn.action(Action::Ping).unwrap();
    assert!(matches!(
        pending.wait_timeout(Duration::from_millis(50)),
        Err(RadiumError::Timeout)
    ));

    gate_tx.send(()).unwrap();
    assert_eq!(pending.wait_timeout(WAIT).unwrap().value(), 1);
    server.join();
}
