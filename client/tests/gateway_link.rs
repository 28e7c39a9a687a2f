//! Gateway link scenarios against an in-memory transport pair: the test
//! plays the gateway side of the connection.

use std::time::Duration;

use scenelink_client::{
    GatewayEvent, GatewayLink, LinkConfig, LinkError, MockTransport, Transport,
};
use scenelink_shared::{
    AuthenticationStatus, ByteWriter, Channel, FrameHeader, ProtocolError, Uuid,
};

const CLIENT_ID: &str = "0a0b0c0d-0e0f-1011-1213-141516171819";

fn auth_response(status: AuthenticationStatus, client_id: &Uuid) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    writer.write_u16(status.wire_code());
    client_id.ser(&mut writer);
    writer.into_bytes()
}

fn frame(channel: Channel, payload: &[u8]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    FrameHeader::new(channel, payload.len()).ser(&mut writer);
    writer.write_bytes(payload);
    writer.into_bytes()
}

fn connected_link() -> (GatewayLink, MockTransport, Uuid) {
    let (near, mut far) = MockTransport::pair();
    let mut link =
        GatewayLink::connect(Box::new(near), "session-key", "viewer", LinkConfig::default())
            .unwrap();
    // the authentication request goes out at connect time
    let request = far.receive().unwrap().unwrap();
    assert_eq!(request[0], Channel::Registration.wire_id());

    let client_id: Uuid = CLIENT_ID.parse().unwrap();
    far.send(&auth_response(AuthenticationStatus::Success, &client_id))
        .unwrap();
    let events = link.receive().unwrap();
    assert_eq!(events, vec![GatewayEvent::Connected { client_id }]);
    assert!(link.is_connected());
    (link, far, client_id)
}

#[test]
fn handshake_carries_the_session_key() {
    let (near, mut far) = MockTransport::pair();
    let _link =
        GatewayLink::connect(Box::new(near), "secret-key", "viewer", LinkConfig::default())
            .unwrap();
    let request = far.receive().unwrap().unwrap();
    assert_eq!(request[0], Channel::Registration.wire_id());
    let body = &request[4..];
    // [version][key_len:u16][key][name_len:u16][name]
    assert_eq!(body[0], 1);
    let key_len = u16::from_le_bytes([body[1], body[2]]) as usize;
    assert_eq!(&body[3..3 + key_len], b"secret-key");
}

#[test]
fn handshake_completes_and_reports_client_id() {
    let (link, _far, client_id) = connected_link();
    assert_eq!(link.client_id(), Some(client_id));
}

#[test]
fn authentication_failure_is_terminal() {
    let (near, mut far) = MockTransport::pair();
    let mut link =
        GatewayLink::connect(Box::new(near), "session-key", "viewer", LinkConfig::default())
            .unwrap();
    far.receive().unwrap().unwrap();
    far.send(&auth_response(
        AuthenticationStatus::SessionNotFound,
        &Uuid::NIL,
    ))
    .unwrap();

    assert_eq!(
        link.receive(),
        Err(LinkError::AuthenticationFailed {
            status: AuthenticationStatus::SessionNotFound
        })
    );
    assert_eq!(link.receive(), Err(LinkError::Closed));
}

#[test]
fn frames_reassemble_across_chunk_boundaries() {
    let (mut link, mut far, _) = connected_link();

    let payload = vec![0xAB; 300];
    let bytes = frame(Channel::ViewerControl, &payload);
    // deliver in two arbitrary pieces; framing is byte-stream based
    far.send(&bytes[..7]).unwrap();
    assert_eq!(link.receive().unwrap(), vec![]);
    far.send(&bytes[7..]).unwrap();

    let events = link.receive().unwrap();
    assert_eq!(events, vec![GatewayEvent::ViewerControl { payload }]);
}

#[test]
fn two_frames_in_one_chunk_arrive_in_order() {
    let (mut link, mut far, _) = connected_link();

    let mut bytes = frame(Channel::Inputs, &[1]);
    bytes.extend_from_slice(&frame(Channel::ViewerControl, &[2, 3]));
    far.send(&bytes).unwrap();

    let events = link.receive().unwrap();
    assert_eq!(
        events,
        vec![
            GatewayEvent::InputAck { payload: vec![1] },
            GatewayEvent::ViewerControl {
                payload: vec![2, 3]
            },
        ]
    );
}

#[test]
fn unknown_channel_id_is_fatal() {
    let (mut link, mut far, _) = connected_link();

    far.send(&[99, 0, 0, 0]).unwrap();
    assert_eq!(
        link.receive(),
        Err(LinkError::Protocol(ProtocolError::UnknownChannel { id: 99 }))
    );
    assert_eq!(link.receive(), Err(LinkError::Closed));
}

#[test]
fn deprecated_and_reserved_channels_are_skipped() {
    let (mut link, mut far, _) = connected_link();

    let mut bytes = frame(Channel::Deprecated7, &[0xFF; 8]);
    bytes.extend_from_slice(&frame(Channel::AudioStream, &[0xEE; 4]));
    bytes.extend_from_slice(&frame(Channel::ViewerControl, &[5]));
    far.send(&bytes).unwrap();

    let events = link.receive().unwrap();
    assert_eq!(events, vec![GatewayEvent::ViewerControl { payload: vec![5] }]);
}

#[test]
fn remote_operation_round_trip() {
    let (mut link, mut far, client_id) = connected_link();

    link.send_remote_operation(7, &[0xCA, 0xFE]).unwrap();
    let sent = far.receive().unwrap().unwrap();
    assert_eq!(sent[0], Channel::ClientRemoteOperations.wire_id());
    // the gateway echoes the operation back with its response payload
    far.send(&sent).unwrap();

    let events = link.receive().unwrap();
    assert_eq!(
        events,
        vec![GatewayEvent::RemoteOperation {
            origin: client_id,
            request_id: 7,
            payload: vec![0xCA, 0xFE],
        }]
    );
}

#[test]
fn heartbeat_ack_measures_latency() {
    let (near, mut far) = MockTransport::pair();
    let config = LinkConfig {
        heartbeat_interval: Duration::ZERO,
        heartbeat_ack_timeout: Duration::from_secs(3600),
        ..LinkConfig::default()
    };
    let mut link = GatewayLink::connect(Box::new(near), "session-key", "viewer", config).unwrap();
    far.receive().unwrap().unwrap();
    far.send(&auth_response(
        AuthenticationStatus::Success,
        &CLIENT_ID.parse().unwrap(),
    ))
    .unwrap();

    // the pump sends the first beat right after authenticating
    link.receive().unwrap();
    let beat = far.receive().unwrap().unwrap();
    assert_eq!(beat[0], Channel::Heartbeat.wire_id());

    far.send(&frame(Channel::Heartbeat, &[])).unwrap();
    let events = link.receive().unwrap();
    assert!(matches!(
        events.as_slice(),
        [GatewayEvent::HeartbeatLatency { .. }]
    ));
    assert!(link.latency().is_some());
}

#[test]
fn exhausted_missed_ack_budget_kills_the_link() {
    let (near, mut far) = MockTransport::pair();
    let config = LinkConfig {
        heartbeat_interval: Duration::ZERO,
        heartbeat_ack_timeout: Duration::ZERO,
        missed_ack_budget: 1,
        ..LinkConfig::default()
    };
    let mut link = GatewayLink::connect(Box::new(near), "session-key", "viewer", config).unwrap();
    far.receive().unwrap().unwrap();
    far.send(&auth_response(
        AuthenticationStatus::Success,
        &CLIENT_ID.parse().unwrap(),
    ))
    .unwrap();

    // first pump sends the beat; the second finds it unanswered past the
    // (zero) ack timeout and the budget of one is spent
    link.receive().unwrap();
    assert_eq!(
        link.receive(),
        Err(LinkError::HeartbeatTimeout { missed: 1 })
    );
}
