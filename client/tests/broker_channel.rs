//! Broker channel scenarios: the test plays the scene-authority side over an
//! in-memory transport pair. Correlation is per-kind FIFO; there are no
//! request ids on this wire.

use serde_json::{json, Value};

use scenelink_client::broker::{BrokerChannel, BrokerEvent, FindQuery, ResponsePayload};
use scenelink_client::{BrokerError, MockTransport, SessionInfo, Transport};
use scenelink_shared::Rtid;

fn joinable_session() -> SessionInfo {
    SessionInfo {
        gateway_address: Some("10.0.0.1:7001".into()),
        broker_address: Some("10.0.0.1:7002".into()),
        session_key: Some("session-key".into()),
        client_name: "viewer".into(),
    }
}

fn encode(message: &Value) -> Vec<u8> {
    let body = serde_json::to_vec(message).unwrap();
    let mut framed = (body.len() as u32).to_le_bytes().to_vec();
    framed.extend_from_slice(&body);
    framed
}

fn decode_sent(far: &mut MockTransport) -> Vec<Value> {
    far.drain_sent()
        .into_iter()
        .map(|framed| serde_json::from_slice(&framed[4..]).unwrap())
        .collect()
}

fn joined_channel() -> (BrokerChannel, MockTransport) {
    let (near, mut far) = MockTransport::pair();
    let mut channel = BrokerChannel::connect(Box::new(near), &joinable_session()).unwrap();

    let sent = decode_sent(&mut far);
    assert_eq!(sent[0]["type"], "join");
    assert_eq!(sent[0]["sessionKey"], "session-key");

    far.send(&encode(&json!({ "type": "joinSucceeded" }))).unwrap();
    assert_eq!(channel.receive().unwrap(), vec![BrokerEvent::Joined]);
    assert!(channel.is_joined());
    (channel, far)
}

#[test]
fn connect_requires_a_joinable_session() {
    let (near, _far) = MockTransport::pair();
    let session = SessionInfo {
        session_key: None,
        ..joinable_session()
    };
    let result = BrokerChannel::connect(Box::new(near), &session);
    assert!(matches!(result, Err(BrokerError::NotJoinable)));
}

#[test]
fn requests_before_join_confirmation_are_rejected() {
    let (near, _far) = MockTransport::pair();
    let mut channel = BrokerChannel::connect(Box::new(near), &joinable_session()).unwrap();
    assert_eq!(
        channel.find_entities(FindQuery::default()),
        Err(BrokerError::ChannelClosed)
    );
}

#[test]
fn confirmations_complete_same_kind_requests_in_fifo_order() {
    let (mut channel, mut far) = joined_channel();

    let first = channel
        .find_entities(FindQuery {
            name: Some("camera".into()),
            ..FindQuery::default()
        })
        .unwrap();
    let second = channel
        .find_entities(FindQuery {
            name: Some("light".into()),
            ..FindQuery::default()
        })
        .unwrap();

    far.send(&encode(&json!({
        "type": "findConfirmed",
        "entities": [{ "rtid": 10, "id": "12345678-9abc-def0-1122-334455667788" }]
    })))
    .unwrap();
    far.send(&encode(&json!({
        "type": "findConfirmed",
        "entities": []
    })))
    .unwrap();

    let events = channel.receive().unwrap();
    assert_eq!(
        events,
        vec![
            BrokerEvent::ResponseReady { key: first },
            BrokerEvent::ResponseReady { key: second },
        ]
    );

    match channel.take_response(&first).unwrap().unwrap() {
        ResponsePayload::Found(entities) => {
            assert_eq!(entities.len(), 1);
            assert_eq!(entities[0].rtid, 10);
        }
        other => panic!("expected find payload, got {other:?}"),
    }
    match channel.take_response(&second).unwrap().unwrap() {
        ResponsePayload::Found(entities) => assert!(entities.is_empty()),
        other => panic!("expected find payload, got {other:?}"),
    }
}

#[test]
fn different_kinds_keep_independent_queues() {
    let (mut channel, mut far) = joined_channel();

    let find = channel.find_entities(FindQuery::default()).unwrap();
    let delete = channel.delete_entities(&[Rtid::new(5)]).unwrap();

    // answered out of request order; kinds do not interleave
    far.send(&encode(&json!({ "type": "deleteConfirmed", "rtids": [5] })))
        .unwrap();
    far.send(&encode(&json!({ "type": "findConfirmed", "entities": [] })))
        .unwrap();

    let events = channel.receive().unwrap();
    assert_eq!(
        events,
        vec![
            BrokerEvent::ResponseReady { key: delete },
            BrokerEvent::ResponseReady { key: find },
        ]
    );
    assert_eq!(
        channel.take_response(&delete).unwrap(),
        Ok(ResponsePayload::Deleted(vec![Rtid::new(5)]))
    );
}

#[test]
fn request_failed_answers_the_oldest_of_its_kind() {
    let (mut channel, mut far) = joined_channel();

    let key = channel
        .spawn_entity("camera_rig", Default::default())
        .unwrap();
    far.send(&encode(&json!({
        "type": "requestFailed",
        "request": "spawnEntity",
        "message": "scene is read-only"
    })))
    .unwrap();

    let events = channel.receive().unwrap();
    assert_eq!(events, vec![BrokerEvent::ResponseReady { key }]);
    assert_eq!(
        channel.take_response(&key).unwrap(),
        Err(BrokerError::Rejected {
            message: "scene is read-only".into()
        })
    );
    // a rejection is per-request; the channel stays usable
    assert!(channel.is_joined());
}

#[test]
fn confirmation_without_a_pending_request_is_fatal() {
    let (mut channel, mut far) = joined_channel();

    far.send(&encode(&json!({ "type": "updateConfirmed" }))).unwrap();
    assert!(matches!(
        channel.receive(),
        Err(BrokerError::UnexpectedConfirmation { .. })
    ));
}

#[test]
fn unhandled_message_type_closes_the_channel() {
    let (mut channel, mut far) = joined_channel();

    far.send(&encode(&json!({ "type": "somethingNewer", "data": 1 })))
        .unwrap();
    assert_eq!(
        channel.receive(),
        Err(BrokerError::UnhandledMessage {
            kind: "somethingNewer".into()
        })
    );
    assert_eq!(channel.receive(), Err(BrokerError::ChannelClosed));
}

#[test]
fn disconnect_fails_every_outstanding_request() {
    let (mut channel, _far) = joined_channel();

    let find = channel.find_entities(FindQuery::default()).unwrap();
    let children = channel.get_children(Rtid::new(3)).unwrap();

    channel.disconnect();
    assert_eq!(
        channel.take_response(&find),
        Some(Err(BrokerError::ChannelClosed))
    );
    assert_eq!(
        channel.take_response(&children),
        Some(Err(BrokerError::ChannelClosed))
    );
}

#[test]
fn pushes_surface_as_events() {
    let (mut channel, mut far) = joined_channel();

    far.send(&encode(&json!({
        "type": "sceneStats",
        "stats": { "entityCount": 12, "clientCount": 2 }
    })))
    .unwrap();
    far.send(&encode(&json!({
        "type": "clientJoined",
        "clientId": "0a0b0c0d-0e0f-1011-1213-141516171819"
    })))
    .unwrap();

    let events = channel.receive().unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], BrokerEvent::SceneStats { ref stats } if stats.entity_count == 12));
    assert!(matches!(events[1], BrokerEvent::ClientJoined { .. }));
}
