//! Reconnect-path integration tests for the session layer.
//!
//! These tests play the driver by hand: transport events and broker frames
//! are fed straight into the coordinator and the emitted actions are
//! inspected. This covers both sides of the reconnect policy: wire
//! subscriptions are re-issued after a drop, while registry handles and
//! transport opens are never duplicated.

use carelink_client::{
    ChatId, ChatInfo, ConnectionStatus, Coordinator, CoordinatorAction, Destination, Envelope,
    Phase, SessionConfig, SocketAction, UnseenMap, UserId,
};

const SELF_ID: UserId = 40;

fn chat(chat_id: ChatId) -> ChatInfo {
    ChatInfo {
        chat_id,
        chat_name: format!("chat {chat_id}"),
        group: true,
        chat_icon: String::new(),
    }
}

fn coordinator() -> Coordinator {
    Coordinator::new(SELF_ID, SessionConfig::new("ws://broker.test/ws"))
}

fn push(chat_id: ChatId, sender_id: UserId) -> Envelope {
    Envelope::Message {
        destination: Destination::chat(chat_id),
        body: format!(r#"{{"chatID":{chat_id},"senderID":{sender_id},"content":"hello"}}"#),
    }
}

/// Destinations of all subscribe frames in an action batch.
fn subscribed(actions: &[CoordinatorAction]) -> Vec<Destination> {
    actions
        .iter()
        .filter_map(|a| match a {
            CoordinatorAction::Transport(SocketAction::SendFrame(Envelope::Subscribe {
                destination,
            })) => Some(destination.clone()),
            _ => None,
        })
        .collect()
}

/// Number of join announcements in an action batch.
fn join_announcements(actions: &[CoordinatorAction]) -> usize {
    actions
        .iter()
        .filter(|a| {
            matches!(
                a,
                CoordinatorAction::Transport(SocketAction::SendFrame(Envelope::Send {
                    destination,
                    ..
                })) if destination.is_join()
            )
        })
        .count()
}

fn open_transports(actions: &[CoordinatorAction]) -> usize {
    actions
        .iter()
        .filter(|a| matches!(a, CoordinatorAction::Transport(SocketAction::OpenTransport { .. })))
        .count()
}

#[test]
fn drop_and_reconnect_reissues_wire_subscriptions() {
    let mut coordinator = coordinator();
    coordinator.directory_loaded(vec![chat(1), chat(2)]);
    let first_up = coordinator.transport_up();
    assert_eq!(join_announcements(&first_up), 1);
    assert_eq!(subscribed(&first_up).len(), 2);

    // The broker socket drops; the driver retries internally.
    coordinator.transport_down();
    assert_eq!(coordinator.status(), ConnectionStatus::Connecting);
    assert_eq!(coordinator.phase(), Phase::Live);

    // Next handshake: join again, one subscribe per registered destination.
    let second_up = coordinator.transport_up();
    assert_eq!(join_announcements(&second_up), 1);
    let mut destinations = subscribed(&second_up);
    destinations.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    assert_eq!(destinations, vec![Destination::chat(1), Destination::chat(2)]);

    // No new transport was requested anywhere in the cycle.
    assert_eq!(open_transports(&second_up), 0);
}

#[test]
fn repeated_directory_loads_open_one_transport() {
    let mut coordinator = coordinator();

    let first = coordinator.directory_loaded(vec![chat(1)]);
    assert_eq!(open_transports(&first), 1);

    // Refetching the directory (even before the handshake) must not create
    // a second physical transport.
    let second = coordinator.directory_loaded(vec![chat(1), chat(2)]);
    assert_eq!(open_transports(&second), 0);

    // Both chats flush on the handshake, each exactly once.
    let up = coordinator.transport_up();
    assert_eq!(subscribed(&up).len(), 2);
}

#[test]
fn directory_refresh_after_reconnect_stays_deduplicated() {
    let mut coordinator = coordinator();
    coordinator.directory_loaded(vec![chat(1), chat(2)]);
    coordinator.transport_up();

    coordinator.transport_down();
    coordinator.transport_up();

    // A refresh right after the reconnect sees everything registered and
    // only subscribes the genuinely new chat.
    let actions = coordinator.directory_loaded(vec![chat(1), chat(2), chat(3)]);
    assert_eq!(subscribed(&actions), vec![Destination::chat(3)]);
}

#[test]
fn counting_continues_across_reconnect() {
    let mut coordinator = coordinator();
    coordinator.directory_loaded(vec![chat(5)]);
    coordinator.transport_up();
    coordinator.snapshot_loaded(UnseenMap::from([(5, 1)]));

    coordinator.frame_received(push(5, 99));
    assert_eq!(coordinator.unseen_count(5), 2);

    coordinator.transport_down();
    coordinator.transport_up();

    // Messages delivered on the new socket keep counting on the same store.
    coordinator.frame_received(push(5, 99));
    assert_eq!(coordinator.unseen_count(5), 3);
    assert_eq!(coordinator.unseen_total(), 3);
}

#[test]
fn mark_seen_survives_snapshot_race() {
    let mut coordinator = coordinator();
    coordinator.directory_loaded(vec![chat(5)]);
    coordinator.transport_up();
    coordinator.snapshot_loaded(UnseenMap::from([(5, 4)]));

    let actions = coordinator.mark_seen(5);
    assert_eq!(actions, vec![CoordinatorAction::PushSeen { chat_id: 5 }]);
    assert_eq!(coordinator.unseen_count(5), 0);

    // A message arrives between the optimistic zero and the server ack...
    coordinator.frame_received(push(5, 99));
    assert_eq!(coordinator.unseen_count(5), 1);

    // ...and the authoritative snapshot from the ack reconciles.
    coordinator.snapshot_loaded(UnseenMap::from([(5, 1)]));
    assert_eq!(coordinator.unseen_count(5), 1);
    assert_eq!(coordinator.unseen_total(), 1);
}

#[test]
fn dispose_then_fresh_session() {
    let mut coordinator = coordinator();
    coordinator.directory_loaded(vec![chat(1)]);
    coordinator.transport_up();
    coordinator.frame_received(push(1, 99));

    let actions = coordinator.dispose();
    assert!(actions.contains(&CoordinatorAction::Transport(SocketAction::CloseTransport)));
    assert_eq!(coordinator.phase(), Phase::Idle);
    assert_eq!(coordinator.status(), ConnectionStatus::Disconnected);

    // A handshake racing the teardown is ignored.
    assert!(coordinator.transport_up().is_empty());

    // A new login provisions from scratch.
    let restart = coordinator.directory_loaded(vec![chat(1)]);
    assert_eq!(open_transports(&restart), 1);
}
