//! Property-based serialization tests for the shared data model.
//!
//! Uses proptest to verify:
//! 1. Any `Action` survives a JSON round-trip (the undo log format).
//! 2. `Action::inverse` is an involution and preserves task identity.
//! 3. Any `ChannelMessage` survives the postcard channel codec.
//! 4. Random bytes never cause a panic in `decode` (returns `Err` gracefully).

use proptest::prelude::*;
use taskboard_proto::channel::ChannelMessage;
use taskboard_proto::codec;
use taskboard_proto::{
    Action, BroadcastEvent, EventFrame, OriginTag, Priority, ProjectId, Task, TaskConfiguration,
    TaskId,
};

// --- Strategies for data model types ---

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Unset),
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

fn arb_configuration() -> impl Strategy<Value = TaskConfiguration> {
    (arb_priority(), ".{0,64}").prop_map(|(priority, description)| TaskConfiguration {
        priority,
        description,
    })
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        "[a-z0-9-]{1,36}",
        "[a-z0-9-]{1,36}",
        ".{1,128}",
        arb_configuration(),
    )
        .prop_map(|(id, project, title, configuration)| Task {
            id: TaskId::from_string(id),
            project_id: ProjectId::from_string(project),
            title,
            configuration,
        })
}

/// Update actions keep the same identity on both sides.
fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        arb_task().prop_map(|task| Action::Create { task }),
        arb_task().prop_map(|task| Action::Delete { task }),
        (arb_task(), ".{1,128}", arb_configuration()).prop_map(|(before, title, config)| {
            let after = before.with_content(title, config);
            Action::Update { before, after }
        }),
    ]
}

fn arb_origin() -> impl Strategy<Value = Option<OriginTag>> {
    prop::option::of(
        ("[a-z0-9]{1,16}", "[a-f0-9-]{1,36}", any::<u64>()).prop_map(|(client_id, session, seq)| {
            OriginTag {
                client_id,
                session,
                seq,
            }
        }),
    )
}

fn arb_event() -> impl Strategy<Value = BroadcastEvent> {
    prop_oneof![
        arb_task().prop_map(BroadcastEvent::TaskCreate),
        arb_task().prop_map(BroadcastEvent::TaskUpdate),
        arb_task().prop_map(|t| BroadcastEvent::TaskDelete {
            id: t.id,
            project_id: t.project_id,
        }),
    ]
}

fn arb_frame() -> impl Strategy<Value = EventFrame> {
    (arb_origin(), arb_event()).prop_map(|(origin, event)| EventFrame { origin, event })
}

fn arb_channel_message() -> impl Strategy<Value = ChannelMessage> {
    let room = "[a-z0-9-]{1,36}";
    prop_oneof![
        room.prop_map(|room| ChannelMessage::Join { room }),
        room.prop_map(|room| ChannelMessage::Leave { room }),
        room.prop_map(|room| ChannelMessage::Joined { room }),
        room.prop_map(|room| ChannelMessage::Left { room }),
        (room, arb_frame()).prop_map(|(room, frame)| ChannelMessage::Publish { room, frame }),
        (room, arb_frame()).prop_map(|(room, frame)| ChannelMessage::Event { room, frame }),
        ".{0,64}".prop_map(|reason| ChannelMessage::Error { reason }),
    ]
}

// --- Property tests ---

proptest! {
    /// Any action survives a JSON round-trip.
    #[test]
    fn action_json_round_trip(action in arb_action()) {
        let json = serde_json::to_string(&action).expect("encode should succeed");
        let decoded: Action = serde_json::from_str(&json).expect("decode should succeed");
        prop_assert_eq!(action, decoded);
    }

    /// Inverting twice yields the original action.
    #[test]
    fn inverse_is_involution(action in arb_action()) {
        prop_assert_eq!(action.inverse().inverse(), action);
    }

    /// The inverse touches the same task in the same project.
    #[test]
    fn inverse_preserves_scope(action in arb_action()) {
        let inverse = action.inverse();
        prop_assert_eq!(inverse.task_id(), action.task_id());
        prop_assert_eq!(inverse.project_id(), action.project_id());
    }

    /// Any channel message survives the postcard codec.
    #[test]
    fn channel_message_round_trip(msg in arb_channel_message()) {
        let bytes = codec::encode(&msg).expect("encode should succeed");
        let decoded = codec::decode(&bytes).expect("decode should succeed");
        prop_assert_eq!(msg, decoded);
    }

    /// Random bytes never cause a panic when decoded.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = codec::decode(&bytes);
    }

    /// Random bytes never cause a panic when decoded as an undo log record.
    #[test]
    fn random_text_action_decode_no_panic(text in ".{0,256}") {
        let _ = serde_json::from_str::<Action>(&text);
    }
}
