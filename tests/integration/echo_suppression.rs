//! Integration tests for echo suppression and live convergence.
//!
//! Several clients share one loopback hub and one in-memory backend:
//! - each client skips exactly its own announced mutations
//! - peers apply them and converge on the persisted state
//! - events for other projects never touch the open board

use taskboard::channel::loopback::{LoopbackChannel, LoopbackHub};
use taskboard::history::memory::InMemoryUndoLogStore;
use taskboard::persistence::memory::InMemoryPersistence;
use taskboard::sync::{Applied, SyncCoordinator};
use taskboard_proto::{
    BroadcastEvent, EventFrame, OriginTag, Priority, Project, ProjectId, Task, TaskConfiguration,
};

type Board = SyncCoordinator<InMemoryPersistence, LoopbackChannel, InMemoryUndoLogStore>;

async fn open_client(
    backend: &InMemoryPersistence,
    hub: &LoopbackHub,
    project: &Project,
    client_id: &str,
) -> Board {
    let mut board = SyncCoordinator::new(
        backend.clone(),
        hub.connect(),
        InMemoryUndoLogStore::new(),
        client_id,
        100,
    )
    .await;
    board.open_project(&project.id).await.unwrap();
    board
}

fn shared() -> (InMemoryPersistence, LoopbackHub, Project) {
    let backend = InMemoryPersistence::new();
    let project = Project::new("Sprint");
    backend.seed_project(project.clone());
    (backend, LoopbackHub::new(64), project)
}

// =============================================================================
// Own mutations
// =============================================================================

#[tokio::test]
async fn own_mutations_come_back_as_echoes() {
    let (backend, hub, project) = shared();
    let mut alice = open_client(&backend, &hub, &project, "alice").await;

    let task = alice
        .create_task("Plan", TaskConfiguration::default())
        .await
        .unwrap();
    alice
        .update_task(&task.id, "Plan sprint", TaskConfiguration::default())
        .await
        .unwrap();
    alice.delete_task(&task.id).await.unwrap();
    assert_eq!(alice.echo().pending(), 3);

    for _ in 0..3 {
        assert_eq!(alice.next_event().await.unwrap(), Applied::Echo);
    }
    assert!(!alice.echo().is_armed());
    assert!(alice.tasks().is_empty());
    assert_eq!(alice.history().len(), 3);
}

#[tokio::test]
async fn same_client_id_in_two_sessions_is_not_confused() {
    let (backend, hub, project) = shared();
    let mut first = open_client(&backend, &hub, &project, "alice").await;
    let mut second = open_client(&backend, &hub, &project, "alice").await;

    first
        .create_task("From first", TaskConfiguration::default())
        .await
        .unwrap();

    assert_eq!(first.next_event().await.unwrap(), Applied::Echo);
    // Sequence numbers are tracked per session, so the second session has
    // nothing armed and applies the frame.
    assert_eq!(second.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(second.tasks().len(), 1);
}

#[tokio::test]
async fn same_client_id_with_mutations_in_flight_on_both_sides() {
    let (backend, hub, project) = shared();
    let mut first = open_client(&backend, &hub, &project, "laptop").await;
    let mut second = open_client(&backend, &hub, &project, "laptop").await;

    let a = first
        .create_task("From first", TaskConfiguration::default())
        .await
        .unwrap();
    let b = second
        .create_task("From second", TaskConfiguration::default())
        .await
        .unwrap();
    // Both sessions minted seq 1 under the same client id.
    assert_eq!(first.echo().pending(), 1);
    assert_eq!(second.echo().pending(), 1);

    assert_eq!(first.next_event().await.unwrap(), Applied::Echo);
    assert_eq!(first.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(second.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(second.next_event().await.unwrap(), Applied::Echo);

    for board in [&first, &second] {
        assert!(board.store().get(&a.id).is_some());
        assert!(board.store().get(&b.id).is_some());
        assert!(!board.echo().is_armed());
    }
    assert_eq!(backend.tasks_of(&project.id).len(), 2);
}

// =============================================================================
// Peers
// =============================================================================

#[tokio::test]
async fn three_clients_converge_on_backend_state() {
    let (backend, hub, project) = shared();
    let mut alice = open_client(&backend, &hub, &project, "alice").await;
    let mut bob = open_client(&backend, &hub, &project, "bob").await;
    let mut carol = open_client(&backend, &hub, &project, "carol").await;

    let a = alice
        .create_task("Design", TaskConfiguration::new(Priority::High, ""))
        .await
        .unwrap();
    let b = bob
        .create_task("Build", TaskConfiguration::default())
        .await
        .unwrap();
    // Carol learns about both tasks before editing one of them.
    assert_eq!(carol.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(carol.next_event().await.unwrap(), Applied::Foreign);
    carol
        .update_task(&a.id, "Design v2", TaskConfiguration::new(Priority::High, "mockups"))
        .await
        .unwrap();

    // Alice: echo of her create, bob's create, carol's update.
    assert_eq!(alice.next_event().await.unwrap(), Applied::Echo);
    assert_eq!(alice.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(alice.next_event().await.unwrap(), Applied::Foreign);
    // Bob: alice's create, echo of his own, carol's update.
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(bob.next_event().await.unwrap(), Applied::Echo);
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);
    // Carol: her own update.
    assert_eq!(carol.next_event().await.unwrap(), Applied::Echo);

    let mut expected = backend.tasks_of(&project.id);
    expected.sort_by(|x, y| x.id.cmp(&y.id));
    for board in [&alice, &bob, &carol] {
        let mut tasks = board.tasks().to_vec();
        tasks.sort_by(|x, y| x.id.cmp(&y.id));
        assert_eq!(tasks, expected);
    }
    assert!(expected.iter().any(|t| t.id == b.id));
    assert!(expected.iter().any(|t| t.id == a.id && t.title == "Design v2"));

    // Peers never record each other's actions.
    assert_eq!(alice.history().len(), 1);
    assert_eq!(bob.history().len(), 1);
    assert_eq!(carol.history().len(), 1);
}

#[tokio::test]
async fn peer_undo_is_applied_like_any_other_change() {
    let (backend, hub, project) = shared();
    let mut alice = open_client(&backend, &hub, &project, "alice").await;
    let mut bob = open_client(&backend, &hub, &project, "bob").await;

    let task = alice
        .create_task("Temporary", TaskConfiguration::default())
        .await
        .unwrap();
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);
    assert!(bob.store().get(&task.id).is_some());

    alice.undo().await.unwrap();
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);
    assert!(bob.store().get(&task.id).is_none());

    alice.redo().await.unwrap();
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(bob.store().get(&task.id), Some(&task));
}

// =============================================================================
// Rooms
// =============================================================================

#[tokio::test]
async fn events_for_other_projects_are_ignored() {
    let (backend, hub, project) = shared();
    let mut alice = open_client(&backend, &hub, &project, "alice").await;

    // A frame whose payload names a different project, delivered on the
    // open project's room.
    let stray = Task::new(
        ProjectId::from_string("elsewhere"),
        "Stray",
        TaskConfiguration::default(),
    );
    let frame = EventFrame::tagged(
        OriginTag {
            client_id: "mallory".into(),
            session: "mallory-1".into(),
            seq: 1,
        },
        BroadcastEvent::TaskCreate(stray),
    );
    hub.inject(project.id.room(), frame).await;

    assert_eq!(alice.next_event().await.unwrap(), Applied::Ignored);
    assert!(alice.tasks().is_empty());
}

#[tokio::test]
async fn switching_projects_moves_the_subscription() {
    let (backend, hub, sprint) = shared();
    let backlog = Project::new("Backlog");
    backend.seed_project(backlog.clone());

    let mut alice = open_client(&backend, &hub, &sprint, "alice").await;
    let mut bob = open_client(&backend, &hub, &sprint, "bob").await;
    assert_eq!(hub.member_count(sprint.id.room()), 2);

    bob.open_project(&backlog.id).await.unwrap();
    assert_eq!(hub.member_count(sprint.id.room()), 1);
    assert_eq!(hub.member_count(backlog.id.room()), 1);

    alice
        .create_task("Sprint only", TaskConfiguration::default())
        .await
        .unwrap();
    alice.open_project(&backlog.id).await.unwrap();
    alice
        .create_task("Backlog item", TaskConfiguration::default())
        .await
        .unwrap();

    // Bob only hears the backlog change.
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);
    assert_eq!(bob.tasks().len(), 1);
    assert_eq!(bob.tasks()[0].title, "Backlog item");
}
