//! Integration tests for per-project undo and redo.
//!
//! Drives [`SyncCoordinator`] through its public API against the in-memory
//! backend and the loopback hub:
//! - inverse actions restore the board both locally and in persistence
//! - History is bounded and survives a restart through the file store
//! - failures leave both stacks and the board untouched

use taskboard::channel::loopback::{LoopbackChannel, LoopbackHub};
use taskboard::history::UndoLogStore;
use taskboard::history::file::FileUndoLogStore;
use taskboard::history::memory::InMemoryUndoLogStore;
use taskboard::persistence::memory::InMemoryPersistence;
use taskboard::sync::{Applied, BoardError, SyncCoordinator};
use taskboard_proto::{Action, Priority, Project, TaskConfiguration};

/// Backend seeded with a single project.
fn seeded_backend() -> (InMemoryPersistence, Project) {
    let backend = InMemoryPersistence::new();
    let project = Project::new("Release");
    backend.seed_project(project.clone());
    (backend, project)
}

async fn open_client<L: UndoLogStore>(
    backend: &InMemoryPersistence,
    hub: &LoopbackHub,
    project: &Project,
    client_id: &str,
    undo_store: L,
) -> SyncCoordinator<InMemoryPersistence, LoopbackChannel, L> {
    let mut board =
        SyncCoordinator::new(backend.clone(), hub.connect(), undo_store, client_id, 100).await;
    board.open_project(&project.id).await.unwrap();
    board
}

// =============================================================================
// Inverse actions
// =============================================================================

#[tokio::test]
async fn undo_walks_back_create_update_delete() {
    let (backend, project) = seeded_backend();
    let hub = LoopbackHub::new(64);
    let mut alice = open_client(&backend, &hub, &project, "alice", InMemoryUndoLogStore::new()).await;

    let task = alice
        .create_task("Write notes", TaskConfiguration::new(Priority::Medium, "draft"))
        .await
        .unwrap();
    let edited = alice
        .update_task(&task.id, "Write release notes", TaskConfiguration::new(Priority::High, "draft"))
        .await
        .unwrap();
    alice.delete_task(&task.id).await.unwrap();
    assert!(backend.tasks_of(&project.id).is_empty());

    // Undo delete: the edited task comes back with its id.
    let undone = alice.undo().await.unwrap();
    assert!(matches!(undone, Action::Delete { .. }));
    assert_eq!(backend.tasks_of(&project.id), vec![edited.clone()]);

    // Undo update: the original content is restored.
    alice.undo().await.unwrap();
    assert_eq!(backend.tasks_of(&project.id), vec![task.clone()]);
    assert_eq!(alice.tasks(), std::slice::from_ref(&task));

    // Undo create: the board is empty again.
    alice.undo().await.unwrap();
    assert!(alice.tasks().is_empty());
    assert!(backend.tasks_of(&project.id).is_empty());
    assert_eq!(alice.future().len(), 3);

    // Redo everything and land on the same final state.
    for _ in 0..3 {
        alice.redo().await.unwrap();
    }
    assert!(alice.tasks().is_empty());
    assert!(backend.tasks_of(&project.id).is_empty());
    assert_eq!(alice.history().len(), 3);
    assert!(alice.future().is_empty());
}

#[tokio::test]
async fn redo_after_undo_create_reuses_task_id() {
    let (backend, project) = seeded_backend();
    let hub = LoopbackHub::new(64);
    let mut alice = open_client(&backend, &hub, &project, "alice", InMemoryUndoLogStore::new()).await;

    let task = alice
        .create_task("Book venue", TaskConfiguration::default())
        .await
        .unwrap();
    alice.undo().await.unwrap();
    alice.redo().await.unwrap();

    let stored = backend.tasks_of(&project.id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, task.id);
}

// =============================================================================
// Bounds and persistence of the stacks
// =============================================================================

#[tokio::test]
async fn history_keeps_the_most_recent_hundred_actions() {
    let (backend, project) = seeded_backend();
    let hub = LoopbackHub::new(256);
    let mut alice = open_client(&backend, &hub, &project, "alice", InMemoryUndoLogStore::new()).await;

    for i in 0..105 {
        alice
            .create_task(&format!("task {i}"), TaskConfiguration::default())
            .await
            .unwrap();
    }
    assert_eq!(alice.history().len(), 100);

    for _ in 0..100 {
        alice.undo().await.unwrap();
    }
    assert!(matches!(alice.undo().await, Err(BoardError::NoOp(_))));
    // The five oldest creations fell off History and stay on the board.
    assert_eq!(alice.tasks().len(), 5);
    assert_eq!(alice.tasks()[0].title, "task 0");
}

#[tokio::test]
async fn undo_log_file_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("undo-log.json");
    let (backend, project) = seeded_backend();
    let hub = LoopbackHub::new(64);

    let task = {
        let mut first =
            open_client(&backend, &hub, &project, "session-1", FileUndoLogStore::new(&path)).await;
        let task = first
            .create_task("Order badges", TaskConfiguration::default())
            .await
            .unwrap();
        first
            .update_task(&task.id, "Order 200 badges", TaskConfiguration::default())
            .await
            .unwrap();
        first.undo().await.unwrap();
        task
    };
    assert!(path.exists());

    let mut second =
        open_client(&backend, &hub, &project, "session-2", FileUndoLogStore::new(&path)).await;
    assert_eq!(second.history().len(), 1);
    assert_eq!(second.future().len(), 1);

    second.redo().await.unwrap();
    assert_eq!(second.store().get(&task.id).unwrap().title, "Order 200 badges");
    second.undo().await.unwrap();
    second.undo().await.unwrap();
    assert!(backend.tasks_of(&project.id).is_empty());
}

#[tokio::test]
async fn stacks_are_scoped_per_project() {
    let (backend, release) = seeded_backend();
    let launch = Project::new("Launch");
    backend.seed_project(launch.clone());
    let hub = LoopbackHub::new(64);
    let mut alice = open_client(&backend, &hub, &release, "alice", InMemoryUndoLogStore::new()).await;

    alice
        .create_task("In release", TaskConfiguration::default())
        .await
        .unwrap();
    alice.open_project(&launch.id).await.unwrap();
    alice
        .create_task("In launch", TaskConfiguration::default())
        .await
        .unwrap();

    alice.undo().await.unwrap();
    assert!(matches!(alice.undo().await, Err(BoardError::NoOp(_))));
    assert!(backend.tasks_of(&launch.id).is_empty());
    assert_eq!(backend.tasks_of(&release.id).len(), 1);

    alice.open_project(&release.id).await.unwrap();
    assert_eq!(alice.history().len(), 1);
    alice.undo().await.unwrap();
    assert!(backend.tasks_of(&release.id).is_empty());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn failed_undo_leaves_everything_as_it_was() {
    let (backend, project) = seeded_backend();
    let hub = LoopbackHub::new(64);
    let mut alice = open_client(&backend, &hub, &project, "alice", InMemoryUndoLogStore::new()).await;
    let mut bob = open_client(&backend, &hub, &project, "bob", InMemoryUndoLogStore::new()).await;

    let task = alice
        .create_task("Print flyers", TaskConfiguration::default())
        .await
        .unwrap();
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);

    backend.set_failing(true);
    assert!(matches!(alice.undo().await, Err(BoardError::Persistence(_))));
    backend.set_failing(false);

    assert_eq!(alice.tasks(), std::slice::from_ref(&task));
    assert_eq!(alice.history().len(), 1);
    assert!(alice.future().is_empty());

    // Nothing was announced for the failed undo, so the next thing bob sees
    // is the successful retry.
    alice.undo().await.unwrap();
    assert_eq!(bob.next_event().await.unwrap(), Applied::Foreign);
    assert!(bob.tasks().is_empty());
}

#[tokio::test]
async fn undo_without_open_project_is_rejected() {
    let (backend, _project) = seeded_backend();
    let hub = LoopbackHub::new(64);
    let mut board = SyncCoordinator::new(
        backend.clone(),
        hub.connect(),
        InMemoryUndoLogStore::new(),
        "alice",
        100,
    )
    .await;

    assert!(matches!(board.undo().await, Err(BoardError::NoActiveProject)));
    assert!(matches!(board.redo().await, Err(BoardError::NoActiveProject)));
    assert_eq!(backend.call_count(), 0);
}
