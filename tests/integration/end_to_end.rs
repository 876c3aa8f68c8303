//! End-to-end tests against the real server.
//!
//! Starts `taskboard-server` in-process and wires clients with the HTTP
//! persistence backend and the WebSocket broadcast channel:
//! - mutations persist over HTTP and reach peers through the relay
//! - the publisher recognises its own echo coming back from the relay
//! - a rejected write is rolled back locally

use std::time::Duration;

use taskboard::channel::ws::{WsChannel, WsChannelOptions};
use taskboard::history::memory::InMemoryUndoLogStore;
use taskboard::persistence::PersistenceService;
use taskboard::persistence::http::HttpPersistence;
use taskboard::sync::{Applied, BoardError, SyncCoordinator};
use taskboard_proto::{Priority, TaskConfiguration};

type Board = SyncCoordinator<HttpPersistence, WsChannel, InMemoryUndoLogStore>;

/// Start the server in-process and return its HTTP base URL.
async fn start_server() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = taskboard_server::relay::start_server("127.0.0.1:0")
        .await
        .expect("failed to start server");
    (format!("http://{addr}"), handle)
}

async fn connect(server_url: &str, client_id: &str) -> Board {
    let persistence = HttpPersistence::new(server_url).unwrap();
    let ws_url = format!("{}/ws", server_url.replacen("http://", "ws://", 1));
    let channel = WsChannel::connect(&ws_url, &WsChannelOptions::default())
        .await
        .unwrap();
    SyncCoordinator::new(
        persistence,
        channel,
        InMemoryUndoLogStore::new(),
        client_id,
        100,
    )
    .await
}

async fn next(board: &mut Board) -> Applied {
    tokio::time::timeout(Duration::from_secs(5), board.next_event())
        .await
        .expect("no event within 5s")
        .unwrap()
}

#[tokio::test]
async fn two_clients_share_a_board() {
    let (url, _server) = start_server().await;
    let mut alice = connect(&url, "alice").await;
    let mut bob = connect(&url, "bob").await;

    let project = alice.create_project("Launch").await.unwrap();
    alice.open_project(&project.id).await.unwrap();
    bob.open_project(&project.id).await.unwrap();

    let task = alice
        .create_task("Write announcement", TaskConfiguration::new(Priority::High, "blog"))
        .await
        .unwrap();

    assert_eq!(next(&mut alice).await, Applied::Echo);
    assert_eq!(next(&mut bob).await, Applied::Foreign);
    assert_eq!(bob.tasks(), std::slice::from_ref(&task));

    bob.update_task(&task.id, "Write and publish announcement", task.configuration.clone())
        .await
        .unwrap();
    assert_eq!(next(&mut bob).await, Applied::Echo);
    assert_eq!(next(&mut alice).await, Applied::Foreign);
    assert_eq!(alice.tasks()[0].title, "Write and publish announcement");

    // Only bob can undo his edit; alice's History holds her create alone.
    assert_eq!(alice.history().len(), 1);
    bob.undo().await.unwrap();
    assert_eq!(next(&mut alice).await, Applied::Foreign);
    assert_eq!(alice.tasks()[0].title, "Write announcement");
}

#[tokio::test]
async fn late_joiner_loads_persisted_tasks() {
    let (url, _server) = start_server().await;
    let mut alice = connect(&url, "alice").await;

    let project = alice.create_project("Offsite").await.unwrap();
    alice.open_project(&project.id).await.unwrap();
    alice
        .create_task("Book train", TaskConfiguration::default())
        .await
        .unwrap();
    alice
        .create_task("Book hotel", TaskConfiguration::default())
        .await
        .unwrap();

    let mut bob = connect(&url, "bob").await;
    bob.open_project(&project.id).await.unwrap();
    let titles: Vec<_> = bob.tasks().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["Book train", "Book hotel"]);
    assert!(bob.history().is_empty());
}

#[tokio::test]
async fn rejected_update_is_rolled_back() {
    let (url, _server) = start_server().await;
    let mut alice = connect(&url, "alice").await;
    let mut bob = connect(&url, "bob").await;

    let project = alice.create_project("Cleanup").await.unwrap();
    alice.open_project(&project.id).await.unwrap();
    bob.open_project(&project.id).await.unwrap();

    let task = alice
        .create_task("Archive old tickets", TaskConfiguration::default())
        .await
        .unwrap();
    assert_eq!(next(&mut bob).await, Applied::Foreign);
    bob.delete_task(&task.id).await.unwrap();

    // Alice has not seen the delete yet, so her edit reaches a server that
    // no longer has the task.
    let result = alice
        .update_task(&task.id, "Archive everything", TaskConfiguration::default())
        .await;
    assert!(matches!(result, Err(BoardError::Persistence(_))));
    assert_eq!(alice.tasks(), std::slice::from_ref(&task));
    assert_eq!(alice.history().len(), 1);

    assert_eq!(next(&mut alice).await, Applied::Echo);
    assert_eq!(next(&mut alice).await, Applied::Foreign);
    assert!(alice.tasks().is_empty());
}

#[tokio::test]
async fn deleting_the_open_project_closes_it() {
    let (url, _server) = start_server().await;
    let mut alice = connect(&url, "alice").await;

    let project = alice.create_project("Scratch").await.unwrap();
    alice.open_project(&project.id).await.unwrap();
    alice
        .create_task("Throwaway", TaskConfiguration::default())
        .await
        .unwrap();

    alice.delete_project(&project.id).await.unwrap();
    assert!(alice.active_project().is_none());
    assert!(alice.tasks().is_empty());
    assert!(
        alice
            .list_projects()
            .await
            .unwrap()
            .iter()
            .all(|p| p.id != project.id)
    );

    let persistence = HttpPersistence::new(&url).unwrap();
    assert!(persistence.list_tasks(&project.id).await.is_err());
}
