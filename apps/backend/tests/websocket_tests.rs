// Websocket round trips through a real actix server.
//
//   cargo test --test websocket_tests

mod common;
mod support;

use std::time::Duration;

use backend_test_support::events::{event_type, event_types, expect_event};
use backend_test_support::rooms::unique_room_id;
use dealroom::config::ServerConfig;
use dealroom::infra::state::build_state;
use serde_json::json;
use support::server::{start_test_server, wait_for_connections};
use support::websocket_client::WebSocketClient;

const TIMEOUT: Duration = Duration::from_secs(3);

fn test_config(hand: usize) -> ServerConfig {
    ServerConfig {
        room_id: unique_room_id("ws"),
        initial_hand_size: hand,
        ..ServerConfig::default()
    }
}

#[actix_web::test]
async fn join_and_play_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state().with_config(test_config(3)).build().await?;
    let registry = state.websocket_registry();
    let server = start_test_server(state).await?;

    let mut alice = WebSocketClient::connect_retry(&server.ws_url(), TIMEOUT).await?;
    let mut bob = WebSocketClient::connect_retry(&server.ws_url(), TIMEOUT).await?;
    wait_for_connections(&registry, 2, TIMEOUT).await?;

    alice
        .send_json(&json!({"type": "joinGame", "playerId": "alice"}))
        .await?;
    let events = alice.recv_many(3, TIMEOUT).await?;
    assert_eq!(event_types(&events), vec!["system", "handUpdate", "turn"]);
    assert_eq!(events[0]["text"], "alice joined");
    assert_eq!(events[0]["players"], json!(["alice"]));
    assert_eq!(events[1]["hand"].as_array().map(Vec::len), Some(3));
    assert_eq!(events[2]["playerId"], "alice");

    // Bob sees the public events only.
    let seen_by_bob = bob.recv_many(2, TIMEOUT).await?;
    assert_eq!(event_types(&seen_by_bob), vec!["system", "turn"]);

    bob.send_json(&json!({"type": "joinGame", "playerId": "bob"}))
        .await?;
    let joined = bob.recv_many(2, TIMEOUT).await?;
    assert_eq!(event_types(&joined), vec!["system", "handUpdate"]);
    assert_eq!(alice.recv_json(TIMEOUT).await?["players"], json!(["alice", "bob"]));

    alice
        .send_json(&json!({"type": "playCard", "playerId": "alice", "cardIndex": 1}))
        .await?;
    let after_play = alice.recv_many(3, TIMEOUT).await?;
    assert_eq!(event_types(&after_play), vec!["play", "handUpdate", "turn"]);
    assert_eq!(
        expect_event(&after_play, "handUpdate")["hand"]
            .as_array()
            .map(Vec::len),
        Some(2)
    );
    assert_eq!(expect_event(&after_play, "turn")["playerId"], "bob");

    let bob_view = bob.recv_many(2, TIMEOUT).await?;
    assert_eq!(event_types(&bob_view), vec!["play", "turn"]);
    assert_eq!(bob_view[0]["card"], after_play[0]["card"]);

    alice.close().await?;
    bob.close().await?;
    wait_for_connections(&registry, 0, TIMEOUT).await?;
    server.stop().await;
    Ok(())
}

#[actix_web::test]
async fn bad_frames_get_an_error_and_keep_the_socket_open(
) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state().with_config(test_config(5)).build().await?;
    let server = start_test_server(state).await?;
    let mut client = WebSocketClient::connect_retry(&server.ws_url(), TIMEOUT).await?;

    client.send_text("{definitely not json").await?;
    let reply = client.recv_json(TIMEOUT).await?;
    assert_eq!(event_type(&reply), "error");
    assert_eq!(reply["text"], "Malformed message");

    client.send_json(&json!({"type": "stealCard"})).await?;
    assert_eq!(event_type(&client.recv_json(TIMEOUT).await?), "error");

    client.send_binary(vec![1, 2, 3]).await?;
    assert_eq!(
        client.recv_json(TIMEOUT).await?["text"],
        "Binary not supported"
    );

    client
        .send_json(&json!({"type": "drawCard", "playerId": "ghost"}))
        .await?;
    assert_eq!(client.recv_json(TIMEOUT).await?["text"], "Not your turn!");

    client
        .send_json(&json!({"type": "joinGame", "playerId": "carol"}))
        .await?;
    let events = client.recv_many(3, TIMEOUT).await?;
    assert_eq!(event_types(&events), vec!["system", "handUpdate", "turn"]);

    client.close().await?;
    server.stop().await;
    Ok(())
}

#[actix_web::test]
async fn commands_from_one_connection_run_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state().with_config(test_config(2)).build().await?;
    let server = start_test_server(state).await?;
    let mut client = WebSocketClient::connect_retry(&server.ws_url(), TIMEOUT).await?;

    // Sent back to back without waiting; the draw only succeeds if the join ran first.
    client
        .send_json(&json!({"type": "joinGame", "playerId": "dana"}))
        .await?;
    client
        .send_json(&json!({"type": "drawCard", "playerId": "dana"}))
        .await?;

    let events = client.recv_many(6, TIMEOUT).await?;
    assert_eq!(
        event_types(&events),
        vec!["system", "handUpdate", "turn", "cardDrawn", "handUpdate", "system"]
    );
    assert!(events[3]["card"].is_object());
    assert_eq!(events[5]["text"], "dana drew a card");

    client.close().await?;
    server.stop().await;
    Ok(())
}
