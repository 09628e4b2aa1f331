//! Integration tests for the relay server: full connection flow over a
//! real WebSocket, from connect ack to host failover.

use std::time::Duration;

use emurelay::prelude::*;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

// =========================================================================
// Helpers
// =========================================================================

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    let server = RelayServerBuilder::new()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    addr
}

/// Connects and consumes the `connected` ack, returning the socket and
/// the server-assigned player id.
async fn connect(addr: &str) -> (ClientWs, u64) {
    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    let ack = recv_event(&mut ws).await;
    assert_eq!(ack["event"], "connected");
    let player_id = ack["data"]["playerId"].as_u64().expect("playerId");
    (ws, player_id)
}

async fn send_event(ws: &mut ClientWs, event: Value) {
    ws.send(Message::Text(event.to_string().into()))
        .await
        .expect("send");
}

/// Receives the next event frame, with a timeout so a missing event
/// fails the test instead of hanging it.
async fn recv_event(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for event")
        .expect("stream ended")
        .expect("recv");
    serde_json::from_str(msg.to_text().expect("text frame")).expect("json")
}

/// Creates a room via `ws` and returns its code.
async fn create_room(ws: &mut ClientWs) -> String {
    send_event(
        ws,
        json!({
            "event": "create-room",
            "data": { "game": { "title": "Sonic 2" }, "username": "Rui" }
        }),
    )
    .await;
    let created = recv_event(ws).await;
    assert_eq!(created["event"], "room-created");
    assert_eq!(created["data"]["role"], "host");
    created["data"]["roomCode"].as_str().expect("roomCode").to_string()
}

/// Joins `code` via `ws`, consuming the `player-joined` broadcast and
/// the `room-joined` confirmation.
async fn join_room(ws: &mut ClientWs, code: &str, username: &str) -> Value {
    send_event(
        ws,
        json!({
            "event": "join-room",
            "data": { "roomCode": code, "username": username }
        }),
    )
    .await;
    let first = recv_event(ws).await;
    assert_eq!(first["event"], "player-joined");
    let joined = recv_event(ws).await;
    assert_eq!(joined["event"], "room-joined");
    joined
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn connect_ack_carries_a_player_id() {
    let addr = start_server().await;
    let (_ws, player_id) = connect(&addr).await;
    assert!(player_id > 0);
}

#[tokio::test]
async fn connections_get_distinct_player_ids() {
    let addr = start_server().await;
    let (_ws1, p1) = connect(&addr).await;
    let (_ws2, p2) = connect(&addr).await;
    assert_ne!(p1, p2);
}

#[tokio::test]
async fn create_room_returns_a_code_and_host_role() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    let code = create_room(&mut ws).await;
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
}

#[tokio::test]
async fn second_player_joins_with_a_lowercase_code() {
    let addr = start_server().await;
    let (mut host, host_id) = connect(&addr).await;
    let (mut guest, guest_id) = connect(&addr).await;

    let code = create_room(&mut host).await;
    let joined = join_room(&mut guest, &code.to_lowercase(), "Ana").await;

    assert_eq!(joined["data"]["roomCode"], code);
    assert_eq!(joined["data"]["role"], "spectator");
    assert_eq!(joined["data"]["hostId"], host_id);
    assert_eq!(joined["data"]["playersCount"], 2);

    // Host hears about the newcomer.
    let notice = recv_event(&mut host).await;
    assert_eq!(notice["event"], "player-joined");
    assert_eq!(notice["data"]["playerId"], guest_id);
    assert_eq!(notice["data"]["username"], "Ana");
}

#[tokio::test]
async fn join_unknown_room_reports_an_error_event() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    send_event(
        &mut ws,
        json!({ "event": "join-room", "data": { "roomCode": "ZZZZZ9" } }),
    )
    .await;

    let err = recv_event(&mut ws).await;
    assert_eq!(err["event"], "error");
    assert!(err["data"]["message"].as_str().unwrap().contains("not found"));
    assert_eq!(err["data"]["context"], "join-room");
}

#[tokio::test]
async fn host_input_reaches_the_guest_but_not_the_host() {
    let addr = start_server().await;
    let (mut host, _) = connect(&addr).await;
    let (mut guest, _) = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut guest, &code, "Ana").await;
    recv_event(&mut host).await; // player-joined

    let payload = json!({ "frame": 120, "buttons": 5 });
    send_event(&mut host, json!({ "event": "input", "data": payload })).await;

    let relayed = recv_event(&mut guest).await;
    assert_eq!(relayed["event"], "input");
    assert_eq!(relayed["data"], payload);

    // Nothing was echoed to the host: a heartbeat answer arrives next.
    send_event(&mut host, json!({ "event": "heartbeat" })).await;
    let ack = recv_event(&mut host).await;
    assert_eq!(ack["event"], "heartbeat-ack");
}

#[tokio::test]
async fn guest_input_reaches_the_host_as_player2_input() {
    let addr = start_server().await;
    let (mut host, _) = connect(&addr).await;
    let (mut guest, _) = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut guest, &code, "Ana").await;
    recv_event(&mut host).await; // player-joined

    let payload = json!({ "frame": 42, "buttons": 9 });
    send_event(&mut guest, json!({ "event": "guest-input", "data": payload }))
        .await;

    let relayed = recv_event(&mut host).await;
    assert_eq!(relayed["event"], "player2-input");
    assert_eq!(relayed["data"], payload);
}

#[tokio::test]
async fn host_disconnect_promotes_the_guest() {
    let addr = start_server().await;
    let (mut host, host_id) = connect(&addr).await;
    let (mut guest, guest_id) = connect(&addr).await;
    let code = create_room(&mut host).await;
    join_room(&mut guest, &code, "Ana").await;
    recv_event(&mut host).await; // player-joined

    drop(host);

    let changed = recv_event(&mut guest).await;
    assert_eq!(changed["event"], "host-changed");
    assert_eq!(changed["data"]["newHost"], guest_id);

    let left = recv_event(&mut guest).await;
    assert_eq!(left["event"], "player-left");
    assert_eq!(left["data"]["playerId"], host_id);
    assert_eq!(left["data"]["playersCount"], 1);
}

#[tokio::test]
async fn chat_is_stamped_and_echoed_to_the_sender() {
    let addr = start_server().await;
    let (mut host, host_id) = connect(&addr).await;
    create_room(&mut host).await;

    send_event(
        &mut host,
        json!({ "event": "chat-message", "data": { "message": "gg" } }),
    )
    .await;

    let chat = recv_event(&mut host).await;
    assert_eq!(chat["event"], "chat-message");
    assert_eq!(chat["data"]["playerId"], host_id);
    assert_eq!(chat["data"]["username"], "Rui");
    assert_eq!(chat["data"]["message"], "gg");
    assert!(chat["data"]["timestamp"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn malformed_frames_do_not_kill_the_connection() {
    let addr = start_server().await;
    let (mut ws, _) = connect(&addr).await;

    ws.send(Message::Text("not json".into())).await.expect("send");
    let err = recv_event(&mut ws).await;
    assert_eq!(err["event"], "error");

    // The connection still works afterwards.
    send_event(&mut ws, json!({ "event": "heartbeat" })).await;
    let ack = recv_event(&mut ws).await;
    assert_eq!(ack["event"], "heartbeat-ack");
}

#[tokio::test]
async fn check_room_answers_without_membership() {
    let addr = start_server().await;
    let (mut host, _) = connect(&addr).await;
    let (mut browser, _) = connect(&addr).await;
    let code = create_room(&mut host).await;

    send_event(
        &mut browser,
        json!({ "event": "check-room", "data": { "roomCode": code.to_lowercase() } }),
    )
    .await;
    let status = recv_event(&mut browser).await;
    assert_eq!(status["event"], "room-status");
    assert_eq!(status["data"]["exists"], true);
    assert_eq!(status["data"]["hasHost"], true);
    assert_eq!(status["data"]["playersCount"], 1);

    send_event(
        &mut browser,
        json!({ "event": "check-room", "data": { "roomCode": "NOPE99" } }),
    )
    .await;
    let status = recv_event(&mut browser).await;
    assert_eq!(status["data"]["exists"], false);
}

#[tokio::test]
async fn lobby_flow_create_browse_join() {
    let addr = start_server().await;
    let (mut host, _) = connect(&addr).await;
    let (mut browser, _) = connect(&addr).await;

    send_event(
        &mut host,
        json!({
            "event": "create-session",
            "data": {
                "sessionName": "Kart night",
                "gameTitle": "Super Kart",
                "maxPlayers": 4,
                "hostName": "Rui"
            }
        }),
    )
    .await;
    let created = recv_event(&mut host).await;
    assert_eq!(created["event"], "session-created");
    let session_id = created["data"]["sessionId"].as_str().unwrap().to_string();

    // Everyone else in the lobby hears about the new session.
    let update = recv_event(&mut browser).await;
    assert_eq!(update["event"], "session-updated");
    assert_eq!(update["data"]["sessionId"], session_id.as_str());

    send_event(&mut browser, json!({ "event": "get-lobby-sessions" })).await;
    let listing = recv_event(&mut browser).await;
    assert_eq!(listing["event"], "lobby-sessions");
    let sessions = listing["data"]["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["sessionName"], "Kart night");
    assert_eq!(sessions[0]["hostName"], "Rui");
    assert_eq!(sessions[0]["status"], "waiting");

    send_event(
        &mut browser,
        json!({
            "event": "join-session",
            "data": { "sessionId": session_id, "userName": "Ana" }
        }),
    )
    .await;
    // player-joined (now a member), then the join confirmation.
    let first = recv_event(&mut browser).await;
    assert_eq!(first["event"], "player-joined");
    let joined = recv_event(&mut browser).await;
    assert_eq!(joined["event"], "joined-session");
    assert_eq!(joined["data"]["success"], true);
    assert_eq!(joined["data"]["role"], "spectator");
    assert_eq!(joined["data"]["players"], 2);
}

#[tokio::test]
async fn join_or_create_session_is_first_wins() {
    let addr = start_server().await;
    let (mut first, _) = connect(&addr).await;
    let (mut second, _) = connect(&addr).await;

    let body = json!({
        "event": "join-or-create-session",
        "data": { "sessionId": "lobby-42", "game": { "title": "Sonic 2" } }
    });
    send_event(&mut first, body.clone()).await;
    let created = recv_event(&mut first).await;
    assert_eq!(created["event"], "room-created");
    assert_eq!(created["data"]["role"], "host");
    assert_eq!(created["data"]["sessionId"], "lobby-42");
    let code = created["data"]["roomCode"].as_str().unwrap().to_string();

    send_event(&mut second, body).await;
    let first_evt = recv_event(&mut second).await;
    assert_eq!(first_evt["event"], "player-joined");
    let joined = recv_event(&mut second).await;
    assert_eq!(joined["event"], "room-joined");
    assert_eq!(joined["data"]["role"], "spectator");
    assert_eq!(joined["data"]["roomCode"], code.as_str());
}
