//! End-to-end tests: a real server on an OS port, driven by
//! tokio-tungstenite clients speaking the JSON wire protocol.
//!
//! Timings are shrunk to tens of milliseconds so the timed paths (word
//! reveal, forced finish) complete quickly in real time. Asserts work on
//! raw `serde_json::Value`s, so field names are checked exactly as a
//! browser client would see them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

use hatbox::prelude::*;

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Fixed word list; the last entry is drawn first.
struct ScriptedWords(Vec<String>);

impl WordSource for ScriptedWords {
    fn generate(&self, _key: &RoomKey) -> Vec<String> {
        self.0.clone()
    }
}

/// Starts a server on an ephemeral port with millisecond-scale timings.
async fn start_server(words: &[&str]) -> SocketAddr {
    let server = HatboxServer::builder()
        .bind("127.0.0.1:0")
        .timings(TurnTimings {
            pre: Duration::from_millis(50),
            explanation: Duration::from_millis(600),
            post: Duration::from_millis(50),
            grace: Duration::from_millis(50),
        })
        .word_source(Arc::new(ScriptedWords(
            words.iter().map(|w| w.to_string()).collect(),
        )))
        .build()
        .await
        .expect("server should bind");
    let addr = server.local_addr();
    tokio::spawn(server.run());
    addr
}

async fn connect(addr: SocketAddr) -> ClientWs {
    let url = format!("ws://{addr}");
    let (ws, _) = tokio_tungstenite::connect_async(&url)
        .await
        .expect("client should connect");
    ws
}

async fn send(ws: &mut ClientWs, command: Value) {
    ws.send(Message::text(command.to_string()))
        .await
        .expect("send should succeed");
}

/// Next JSON event from the server; fails after two seconds of silence.
async fn recv(ws: &mut ClientWs) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("timed out waiting for an event")
        .expect("stream should stay open")
        .expect("websocket error");
    serde_json::from_str(msg.into_text().expect("text frame").as_str())
        .expect("server speaks JSON")
}

/// Joins `username` into `key`, drains the two join events, and returns
/// the `YouJoined` payload.
async fn join(ws: &mut ClientWs, key: &str, username: &str) -> Value {
    send(
        ws,
        json!({"type": "JoinRoom", "key": key, "username": username}),
    )
    .await;
    let joined = recv(ws).await;
    assert_eq!(joined["type"], "PlayerJoined");
    let you = recv(ws).await;
    assert_eq!(you["type"], "YouJoined");
    you
}

// =========================================================================
// Joining
// =========================================================================

#[tokio::test]
async fn test_join_delivers_roster_and_identity() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;

    send(
        &mut ws,
        json!({"type": "JoinRoom", "key": "4242", "username": "ada"}),
    )
    .await;

    let joined = recv(&mut ws).await;
    assert_eq!(joined["type"], "PlayerJoined");
    assert_eq!(joined["username"], "ada");
    assert_eq!(
        joined["playerList"],
        json!([{"username": "ada", "online": true}])
    );
    assert_eq!(joined["host"], "ada");

    let you = recv(&mut ws).await;
    assert_eq!(you["type"], "YouJoined");
    assert_eq!(you["key"], "4242");
    assert_eq!(you["state"], "waiting");
    assert_eq!(you["host"], "ada");
    assert!(
        you.get("speaker").is_none(),
        "no turn fields before the game starts"
    );
}

#[tokio::test]
async fn test_join_rejections() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;

    send(
        &mut ws,
        json!({"type": "JoinRoom", "key": "", "username": "ada"}),
    )
    .await;
    let failure = recv(&mut ws).await;
    assert_eq!(failure["type"], "Failure");
    assert_eq!(failure["request"], "JoinRoom");
    assert_eq!(failure["message"], "room key must not be empty");

    // Same connection is still unbound, so the next complaint is about
    // the username.
    send(
        &mut ws,
        json!({"type": "JoinRoom", "key": "31", "username": ""}),
    )
    .await;
    let failure = recv(&mut ws).await;
    assert_eq!(failure["message"], "username must not be empty");

    join(&mut ws, "31", "ada").await;
    let mut rival = connect(addr).await;
    send(
        &mut rival,
        json!({"type": "JoinRoom", "key": "31", "username": "ada"}),
    )
    .await;
    let failure = recv(&mut rival).await;
    assert_eq!(failure["message"], "username already taken");
}

#[tokio::test]
async fn test_bound_connection_rejected_before_key_validation() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;
    join(&mut ws, "77", "ada").await;

    // Even a nonsense key answers "already in a room" first.
    send(&mut ws, json!({"type": "JoinRoom", "key": "", "username": ""})).await;
    let failure = recv(&mut ws).await;
    assert_eq!(failure["request"], "JoinRoom");
    assert_eq!(failure["message"], "already in a room");
}

// =========================================================================
// Frames and framing errors
// =========================================================================

#[tokio::test]
async fn test_undecodable_frame_keeps_connection_alive() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;

    ws.send(Message::text("not json")).await.unwrap();
    let failure = recv(&mut ws).await;
    assert_eq!(failure["type"], "Failure");
    assert_eq!(failure["request"], "Decode");

    // The connection survives and behaves normally afterwards.
    join(&mut ws, "77", "ada").await;
}

#[tokio::test]
async fn test_binary_frames_are_understood() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;

    let bytes = json!({"type": "FreeKey"}).to_string().into_bytes();
    ws.send(Message::Binary(bytes.into())).await.unwrap();

    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "FreeKey");
}

// =========================================================================
// Queries
// =========================================================================

#[tokio::test]
async fn test_free_key_is_nine_decimal_digits() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;

    send(&mut ws, json!({"type": "FreeKey"})).await;
    let reply = recv(&mut ws).await;
    assert_eq!(reply["type"], "FreeKey");

    let key = reply["key"].as_str().expect("key is a string");
    assert_eq!(key.len(), 9);
    let value: u64 = key.parse().expect("key is numeric");
    assert!((100_000_000..=999_999_999).contains(&value));
}

#[tokio::test]
async fn test_room_info_answers_known_and_unknown_keys() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;

    // Unknown keys answer as an empty waiting room.
    send(&mut ws, json!({"type": "RoomInfo", "key": "314159"})).await;
    let info = recv(&mut ws).await;
    assert_eq!(info["type"], "RoomInfo");
    assert_eq!(info["state"], "waiting");
    assert_eq!(info["playerList"], json!([]));
    assert_eq!(info["host"], Value::Null);

    // An empty key is rejected rather than answered.
    send(&mut ws, json!({"type": "RoomInfo", "key": ""})).await;
    let failure = recv(&mut ws).await;
    assert_eq!(failure["type"], "Failure");
    assert_eq!(failure["request"], "RoomInfo");

    // A populated room reports its roster.
    join(&mut ws, "51", "ada").await;
    let mut other = connect(addr).await;
    send(&mut other, json!({"type": "RoomInfo", "key": "51"})).await;
    let info = recv(&mut other).await;
    assert_eq!(info["state"], "waiting");
    assert_eq!(
        info["playerList"],
        json!([{"username": "ada", "online": true}])
    );
    assert_eq!(info["host"], "ada");
}

// =========================================================================
// Membership
// =========================================================================

#[tokio::test]
async fn test_action_without_room_fails() {
    let addr = start_server(&["apple"]).await;
    let mut ws = connect(addr).await;

    send(&mut ws, json!({"type": "StartGame"})).await;
    let failure = recv(&mut ws).await;
    assert_eq!(failure["type"], "Failure");
    assert_eq!(failure["request"], "StartGame");
    assert_eq!(failure["message"], "not in a room");

    send(
        &mut ws,
        json!({"type": "EndWordExplanation", "cause": "explained"}),
    )
    .await;
    let failure = recv(&mut ws).await;
    assert_eq!(failure["request"], "EndWordExplanation");
    assert_eq!(failure["message"], "not in a room");
}

#[tokio::test]
async fn test_leave_frees_the_connection() {
    let addr = start_server(&["apple"]).await;
    let mut ada = connect(addr).await;
    let mut bob = connect(addr).await;
    join(&mut ada, "8", "ada").await;
    join(&mut bob, "8", "bob").await;
    let _ = recv(&mut ada).await; // bob's arrival

    send(&mut bob, json!({"type": "LeaveRoom"})).await;
    let left = recv(&mut ada).await;
    assert_eq!(left["type"], "PlayerLeft");
    assert_eq!(left["username"], "bob");
    assert_eq!(
        left["playerList"],
        json!([{"username": "ada", "online": true}])
    );
    assert_eq!(left["host"], "ada");

    // The departed connection is unbound again.
    send(&mut bob, json!({"type": "StartGame"})).await;
    let failure = recv(&mut bob).await;
    assert_eq!(failure["message"], "not in a room");
}

// =========================================================================
// Playing
// =========================================================================

#[tokio::test]
async fn test_full_game_end_to_end() {
    let addr = start_server(&["red", "blue"]).await;
    let mut ada = connect(addr).await;
    let mut bob = connect(addr).await;

    join(&mut ada, "9000", "ada").await;
    join(&mut bob, "9000", "bob").await;
    let joined = recv(&mut ada).await;
    assert_eq!(joined["type"], "PlayerJoined");
    assert_eq!(joined["username"], "bob");

    send(&mut ada, json!({"type": "StartGame"})).await;
    for ws in [&mut ada, &mut bob] {
        let started = recv(ws).await;
        assert_eq!(started["type"], "GameStarted");
        assert_eq!(started["speaker"], "ada");
        assert_eq!(started["listener"], "bob");
        assert_eq!(started["wordsCount"], 2);
    }

    send(&mut ada, json!({"type": "SpeakerReady"})).await;
    send(&mut bob, json!({"type": "ListenerReady"})).await;
    for ws in [&mut ada, &mut bob] {
        let started = recv(ws).await;
        assert_eq!(started["type"], "ExplanationStarted");
        assert!(started["startTime"].as_u64().is_some());
    }

    // The reveal timer hands the speaker the first word (last in the
    // list), unseen by the listener.
    let word = recv(&mut ada).await;
    assert_eq!(word["type"], "NewWord");
    assert_eq!(word["word"], "blue");

    send(
        &mut ada,
        json!({"type": "EndWordExplanation", "cause": "explained"}),
    )
    .await;
    let ended = recv(&mut ada).await;
    assert_eq!(ended["type"], "WordExplanationEnded");
    assert_eq!(ended["cause"], "explained");
    assert_eq!(ended["wordsCount"], 1);
    let word = recv(&mut ada).await;
    assert_eq!(word["type"], "NewWord");
    assert_eq!(word["word"], "red");
    let ended = recv(&mut bob).await;
    assert_eq!(ended["type"], "WordExplanationEnded");
    assert_eq!(ended["wordsCount"], 1);

    // Explaining the last word closes the phase instead of drawing.
    send(
        &mut ada,
        json!({"type": "EndWordExplanation", "cause": "explained"}),
    )
    .await;
    let ended = recv(&mut ada).await;
    assert_eq!(ended["type"], "WordExplanationEnded");
    assert_eq!(ended["wordsCount"], 0);
    let phase = recv(&mut ada).await;
    assert_eq!(phase["type"], "ExplanationEnded");
    assert_eq!(phase["wordsCount"], 0);
    let edits = recv(&mut ada).await;
    assert_eq!(edits["type"], "WordsToEdit");
    assert_eq!(
        edits["editWords"],
        json!([
            {"word": "blue", "disposition": "explained"},
            {"word": "red", "disposition": "explained"},
        ])
    );
    let ended = recv(&mut bob).await;
    assert_eq!(ended["type"], "WordExplanationEnded");
    let phase = recv(&mut bob).await;
    assert_eq!(phase["type"], "ExplanationEnded");

    // The speaker confirms; the drained pool ends the game.
    send(
        &mut ada,
        json!({"type": "WordsEdited", "editWords": [
            {"word": "blue", "disposition": "explained"},
            {"word": "red", "disposition": "explained"},
        ]}),
    )
    .await;
    for ws in [&mut ada, &mut bob] {
        let over = recv(ws).await;
        assert_eq!(over["type"], "GameEnded");
        assert_eq!(
            over["results"],
            json!([
                {"username": "ada", "scoreExplained": 2, "scoreGuessed": 0},
                {"username": "bob", "scoreExplained": 0, "scoreGuessed": 2},
            ])
        );
    }

    // The finished room is gone; its key answers as empty again.
    let mut observer = connect(addr).await;
    send(&mut observer, json!({"type": "RoomInfo", "key": "9000"})).await;
    let info = recv(&mut observer).await;
    assert_eq!(info["state"], "waiting");
    assert_eq!(info["playerList"], json!([]));
}

#[tokio::test]
async fn test_force_finish_advances_turn() {
    let addr = start_server(&["red", "blue"]).await;
    let mut ada = connect(addr).await;
    let mut bob = connect(addr).await;
    join(&mut ada, "13", "ada").await;
    join(&mut bob, "13", "bob").await;
    let _ = recv(&mut ada).await; // bob's arrival

    send(&mut ada, json!({"type": "StartGame"})).await;
    let _ = recv(&mut ada).await;
    let _ = recv(&mut bob).await;
    send(&mut ada, json!({"type": "SpeakerReady"})).await;
    send(&mut bob, json!({"type": "ListenerReady"})).await;
    let _ = recv(&mut ada).await; // ExplanationStarted
    let _ = recv(&mut bob).await;

    let word = recv(&mut ada).await;
    assert_eq!(word["type"], "NewWord");

    // Nobody signals; the fallback timer closes the phase on its own and
    // the unresolved word goes back into the pool.
    let phase = recv(&mut ada).await;
    assert_eq!(phase["type"], "ExplanationEnded");
    assert_eq!(phase["wordsCount"], 2);
    let edits = recv(&mut ada).await;
    assert_eq!(edits["type"], "WordsToEdit");
    assert_eq!(edits["editWords"], json!([]));
    let phase = recv(&mut bob).await;
    assert_eq!(phase["type"], "ExplanationEnded");

    // Confirming the empty list flips the roles for the next turn.
    send(&mut ada, json!({"type": "WordsEdited", "editWords": []})).await;
    for ws in [&mut ada, &mut bob] {
        let turn = recv(ws).await;
        assert_eq!(turn["type"], "NextTurn");
        assert_eq!(turn["speaker"], "bob");
        assert_eq!(turn["listener"], "ada");
        assert_eq!(turn["words"], json!([]));
    }
}

#[tokio::test]
async fn test_rejoin_resynchronizes_mid_game() {
    let addr = start_server(&["red", "blue"]).await;
    let mut ada = connect(addr).await;
    let mut bob = connect(addr).await;
    join(&mut ada, "31", "ada").await;
    join(&mut bob, "31", "bob").await;
    let _ = recv(&mut ada).await; // bob's arrival

    send(&mut ada, json!({"type": "StartGame"})).await;
    let _ = recv(&mut ada).await;
    let _ = recv(&mut bob).await;

    // Bob's socket dies mid-game...
    bob.close(None).await.expect("close should succeed");
    tokio::time::sleep(Duration::from_millis(50)).await;

    // ...and a new one reclaims the seat by username.
    let mut returned = connect(addr).await;
    let you = join(&mut returned, "31", "bob").await;
    assert_eq!(you["state"], "playing");
    assert_eq!(you["substate"], "awaitingReady");
    assert_eq!(you["speaker"], "ada");
    assert_eq!(you["listener"], "bob");
    assert_eq!(you["wordsCount"], 2);

    // The reclaimed seat works: readiness from the new socket counts.
    send(&mut ada, json!({"type": "SpeakerReady"})).await;
    send(&mut returned, json!({"type": "ListenerReady"})).await;
    let started = recv(&mut returned).await;
    assert_eq!(started["type"], "ExplanationStarted");
}
