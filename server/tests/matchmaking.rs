//! Matchmaker and room lifecycle, driven against live tick workers.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use bubble_server::matchmaker::Matchmaker;
use bubble_server::room::RoomEvent;
use bubble_server::utils::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN};
use bubble_shared::protocol::{JoinErrorKind, ServerMessage};
use bubble_shared::{GameMode, Phase};

const TICK: Duration = Duration::from_millis(16);

fn outbound() -> (
    mpsc::UnboundedSender<Message>,
    mpsc::UnboundedReceiver<Message>,
) {
    mpsc::unbounded_channel()
}

#[tokio::test]
async fn create_mints_a_well_formed_unique_code() {
    let matchmaker = Matchmaker::new(TICK);
    let a = matchmaker.create(GameMode::Pvp, false).await;
    let b = matchmaker.create(GameMode::Pvp, false).await;

    for room in [&a, &b] {
        assert_eq!(room.code.len(), ROOM_CODE_LEN);
        assert!(room.code.bytes().all(|c| ROOM_CODE_ALPHABET.contains(&c)));
    }
    assert_ne!(a.code, b.code);

    let found = matchmaker.lookup(&a.code).await.expect("registered");
    assert_eq!(found.code, a.code);
    // Codes are case-insensitive on lookup.
    assert!(matchmaker
        .lookup(&a.code.to_ascii_lowercase())
        .await
        .is_some());
}

#[tokio::test]
async fn quick_match_reuses_an_open_public_room() {
    let matchmaker = Matchmaker::new(TICK);
    let first = matchmaker.quick_match(GameMode::Pve).await;
    let second = matchmaker.quick_match(GameMode::Pve).await;
    assert_eq!(first.code, second.code);

    // A different mode never matches into it.
    let other = matchmaker.quick_match(GameMode::Pvp).await;
    assert_ne!(other.code, first.code);
}

#[tokio::test]
async fn quick_match_skips_private_rooms() {
    let matchmaker = Matchmaker::new(TICK);
    let private = matchmaker.create(GameMode::Pvp, true).await;
    let matched = matchmaker.quick_match(GameMode::Pvp).await;
    assert_ne!(matched.code, private.code);
}

#[tokio::test]
async fn join_fills_slots_then_locks_and_counts_down() {
    let matchmaker = Matchmaker::new(TICK);
    let room = matchmaker.create(GameMode::Pvp, false).await;

    let (tx1, _rx1) = outbound();
    let join1 = room.join(tx1).await.expect("first join");
    assert_eq!(join1.player_id, 1);
    assert_eq!(join1.snapshot.phase, Phase::Waiting);
    assert_eq!(join1.snapshot.players.len(), 1);

    let (tx2, _rx2) = outbound();
    let join2 = room.join(tx2).await.expect("second join");
    assert_eq!(join2.player_id, 2);
    // Capacity reached: the room locked and started counting down.
    assert_eq!(join2.snapshot.phase, Phase::Countdown);

    let (tx3, _rx3) = outbound();
    let err = room.join(tx3).await.expect_err("room is locked");
    assert_eq!(err, JoinErrorKind::AlreadyStarted);
}

#[tokio::test]
async fn lookup_of_unknown_code_fails() {
    let matchmaker = Matchmaker::new(TICK);
    assert!(matchmaker.lookup("ZZZZ").await.is_none());
}

#[tokio::test]
async fn snapshots_stream_to_joined_sessions() {
    let matchmaker = Matchmaker::new(TICK);
    let room = matchmaker.create(GameMode::Pve, false).await;

    let (tx, mut rx) = outbound();
    let join = room.join(tx).await.expect("join");

    async fn next_message(rx: &mut mpsc::UnboundedReceiver<Message>) -> ServerMessage {
        let frame = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("frame within a second")
            .expect("channel open");
        let Message::Binary(bytes) = frame else {
            panic!("expected a binary frame");
        };
        bincode::deserialize(&bytes).expect("decodable")
    }

    // The join-accept always precedes the first tick snapshot.
    match next_message(&mut rx).await {
        ServerMessage::JoinAccepted {
            player_id,
            room_code,
            ..
        } => {
            assert_eq!(player_id, join.player_id);
            assert_eq!(room_code, room.code);
        }
        other => panic!("expected join-accept, got {:?}", other),
    }

    // Then the tick worker publishes after every tick.
    match next_message(&mut rx).await {
        ServerMessage::Snapshot(snapshot) => {
            assert_eq!(snapshot.room_code, room.code);
            assert_eq!(snapshot.players.len(), 1);
            assert_eq!(snapshot.players[0].id, join.player_id);
        }
        other => panic!("expected snapshot, got {:?}", other),
    }
}

#[tokio::test]
async fn ready_starts_a_pve_room_single_player() {
    let matchmaker = Matchmaker::new(TICK);
    let room = matchmaker.create(GameMode::Pve, false).await;
    let (tx, _rx) = outbound();
    let join = room.join(tx).await.expect("join");

    room.enqueue(RoomEvent::Ready {
        session_id: join.session_id,
    });
    tokio::time::sleep(Duration::from_millis(120)).await;

    let (phase, _, _) = room.meta().await;
    assert_eq!(phase, Phase::Countdown);
}

#[tokio::test]
async fn dropped_session_can_reconnect_with_its_token() {
    let matchmaker = Matchmaker::new(TICK);
    let room = matchmaker.create(GameMode::Pve, false).await;
    let (tx, _rx) = outbound();
    let join = room.join(tx).await.expect("join");

    room.enqueue(RoomEvent::Dropped {
        session_id: join.session_id,
    });
    tokio::time::sleep(Duration::from_millis(120)).await;

    // Wrong token is rejected.
    let (bad_tx, _bad_rx) = outbound();
    let err = room
        .reconnect("not-a-token", bad_tx)
        .await
        .expect_err("bogus token");
    assert_eq!(err, JoinErrorKind::BadToken);

    // The held slot re-binds with the original token.
    let (new_tx, _new_rx) = outbound();
    let rejoin = room
        .reconnect(&join.token, new_tx)
        .await
        .expect("token honored");
    assert_eq!(rejoin.player_id, join.player_id);
    assert_eq!(rejoin.session_id, join.session_id);
}

#[tokio::test]
async fn leaving_the_last_session_disposes_the_room() {
    let matchmaker = Matchmaker::new(TICK);
    let room = matchmaker.create(GameMode::Pvp, false).await;
    let (tx, _rx) = outbound();
    let join = room.join(tx).await.expect("join");

    room.enqueue(RoomEvent::Leave {
        session_id: join.session_id,
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(matchmaker.lookup(&room.code).await.is_none());
    let (_, _, disposed) = room.meta().await;
    assert!(disposed);
}

#[tokio::test]
async fn overview_reports_rooms_and_players() {
    let matchmaker = Matchmaker::new(TICK);
    let room = matchmaker.create(GameMode::Pvp, true).await;
    let (tx, _rx) = outbound();
    room.join(tx).await.expect("join");

    let (total_players, rooms) = matchmaker.overview().await;
    assert_eq!(total_players, 1);
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].room_id, room.code);
    assert_eq!(rooms[0].name, "bubble_pvp");
    assert!(rooms[0].is_private);
    assert_eq!(rooms[0].max_players, 2);
}
