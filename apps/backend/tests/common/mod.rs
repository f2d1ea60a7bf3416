#![allow(dead_code)]

// tests/common/mod.rs
use std::sync::Arc;

use dealroom::domain::{Card, CardCatalog, GameRoom};
use dealroom::services::{DispatcherConfig, SessionDispatcher, WriteMode};
use dealroom::store::{InMemoryRoomStore, RoomStore};
use dealroom::ws::broker::RealtimeBroker;
use dealroom::ws::hub::RecordingSink;
use dealroom::ws::protocol::ClientMsg;
use uuid::Uuid;

// Logging is auto-installed for every test binary
#[ctor::ctor]
fn init_logging() {
    backend_test_support::logging::init();
}

/// One server instance's view of a room: a dispatcher plus a connection that
/// records everything broadcast on this instance.
pub struct Instance {
    pub dispatcher: SessionDispatcher,
    pub observer: Arc<RecordingSink>,
    pub broker: Arc<RealtimeBroker>,
}

impl Instance {
    pub fn new(
        config: DispatcherConfig,
        catalog: CardCatalog,
        store: Arc<dyn RoomStore>,
        broker: Arc<RealtimeBroker>,
    ) -> Self {
        let observer = RecordingSink::new();
        broker
            .registry()
            .register_connection(Uuid::new_v4(), observer.clone());
        let dispatcher = SessionDispatcher::new(config, catalog, store, broker.clone());
        Self {
            dispatcher,
            observer,
            broker,
        }
    }

    pub async fn send(&self, cmd: ClientMsg, from: &Arc<RecordingSink>) {
        self.dispatcher.handle(cmd, &**from).await;
    }
}

pub fn config(room_id: &str, initial_hand_size: usize, write_mode: WriteMode) -> DispatcherConfig {
    DispatcherConfig {
        room_id: room_id.to_string(),
        initial_hand_size,
        write_mode,
    }
}

/// Four distinct cards, small enough to exhaust in a few moves.
pub fn four_card_catalog() -> CardCatalog {
    CardCatalog::from_cards(vec![
        Card::money("Money 1M", 1),
        Card::money("Money 2M", 2),
        Card::property("Boardwalk", "blue"),
        Card::action("Just Say No", "cancel action"),
    ])
}

pub async fn stored_room(store: &dyn RoomStore, room_id: &str) -> GameRoom {
    match store.load(room_id).await {
        Ok(Some(room)) => room,
        other => panic!("expected a stored room for {room_id}, got {other:?}"),
    }
}

pub fn join(player_id: &str) -> ClientMsg {
    ClientMsg::JoinGame {
        player_id: player_id.to_string(),
    }
}

pub fn draw(player_id: &str) -> ClientMsg {
    ClientMsg::DrawCard {
        player_id: player_id.to_string(),
    }
}

pub fn play(player_id: &str, card_index: i64) -> ClientMsg {
    ClientMsg::PlayCard {
        player_id: player_id.to_string(),
        card_index,
    }
}

pub fn bank(player_id: &str, card_index: i64) -> ClientMsg {
    ClientMsg::BankCard {
        player_id: player_id.to_string(),
        card_index,
    }
}

pub fn local_store() -> Arc<InMemoryRoomStore> {
    Arc::new(InMemoryRoomStore::new())
}
