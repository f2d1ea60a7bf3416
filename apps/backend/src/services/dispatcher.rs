//! Per-connection command handling.
//!
//! Every command follows the same cycle: reload the room from the shared
//! store, validate, mutate, persist, then emit events. Nothing is cached
//! between commands.

use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::{Card, CardCatalog, GameRoom};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::store::RoomStore;
use crate::ws::broker::RealtimeBroker;
use crate::ws::hub::ClientSink;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// How a command's snapshot is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Unconditional overwrite. Two commands racing on the same snapshot can
    /// lose one update.
    #[default]
    LastWriteWins,
    /// Write only if nobody committed since our load; the losing command is
    /// rejected with `OPTIMISTIC_LOCK`.
    CompareAndSwap,
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub room_id: String,
    pub initial_hand_size: usize,
    pub write_mode: WriteMode,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            room_id: "room1".to_string(),
            initial_hand_size: 5,
            write_mode: WriteMode::LastWriteWins,
        }
    }
}

pub struct SessionDispatcher {
    config: DispatcherConfig,
    catalog: CardCatalog,
    store: Arc<dyn RoomStore>,
    broker: Arc<RealtimeBroker>,
}

impl SessionDispatcher {
    pub fn new(
        config: DispatcherConfig,
        catalog: CardCatalog,
        store: Arc<dyn RoomStore>,
        broker: Arc<RealtimeBroker>,
    ) -> Self {
        Self {
            config,
            catalog,
            store,
            broker,
        }
    }

    pub fn room_id(&self) -> &str {
        &self.config.room_id
    }

    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    pub fn broker(&self) -> &Arc<RealtimeBroker> {
        &self.broker
    }

    /// Make sure a snapshot exists, creating and persisting a fresh room if not.
    pub async fn bootstrap(&self) -> Result<GameRoom, AppError> {
        let room_id = self.room_id();
        if let Some(room) = self.store.load(room_id).await? {
            info!(
                room_id,
                players = room.turn_order().len(),
                version = room.version(),
                "Loaded game state from store"
            );
            return Ok(room);
        }

        info!(room_id, "No saved game, starting new one");
        let room = self.fresh_room();
        self.store.save(&room).await?;
        Ok(room)
    }

    /// Run one command. Failures are reported to `reply` only.
    pub async fn handle(&self, cmd: ClientMsg, reply: &dyn ClientSink) {
        let kind = cmd.kind();
        let span = info_span!("command", kind, room_id = %self.config.room_id);

        let result = self.execute(cmd, reply).instrument(span).await;
        if let Err(err) = result {
            if err.is_client_error() {
                debug!(command = kind, code = %err.code(), "Command rejected");
            } else {
                error!(command = kind, error = %err, "Command failed");
            }
            reply.deliver(&ServerMsg::Error {
                text: err.client_message(),
            });
        }
    }

    pub async fn execute(&self, cmd: ClientMsg, reply: &dyn ClientSink) -> Result<(), AppError> {
        match cmd {
            ClientMsg::JoinGame { player_id } => self.join_game(&player_id, reply).await,
            ClientMsg::DrawCard { player_id } => self.draw_card(&player_id, reply).await,
            ClientMsg::PlayCard {
                player_id,
                card_index,
            } => self.play_card(&player_id, card_index, reply).await,
            ClientMsg::BankCard {
                player_id,
                card_index,
            } => self.bank_card(&player_id, card_index, reply).await,
            ClientMsg::ResetGame => self.reset_game().await,
        }
    }

    /// Seat a player and deal their opening hand.
    ///
    /// Joining with an id that is already seated is a reconnect: nothing is
    /// dealt or persisted, the roster is re-announced and the existing hand
    /// is resent.
    async fn join_game(&self, player_id: &str, reply: &dyn ClientSink) -> Result<(), AppError> {
        let (mut room, loaded_version) = self.load_room().await?;

        if room.has_player(player_id) {
            info!(player_id, "Player rejoined");
            self.publish(ServerMsg::system_with_roster(
                format!("{player_id} rejoined"),
                room.roster(),
            ))
            .await;
            reply.deliver(&ServerMsg::HandUpdate {
                hand: hand_of(&room, player_id),
            });
            return Ok(());
        }

        {
            let mut rng = rand::rng();
            if room.turn_order().is_empty() {
                room.install_fresh_deck(&self.catalog, &mut rng);
            }
            room.add_player(player_id)?;
            for _ in 0..self.config.initial_hand_size {
                room.draw_card(player_id, &mut rng)?;
            }
        }

        self.commit(&mut room, loaded_version).await?;
        info!(player_id, players = room.turn_order().len(), "Player joined");

        self.publish(ServerMsg::system_with_roster(
            format!("{player_id} joined"),
            room.roster(),
        ))
        .await;
        reply.deliver(&ServerMsg::HandUpdate {
            hand: hand_of(&room, player_id),
        });
        if room.turn_order().len() == 1 {
            self.publish(ServerMsg::Turn {
                player_id: player_id.to_string(),
            })
            .await;
        }
        Ok(())
    }

    /// Publishes `"{id} drew a card"`, or `"{id} tried to draw but the deck is empty"`
    /// when deck and discard are both exhausted; that case persists nothing.
    async fn draw_card(&self, player_id: &str, reply: &dyn ClientSink) -> Result<(), AppError> {
        let (mut room, loaded_version) = self.load_room().await?;
        require_turn(&room, player_id)?;

        let card = {
            let mut rng = rand::rng();
            room.draw_card(player_id, &mut rng)?
        };

        if card.is_some() {
            self.commit(&mut room, loaded_version).await?;
        } else {
            info!(player_id, "Deck and discard pile both empty");
        }

        let drew = card.is_some();
        reply.deliver(&ServerMsg::CardDrawn { card });
        reply.deliver(&ServerMsg::HandUpdate {
            hand: hand_of(&room, player_id),
        });

        let text = if drew {
            format!("{player_id} drew a card")
        } else {
            format!("{player_id} tried to draw but the deck is empty")
        };
        self.publish(ServerMsg::system(text)).await;
        Ok(())
    }

    async fn play_card(
        &self,
        player_id: &str,
        card_index: i64,
        reply: &dyn ClientSink,
    ) -> Result<(), AppError> {
        let (mut room, loaded_version) = self.load_room().await?;
        require_turn(&room, player_id)?;

        let card = match hand_slot(card_index) {
            Some(slot) => room.play_card(player_id, slot)?,
            None => None,
        };
        let Some(card) = card else {
            warn!(player_id, card_index, "Rejected play with invalid card index");
            return Err(AppError::invalid_card_index());
        };
        let next = room.next_turn()?;

        self.commit(&mut room, loaded_version).await?;

        self.publish(ServerMsg::Play {
            player_id: player_id.to_string(),
            card,
        })
        .await;
        reply.deliver(&ServerMsg::HandUpdate {
            hand: hand_of(&room, player_id),
        });
        self.publish(ServerMsg::Turn { player_id: next }).await;
        Ok(())
    }

    async fn bank_card(
        &self,
        player_id: &str,
        card_index: i64,
        reply: &dyn ClientSink,
    ) -> Result<(), AppError> {
        let (mut room, loaded_version) = self.load_room().await?;
        require_turn(&room, player_id)?;

        let card = match hand_slot(card_index) {
            Some(slot) => room.bank_card(player_id, slot)?,
            None => None,
        };
        let Some(card) = card else {
            warn!(player_id, card_index, "Rejected bank with invalid card index");
            return Err(AppError::invalid_card_index());
        };
        // Rotate before persisting so the stored cursor matches the turn event.
        let next = room.next_turn()?;

        self.commit(&mut room, loaded_version).await?;

        let bank = room
            .player(player_id)
            .map(|p| p.bank.clone())
            .unwrap_or_default();
        self.publish(ServerMsg::Banked {
            player_id: player_id.to_string(),
            card,
            bank,
        })
        .await;
        reply.deliver(&ServerMsg::HandUpdate {
            hand: hand_of(&room, player_id),
        });
        self.publish(ServerMsg::Turn { player_id: next }).await;
        Ok(())
    }

    /// Throw the room away and start over with a full, shuffled deck.
    async fn reset_game(&self) -> Result<(), AppError> {
        let room_id = self.room_id();

        // A corrupt record must not block a reset.
        let previous_version = match self.store.load(room_id).await {
            Ok(room) => room.map(|r| r.version()).unwrap_or(0),
            Err(err) if err.code() == ErrorCode::DataCorruption => {
                warn!(room_id, error = %err, "Discarding unreadable snapshot on reset");
                0
            }
            Err(err) => return Err(err),
        };

        self.store.delete(room_id).await?;

        let mut room = self.fresh_room();
        room.set_version(previous_version + 1);
        self.store.save(&room).await?;
        info!(room_id, version = room.version(), "Game reset");

        self.publish(ServerMsg::system_with_roster("Game has been reset", Vec::new()))
            .await;
        Ok(())
    }

    /// Latest snapshot plus the version it was loaded at. A missing record
    /// yields an unsaved fresh room at version 0.
    async fn load_room(&self) -> Result<(GameRoom, u64), AppError> {
        let room = match self.store.load(self.room_id()).await? {
            Some(room) => room,
            None => self.fresh_room(),
        };
        let version = room.version();
        Ok((room, version))
    }

    async fn commit(&self, room: &mut GameRoom, loaded_version: u64) -> Result<(), AppError> {
        room.bump_version();
        match self.config.write_mode {
            WriteMode::LastWriteWins => self.store.save(room).await,
            WriteMode::CompareAndSwap => {
                if self.store.compare_and_save(room, loaded_version).await? {
                    Ok(())
                } else {
                    Err(AppError::conflict(
                        ErrorCode::OptimisticLock,
                        "Game state changed while your move was processed, please retry",
                    ))
                }
            }
        }
    }

    /// Publish without failing the command: the snapshot is already committed
    /// and local delivery has happened by the time the bus can fail.
    async fn publish(&self, event: ServerMsg) {
        if let Err(err) = self.broker.publish(event).await {
            error!(error = %err, "Failed to forward event to other instances");
        }
    }

    fn fresh_room(&self) -> GameRoom {
        let mut rng = rand::rng();
        GameRoom::with_fresh_deck(self.room_id(), &self.catalog, &mut rng)
    }
}

fn require_turn(room: &GameRoom, player_id: &str) -> Result<(), AppError> {
    if room.current_player() == Some(player_id) {
        Ok(())
    } else {
        debug!(
            player_id,
            current = room.current_player().unwrap_or("<nobody>"),
            "Out of turn command"
        );
        Err(AppError::not_your_turn())
    }
}

fn hand_slot(card_index: i64) -> Option<usize> {
    usize::try_from(card_index).ok()
}

fn hand_of(room: &GameRoom, player_id: &str) -> Vec<Card> {
    room.player(player_id)
        .map(|p| p.hand.clone())
        .unwrap_or_default()
}
