//! Authoritative state of a single game room.
//!
//! A `GameRoom` is a plain value: it is loaded from the shared store, mutated by
//! one command and written back. Nothing here performs I/O.

use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::cards::{Card, CardCatalog};
use crate::errors::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub hand: Vec<Card>,
    pub bank: Vec<Card>,
    pub properties: Vec<Card>,
}

impl Player {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            hand: Vec::new(),
            bank: Vec::new(),
            properties: Vec::new(),
        }
    }

    pub fn card_count(&self) -> usize {
        self.hand.len() + self.bank.len() + self.properties.len()
    }
}

/// Room snapshot. Field names are the persisted JSON names.
///
/// `players` keeps insertion order, so its keys list seats in join order,
/// the same order as `turn_order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRoom {
    id: String,
    /// Bumped once per committed command.
    #[serde(default)]
    version: u64,
    players: IndexMap<String, Player>,
    turn_order: Vec<String>,
    current_turn_index: usize,
    /// Draw pile; the top card is the last element.
    deck: Vec<Card>,
    discard_pile: Vec<Card>,
}

/// Uniform in-place Fisher-Yates shuffle, walking from the last index down to 1.
pub fn shuffle_cards<R: Rng + ?Sized>(cards: &mut [Card], rng: &mut R) {
    for i in (1..cards.len()).rev() {
        let j = rng.random_range(0..=i);
        cards.swap(i, j);
    }
}

impl GameRoom {
    /// Empty room: no players, empty deck.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: 0,
            players: IndexMap::new(),
            turn_order: Vec::new(),
            current_turn_index: 0,
            deck: Vec::new(),
            discard_pile: Vec::new(),
        }
    }

    /// Empty room holding a shuffled copy of the catalog.
    pub fn with_fresh_deck<R: Rng + ?Sized>(
        id: impl Into<String>,
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> Self {
        let mut room = Self::new(id);
        room.install_fresh_deck(catalog, rng);
        room
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn deck(&self) -> &[Card] {
        &self.deck
    }

    pub fn discard_pile(&self) -> &[Card] {
        &self.discard_pile
    }

    pub fn turn_order(&self) -> &[String] {
        &self.turn_order
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.contains_key(player_id)
    }

    /// Player ids in join order.
    pub fn roster(&self) -> Vec<String> {
        self.turn_order.clone()
    }

    /// Whose turn it is, if anyone has joined.
    pub fn current_player(&self) -> Option<&str> {
        self.turn_order
            .get(self.current_turn_index)
            .map(String::as_str)
    }

    /// Cards across the deck, the discard pile and every player zone.
    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self.discard_pile.len()
            + self.players.values().map(Player::card_count).sum::<usize>()
    }

    /// Replace the deck with a shuffled copy of the catalog and clear the discard pile.
    pub fn install_fresh_deck<R: Rng + ?Sized>(&mut self, catalog: &CardCatalog, rng: &mut R) {
        self.deck = catalog.fresh_deck();
        self.discard_pile.clear();
        self.shuffle_deck(rng);
    }

    pub fn shuffle_deck<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        shuffle_cards(&mut self.deck, rng);
    }

    pub fn add_player(&mut self, player_id: &str) -> Result<(), DomainError> {
        if self.players.contains_key(player_id) {
            return Err(DomainError::DuplicatePlayer(player_id.to_string()));
        }
        self.players
            .insert(player_id.to_string(), Player::new(player_id));
        self.turn_order.push(player_id.to_string());
        Ok(())
    }

    /// Draw the top card into the player's hand.
    ///
    /// An exhausted deck is refilled from the discard pile first. `Ok(None)`
    /// means nothing is left to draw anywhere; no zone is touched in that case.
    pub fn draw_card<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        rng: &mut R,
    ) -> Result<Option<Card>, DomainError> {
        if !self.players.contains_key(player_id) {
            return Err(DomainError::UnknownPlayer(player_id.to_string()));
        }
        if self.deck.is_empty() {
            self.reshuffle_discard_into_deck(rng);
        }
        let Some(card) = self.deck.pop() else {
            return Ok(None);
        };
        let player = self.player_mut(player_id)?;
        player.hand.push(card.clone());
        Ok(Some(card))
    }

    /// Move a card from hand to the discard pile.
    ///
    /// `Ok(None)` when `card_index` is outside the hand; nothing changes.
    pub fn play_card(
        &mut self,
        player_id: &str,
        card_index: usize,
    ) -> Result<Option<Card>, DomainError> {
        let Some(card) = self.take_from_hand(player_id, card_index)? else {
            return Ok(None);
        };
        self.discard_pile.push(card.clone());
        Ok(Some(card))
    }

    /// Move a card from hand to the player's bank. Same bounds contract as `play_card`.
    pub fn bank_card(
        &mut self,
        player_id: &str,
        card_index: usize,
    ) -> Result<Option<Card>, DomainError> {
        let Some(card) = self.take_from_hand(player_id, card_index)? else {
            return Ok(None);
        };
        self.player_mut(player_id)?.bank.push(card.clone());
        Ok(Some(card))
    }

    /// Advance the turn cursor cyclically and return the new current player.
    pub fn next_turn(&mut self) -> Result<String, DomainError> {
        if self.turn_order.is_empty() {
            return Err(DomainError::NoPlayers);
        }
        self.current_turn_index = (self.current_turn_index + 1) % self.turn_order.len();
        Ok(self.turn_order[self.current_turn_index].clone())
    }

    /// Draw `cards_per_player` cards for every player, one player at a time in turn order.
    pub fn deal_initial_cards<R: Rng + ?Sized>(
        &mut self,
        cards_per_player: usize,
        rng: &mut R,
    ) -> Result<(), DomainError> {
        let order = self.turn_order.clone();
        for player_id in &order {
            for _ in 0..cards_per_player {
                self.draw_card(player_id, rng)?;
            }
        }
        Ok(())
    }

    /// Turn the discard pile into a freshly shuffled deck. Returns false when
    /// there was nothing to reshuffle.
    pub fn reshuffle_discard_into_deck<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.discard_pile.is_empty() {
            return false;
        }
        self.deck = std::mem::take(&mut self.discard_pile);
        self.shuffle_deck(rng);
        true
    }

    /// Structural checks applied to snapshots coming back from the store.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.turn_order.len() != self.players.len() {
            return Err(format!(
                "turn order has {} entries but {} players are seated",
                self.turn_order.len(),
                self.players.len()
            ));
        }
        for (pos, player_id) in self.turn_order.iter().enumerate() {
            if !self.players.contains_key(player_id) {
                return Err(format!("turn order names unseated player {player_id}"));
            }
            if self.turn_order[..pos].contains(player_id) {
                return Err(format!("turn order lists {player_id} twice"));
            }
        }
        if !self.players.keys().eq(self.turn_order.iter()) {
            return Err("players are not listed in join order".to_string());
        }
        for (key, player) in &self.players {
            if key != &player.id {
                return Err(format!("player entry {key} carries id {}", player.id));
            }
        }
        if !self.turn_order.is_empty() && self.current_turn_index >= self.turn_order.len() {
            return Err(format!(
                "current turn index {} out of range for {} players",
                self.current_turn_index,
                self.turn_order.len()
            ));
        }
        Ok(())
    }

    fn player_mut(&mut self, player_id: &str) -> Result<&mut Player, DomainError> {
        self.players
            .get_mut(player_id)
            .ok_or_else(|| DomainError::UnknownPlayer(player_id.to_string()))
    }

    fn take_from_hand(
        &mut self,
        player_id: &str,
        card_index: usize,
    ) -> Result<Option<Card>, DomainError> {
        let player = self.player_mut(player_id)?;
        if card_index >= player.hand.len() {
            warn!(
                player_id,
                card_index,
                hand_len = player.hand.len(),
                "Invalid card index"
            );
            return Ok(None);
        }
        Ok(Some(player.hand.remove(card_index)))
    }
}
