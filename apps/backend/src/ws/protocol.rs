use serde::{Deserialize, Serialize};

use crate::domain::Card;

/// Inbound commands, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    #[serde(rename_all = "camelCase")]
    JoinGame { player_id: String },
    #[serde(rename_all = "camelCase")]
    DrawCard { player_id: String },
    /// `card_index` is signed so that negative indices reach validation
    /// instead of failing to decode.
    #[serde(rename_all = "camelCase")]
    PlayCard { player_id: String, card_index: i64 },
    #[serde(rename_all = "camelCase")]
    BankCard { player_id: String, card_index: i64 },
    ResetGame,
}

impl ClientMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMsg::JoinGame { .. } => "joinGame",
            ClientMsg::DrawCard { .. } => "drawCard",
            ClientMsg::PlayCard { .. } => "playCard",
            ClientMsg::BankCard { .. } => "bankCard",
            ClientMsg::ResetGame => "resetGame",
        }
    }
}

/// Outbound events, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    System {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        players: Option<Vec<String>>,
    },

    /// Private: only the owning connection receives its hand.
    HandUpdate { hand: Vec<Card> },

    /// Private. `card` is null when nothing was left to draw.
    CardDrawn { card: Option<Card> },

    #[serde(rename_all = "camelCase")]
    Turn { player_id: String },

    #[serde(rename_all = "camelCase")]
    Play { player_id: String, card: Card },

    #[serde(rename_all = "camelCase")]
    Banked {
        player_id: String,
        card: Card,
        bank: Vec<Card>,
    },

    /// Private.
    Error { text: String },
}

impl ServerMsg {
    pub fn system(text: impl Into<String>) -> Self {
        ServerMsg::System {
            text: text.into(),
            players: None,
        }
    }

    pub fn system_with_roster(text: impl Into<String>, players: Vec<String>) -> Self {
        ServerMsg::System {
            text: text.into(),
            players: Some(players),
        }
    }

    /// Events that must only ever reach the connection that caused them.
    pub fn is_private(&self) -> bool {
        matches!(
            self,
            ServerMsg::HandUpdate { .. } | ServerMsg::CardDrawn { .. } | ServerMsg::Error { .. }
        )
    }
}
