// Proptest generators for room state and command sequences.

use proptest::prelude::*;

use crate::domain::Card;

pub fn card() -> impl Strategy<Value = Card> {
    prop_oneof![
        (1u32..=5).prop_map(|v| Card::money(format!("Money {v}M"), v)),
        prop_oneof![Just("blue"), Just("red"), Just("green")]
            .prop_map(|color| Card::property(format!("{color} lot"), color)),
        Just(Card::action("Just Say No", "cancel action")),
    ]
}

pub fn deck(max_len: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(card(), 0..=max_len)
}

/// One room mutation, addressed to a seat slot rather than a concrete id so
/// that generated sequences hit both seated and unknown players.
#[derive(Debug, Clone)]
pub enum RoomOp {
    Join(u8),
    Draw(u8),
    Play(u8, usize),
    Bank(u8, usize),
    NextTurn,
    Reshuffle,
}

pub fn player_id(slot: u8) -> String {
    format!("p{slot}")
}

pub fn room_op() -> impl Strategy<Value = RoomOp> {
    prop_oneof![
        (0u8..4).prop_map(RoomOp::Join),
        (0u8..4).prop_map(RoomOp::Draw),
        (0u8..4, 0usize..8).prop_map(|(p, i)| RoomOp::Play(p, i)),
        (0u8..4, 0usize..8).prop_map(|(p, i)| RoomOp::Bank(p, i)),
        Just(RoomOp::NextTurn),
        Just(RoomOp::Reshuffle),
    ]
}

pub fn room_ops(max_len: usize) -> impl Strategy<Value = Vec<RoomOp>> {
    prop::collection::vec(room_op(), 0..=max_len)
}
