//! Property-based tests for room-level invariants: card conservation, turn
//! rotation, empty draws, reshuffle contents and out-of-range indices.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::domain::test_gens::{self, player_id, RoomOp};
use crate::domain::{Card, CardCatalog, GameRoom};

fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 128,
        ..ProptestConfig::default()
    }
}

fn apply(room: &mut GameRoom, op: &RoomOp, rng: &mut ChaCha8Rng) {
    match op {
        RoomOp::Join(slot) => {
            let _ = room.add_player(&player_id(*slot));
        }
        RoomOp::Draw(slot) => {
            let _ = room.draw_card(&player_id(*slot), rng);
        }
        RoomOp::Play(slot, index) => {
            let _ = room.play_card(&player_id(*slot), *index);
        }
        RoomOp::Bank(slot, index) => {
            let _ = room.bank_card(&player_id(*slot), *index);
        }
        RoomOp::NextTurn => {
            let _ = room.next_turn();
        }
        RoomOp::Reshuffle => {
            room.reshuffle_discard_into_deck(rng);
        }
    }
}

fn sorted(mut cards: Vec<Card>) -> Vec<Card> {
    cards.sort();
    cards
}

proptest! {
    #![proptest_config(proptest_config())]

    /// Property: no operation creates or destroys cards.
    #[test]
    fn prop_card_conservation(
        deck in test_gens::deck(30),
        ops in test_gens::room_ops(60),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let total = deck.len();
        let mut room = GameRoom::with_fresh_deck("room1", &CardCatalog::from_cards(deck), &mut rng);

        for op in &ops {
            apply(&mut room, op, &mut rng);
            prop_assert_eq!(room.total_cards(), total, "after {:?}", op);
            prop_assert!(room.check_invariants().is_ok());
        }
    }

    /// Property: k rotations from index i land on (i + k) mod n.
    #[test]
    fn prop_turn_rotation_is_modular(
        players in 1usize..8,
        start in 0usize..8,
        k in 0usize..50,
    ) {
        let mut room = GameRoom::new("room1");
        for slot in 0..players {
            room.add_player(&format!("p{slot}")).unwrap();
        }
        let start = start % players;
        for _ in 0..start {
            room.next_turn().unwrap();
        }
        prop_assert_eq!(room.current_turn_index(), start);

        for _ in 0..k {
            room.next_turn().unwrap();
        }
        prop_assert_eq!(room.current_turn_index(), (start + k) % players);
    }

    /// Property: out-of-range indices never touch any zone.
    #[test]
    fn prop_invalid_index_never_mutates(
        hand in test_gens::deck(6),
        extra in 0usize..10,
        bank in any::<bool>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let hand_len = hand.len();
        let mut room = GameRoom::with_fresh_deck("room1", &CardCatalog::from_cards(hand), &mut rng);
        room.add_player("p0").unwrap();
        room.deal_initial_cards(hand_len, &mut rng).unwrap();
        let before = room.clone();

        let index = hand_len + extra;
        let result = if bank {
            room.bank_card("p0", index)
        } else {
            room.play_card("p0", index)
        };
        prop_assert_eq!(result, Ok(None));
        prop_assert_eq!(room, before);
    }

    /// Property: a reshuffle moves the discard multiset into the deck unchanged.
    #[test]
    fn prop_reshuffle_preserves_multiset(
        hand in test_gens::deck(12),
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let hand_len = hand.len();
        let mut room = GameRoom::with_fresh_deck("room1", &CardCatalog::from_cards(hand), &mut rng);
        room.add_player("p0").unwrap();
        room.deal_initial_cards(hand_len, &mut rng).unwrap();
        prop_assert!(room.deck().is_empty());
        for _ in 0..hand_len {
            room.play_card("p0", 0).unwrap();
        }
        let discarded = sorted(room.discard_pile().to_vec());

        let reshuffled = room.reshuffle_discard_into_deck(&mut rng);
        prop_assert_eq!(reshuffled, hand_len > 0);
        prop_assert!(room.discard_pile().is_empty());
        prop_assert_eq!(sorted(room.deck().to_vec()), discarded);
    }
}

#[test]
fn draw_from_empty_room_leaves_every_zone_unchanged() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut room = GameRoom::new("room1");
    room.add_player("p0").unwrap();
    let before = room.clone();

    for _ in 0..5 {
        assert_eq!(room.draw_card("p0", &mut rng), Ok(None));
    }
    assert_eq!(room, before);
}

/// Every ordering of three distinct cards shows up with roughly equal frequency.
#[test]
fn shuffle_hits_all_permutations_uniformly() {
    use std::collections::HashMap;

    let cards = vec![Card::money("a", 1), Card::money("b", 2), Card::money("c", 3)];
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut counts: HashMap<Vec<Card>, usize> = HashMap::new();
    let trials = 6_000;

    for _ in 0..trials {
        let mut deck = cards.clone();
        crate::domain::room::shuffle_cards(&mut deck, &mut rng);
        *counts.entry(deck).or_default() += 1;
    }

    assert_eq!(counts.len(), 6);
    for (perm, count) in counts {
        assert!(
            (800..=1200).contains(&count),
            "permutation {perm:?} drawn {count} times out of {trials}"
        );
    }
}
