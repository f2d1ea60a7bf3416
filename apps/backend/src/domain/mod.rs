//! Domain layer: cards, the catalog, and the room state machine.

pub mod cards;
pub mod room;

#[cfg(test)]
mod test_gens;
#[cfg(test)]
mod tests_props_room;

// Re-exports for ergonomics
pub use cards::{Card, CardCatalog};
pub use room::{shuffle_cards, GameRoom, Player};
