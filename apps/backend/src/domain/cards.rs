//! Card descriptors and the static catalog that seeds a room's deck.

use serde::{Deserialize, Serialize};

/// A single card. The `type` tag and field names match the persisted snapshot
/// and the client wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Card {
    Money { name: String, value: u32 },
    Property { name: String, color: String },
    Action { name: String, effect: String },
}

impl Card {
    pub fn money(name: impl Into<String>, value: u32) -> Self {
        Card::Money {
            name: name.into(),
            value,
        }
    }

    pub fn property(name: impl Into<String>, color: impl Into<String>) -> Self {
        Card::Property {
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn action(name: impl Into<String>, effect: impl Into<String>) -> Self {
        Card::Action {
            name: name.into(),
            effect: effect.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Card::Money { name, .. } | Card::Property { name, .. } | Card::Action { name, .. } => {
                name
            }
        }
    }
}

/// Ordered, read-only set of card templates.
///
/// Every call to [`CardCatalog::fresh_deck`] hands out independent copies, so
/// mutating one room's deck never touches another room or the templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardCatalog {
    templates: Vec<Card>,
}

impl CardCatalog {
    /// The standard 27-card set: 20 money cards, 4 properties, 3 actions.
    pub fn standard() -> Self {
        let mut templates = Vec::with_capacity(27);
        templates.extend((0..10).map(|_| Card::money("Money 1M", 1)));
        templates.extend((0..10).map(|_| Card::money("Money 2M", 2)));

        templates.push(Card::property("Boardwalk", "blue"));
        templates.push(Card::property("Park Place", "blue"));
        templates.push(Card::property("Kentucky Avenue", "red"));
        templates.push(Card::property("Indiana Avenue", "red"));

        templates.push(Card::action("Rent Blue", "collect rent"));
        templates.push(Card::action("Rent Red", "collect rent"));
        templates.push(Card::action("Just Say No", "cancel action"));

        Self { templates }
    }

    /// Catalog over an arbitrary template list (small rooms in tests, custom decks).
    pub fn from_cards(templates: Vec<Card>) -> Self {
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> &[Card] {
        &self.templates
    }

    /// Unshuffled copy of every template, in catalog order.
    pub fn fresh_deck(&self) -> Vec<Card> {
        self.templates.clone()
    }
}

impl Default for CardCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
