//! Error codes for the dealroom backend.
//!
//! Add new codes here; never pass ad-hoc strings as error codes.
//! All codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings that appear
//! in HTTP problem responses and logs.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Turn and command validation
    /// Turn-gated command from a player whose turn it is not
    NotYourTurn,
    /// Card index outside the player's hand
    InvalidCardIndex,
    /// Malformed or unsupported inbound message
    BadRequest,

    // Room membership
    /// Player id already seated
    DuplicatePlayer,
    /// Player id not seated in the room
    UnknownPlayer,
    /// Room has no players yet
    NoPlayers,

    // Concurrency
    /// Snapshot changed between load and compare-and-save
    OptimisticLock,

    // System errors
    /// Shared store unreachable or failed mid-command
    StoreUnavailable,
    /// Shared bus unreachable
    BusUnavailable,
    /// Persisted snapshot or bus payload could not be decoded
    DataCorruption,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotYourTurn => "NOT_YOUR_TURN",
            Self::InvalidCardIndex => "INVALID_CARD_INDEX",
            Self::BadRequest => "BAD_REQUEST",

            Self::DuplicatePlayer => "DUPLICATE_PLAYER",
            Self::UnknownPlayer => "UNKNOWN_PLAYER",
            Self::NoPlayers => "NO_PLAYERS",

            Self::OptimisticLock => "OPTIMISTIC_LOCK",

            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::BusUnavailable => "BUS_UNAVAILABLE",
            Self::DataCorruption => "DATA_CORRUPTION",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
