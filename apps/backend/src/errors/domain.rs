//! Room-level error type.
//!
//! This error type is transport- and store-agnostic. Dispatcher code returns
//! `Result<T, crate::error::AppError>` and converts from `DomainError` using
//! the provided `From<DomainError> for AppError` implementation.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Failures raised by `GameRoom` mutations.
///
/// Out-of-range card indices and empty draws are not errors; those surface as
/// `None` from the respective operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// `add_player` for an id that already has a seat.
    DuplicatePlayer(String),
    /// Operation names a player the room does not know.
    UnknownPlayer(String),
    /// Turn rotation requested with an empty turn order.
    NoPlayers,
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::DuplicatePlayer(id) => write!(f, "player {id} already exists"),
            DomainError::UnknownPlayer(id) => write!(f, "unknown player {id}"),
            DomainError::NoPlayers => write!(f, "room has no players"),
        }
    }
}

impl Error for DomainError {}
