//! Shared helpers for dealroom tests: logging, isolated room ids and
//! assertions over JSON events as clients see them.

pub mod events;
pub mod logging;
pub mod rooms;
