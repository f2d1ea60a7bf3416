//! Realtime layer: wire protocol, local connection hub, shared bus and
//! the per-connection websocket actor.

pub mod broker;
pub mod bus;
pub mod hub;
pub mod protocol;
pub mod session;
