#![allow(dead_code)]

pub mod server;
pub mod websocket_client;
