//! WebSocket connection to the game server

pub mod handler;
pub mod protocol;

pub use handler::{
    Applied, Connection, ConnectionError, InboundStats, Inbound, InputSink, MessageHandler, PlayerRouting,
};
