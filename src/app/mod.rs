//! Session wiring: client state, keyboard adapter and the driving loop

pub mod keyboard;
pub mod reconnect;
pub mod session;
pub mod state;

pub use session::Session;
