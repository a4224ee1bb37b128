//! HTTP collaborators of the game server

pub mod register;

#[cfg(test)]
pub(crate) mod test_support;

pub use register::{Registration, RegistrationClient};
