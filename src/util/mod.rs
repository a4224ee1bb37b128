//! Shared helpers

pub mod backoff;
pub mod hash;
pub mod time;
