//! Shared error helpers used across numberone crates.

pub mod error;

pub use error::FromMessage;
