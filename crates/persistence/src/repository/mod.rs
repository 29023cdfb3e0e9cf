//! Repository implementations for database operations

pub mod clans;
pub mod players;
pub mod wars;

pub use clans::*;
pub use players::*;
pub use wars::*;
