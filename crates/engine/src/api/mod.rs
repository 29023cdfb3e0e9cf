//! Remote API clients

pub mod royale;

pub use royale::{Resource, RoyaleClient, DEFAULT_BASE_URL};
