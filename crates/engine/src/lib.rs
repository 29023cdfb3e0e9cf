//! Clan Sync Engine — remote fetch, reconciliation, and player statistics
//!
//! Provides:
//! - Royale API client for clan rosters and war logs
//! - On-disk payload cache to avoid redundant remote calls
//! - Reconciler bringing local rows in line with remote snapshots
//! - Aggregator for rolling per-player war totals
//! - Derived metrics (win ratio, donation ratio, idle days, ...)

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod metrics;
pub mod reconciler;
pub mod sync;
pub mod types;

use thiserror::Error;

// Re-exports for convenience
pub use aggregator::WarBatch;
pub use api::{Resource, RoyaleClient, DEFAULT_BASE_URL};
pub use cache::PayloadCache;
pub use metrics::PlayerReport;
pub use sync::{sync_all, sync_clan, SyncConfig, SyncSummary};
pub use types::{Member, MemberList, WarLog, WarLogEntry, WarParticipant};

/// Everything that can go wrong during a sync run.
///
/// RemoteFetch and MalformedPayload are fatal for the clan being processed;
/// Store errors are fatal for the run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote API error {status}: {body}")]
    RemoteFetch { status: u16, body: String },

    #[error("Malformed {resource} payload: {source}")]
    MalformedPayload {
        resource: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Cache I/O error: {0}")]
    Cache(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] persistence::DbError),
}

pub type SyncResult<T> = Result<T, SyncError>;
