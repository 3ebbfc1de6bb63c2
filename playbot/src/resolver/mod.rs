//! Track resolution
//!
//! A [`TrackResolver`] turns a user reference (URL or search query) into a
//! title, a canonical reference and a short-lived stream locator. Resolvers
//! are async so that one session waiting on the network never holds up
//! another.

pub mod ytdlp;

use crate::error::ResolutionError;
use async_trait::async_trait;
use playbot_common::TrackInfo;
use std::time::Duration;

pub use ytdlp::YtDlpResolver;

/// Resolves references into playable tracks
///
/// When a reference names a collection, implementations return only the
/// first item of the expansion.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<TrackInfo, ResolutionError>;
}

/// Resolve with an upper bound on latency
///
/// A resolver that hangs past `limit` yields [`ResolutionError::Timeout`],
/// which callers treat like any other resolution failure.
pub async fn resolve_bounded(
    resolver: &dyn TrackResolver,
    reference: &str,
    limit: Duration,
) -> Result<TrackInfo, ResolutionError> {
    match tokio::time::timeout(limit, resolver.resolve(reference)).await {
        Ok(result) => result,
        Err(_) => Err(ResolutionError::Timeout(limit)),
    }
}
