//! Collaborator contracts.
//!
//! The engine is a library component; these traits are the seams it
//! consumes. Fetches are callback-shaped rather than `async` so the
//! engine stays runtime-agnostic: the collaborator dispatches the request
//! however it likes and marshals the completion back onto the engine's
//! thread before invoking the callback.

use thiserror::Error;

use crate::segment::SegmentContent;

/// Why a segment's content could not be retrieved.
///
/// Individual failures are absorbed by the coordinator (the id is skipped
/// and logged); they never abort a batch or poison later submissions.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("segment {0} does not exist upstream")]
    NotFound(i64),
    #[error("segment fetch failed: {0}")]
    Transport(String),
}

/// Completion callback for a segment fetch, invoked exactly once on the
/// engine's thread.
pub type FetchCallback = Box<dyn FnOnce(Result<SegmentContent, FetchError>)>;

/// Resolves a segment id into its size and metadata.
pub trait ContentSource {
    fn fetch_segment(&self, id: i64, on_complete: FetchCallback);
}

/// Supplies per-item pixel heights; item heights are a UI concern, so the
/// engine only ever asks.
pub trait HeightOracle {
    fn height_of(&self, flat_position: u32) -> u32;
}
