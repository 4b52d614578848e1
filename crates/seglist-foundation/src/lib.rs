//! Grouped-list reconciliation engine for segmented, virtualized lists.
//!
//! Keeps a flat item list composed of variable-length named segments
//! (packs, "recent", "favorite", "trending" groups) synchronized with a
//! server-supplied authoritative ordering of segment ids, patching
//! incrementally instead of rebuilding whenever the diff allows it.
//!
//! # Architecture
//!
//! - [`SegmentTable`] - ordered segments with derived contiguous flat
//!   offsets; every mutation yields a [`RangeOp`] for the rendering layer
//! - [`PositionLocator`] - flat position → segment, via a "last touched"
//!   hint cache and directional walk
//! - [`reconcile`] - authoritative-order diff as removals + moves +
//!   trailing appends, with a [`ReconcileOutcome::FullReload`] escape
//!   hatch for anything else
//! - [`SegmentListState`] - public handle: single-flight sequential
//!   fetching of unknown segments, FIFO queueing of overlapping
//!   reconciliation requests, pinned-segment maintenance
//! - [`ScrollAnchorTracker`] - pixel offset to a segment's start, for
//!   viewport anchoring across mutations
//!
//! The engine is single-threaded and cooperative; collaborators marshal
//! fetch completions back onto its thread (see [`ContentSource`]).

mod anchor;
mod locator;
mod reconcile;
mod segment;
mod source;
mod state;
mod table;

pub use anchor::*;
pub use locator::*;
pub use reconcile::*;
pub use segment::*;
pub use source::*;
pub use state::*;
pub use table::*;
