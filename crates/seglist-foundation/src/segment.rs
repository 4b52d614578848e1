//! Segment value types.
//!
//! A segment is one named, contiguous run of items in the flat list
//! (e.g. one sticker pack, or the synthetic "recent" group). The engine
//! only manipulates identifiers, sizes, and flat positions; what a
//! segment renders as is the collaborator's concern.

use std::ops::Range;

/// Reserved id for synthetic segments (recents, favorites, group sets)
/// that have no server-side identity.
pub const SYNTHETIC_SEGMENT_ID: i64 = 0;

/// Mutually exclusive segment classification.
///
/// Pinned kinds (`System`, `Recent`, `Favorite`) sit ahead of every
/// `Regular`/`Trending` segment in a fixed relative order and are never
/// part of server-order reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    System,
    Recent,
    Favorite,
    Trending,
    Regular,
}

impl SegmentKind {
    /// Pinned kinds are maintained by direct content pushes, not by the
    /// authoritative id order.
    pub fn is_pinned(self) -> bool {
        matches!(
            self,
            SegmentKind::System | SegmentKind::Recent | SegmentKind::Favorite
        )
    }

    /// Fixed relative order of the pinned block: System < Recent < Favorite.
    pub(crate) fn pinned_rank(self) -> Option<usize> {
        match self {
            SegmentKind::System => Some(0),
            SegmentKind::Recent => Some(1),
            SegmentKind::Favorite => Some(2),
            SegmentKind::Trending | SegmentKind::Regular => None,
        }
    }
}

/// One named, contiguous run of items in the flat list.
///
/// `size` counts content items only; the header/anchor item, when present,
/// adds one flat slot on top of it. `start_index` is derived state owned
/// by [`SegmentTable`](crate::SegmentTable) and kept contiguous across
/// mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Stable identity across reconciliations. [`SYNTHETIC_SEGMENT_ID`]
    /// for segments without a server id.
    pub id: i64,
    /// Classification; decides pinning and reconciliation eligibility.
    pub kind: SegmentKind,
    size: u32,
    start_index: u32,
    headless: bool,
}

impl Segment {
    /// Creates a headered segment. `start_index` is assigned by the table
    /// on insertion.
    pub fn new(id: i64, kind: SegmentKind, size: u32) -> Self {
        Self {
            id,
            kind,
            size,
            start_index: 0,
            headless: false,
        }
    }

    /// Creates a segment that renders no header row and therefore
    /// contributes exactly `size` flat slots.
    pub fn headless(id: i64, kind: SegmentKind, size: u32) -> Self {
        Self {
            headless: true,
            ..Self::new(id, kind, size)
        }
    }

    /// Number of content items, excluding the header.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Flat index of the segment's header/anchor item (first item for
    /// headless segments).
    pub fn start_index(&self) -> u32 {
        self.start_index
    }

    /// Whether this segment contributes a header slot.
    pub fn has_header(&self) -> bool {
        !self.headless
    }

    /// Flat slots this segment occupies: `size + 1` for headered
    /// segments, `size` for headless ones.
    pub fn item_count(&self) -> u32 {
        if self.headless {
            self.size
        } else {
            self.size + 1
        }
    }

    /// The half-open flat range `[start_index, start_index + item_count())`.
    pub fn flat_range(&self) -> Range<u32> {
        self.start_index..self.start_index + self.item_count()
    }

    /// Whether the flat position falls inside this segment.
    pub fn contains(&self, flat_position: u32) -> bool {
        self.flat_range().contains(&flat_position)
    }

    pub(crate) fn set_size(&mut self, size: u32) {
        self.size = size;
    }

    pub(crate) fn set_start_index(&mut self, start_index: u32) {
        self.start_index = start_index;
    }
}

/// Resolved content of a segment, as produced by a
/// [`ContentSource`](crate::ContentSource) fetch or a full reload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentContent {
    pub id: i64,
    pub kind: SegmentKind,
    pub size: u32,
}

impl SegmentContent {
    /// A regular pack's content.
    pub fn regular(id: i64, size: u32) -> Self {
        Self {
            id,
            kind: SegmentKind::Regular,
            size,
        }
    }

    /// A trending pack's content.
    pub fn trending(id: i64, size: u32) -> Self {
        Self {
            id,
            kind: SegmentKind::Trending,
            size,
        }
    }
}
