//! Ordered segment table with derived flat offsets.
//!
//! [`SegmentTable`] owns the segment sequence and keeps every segment's
//! `start_index` contiguous across mutations. Each mutation returns the
//! equivalent flat-list [`RangeOp`]; forwarding those ops to the rendering
//! layer is the only way the engine communicates list changes; the table
//! never touches rendering state.

use crate::segment::Segment;

/// Flat-list mutation descriptor, expressed in flat positions and slot
/// counts. The external item list applies these verbatim to its own
/// backing store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeOp {
    Insert {
        start: u32,
        len: u32,
    },
    Remove {
        start: u32,
        len: u32,
    },
    /// `from`/`to` are the segment's flat start before and after the move.
    Move {
        from: u32,
        to: u32,
        len: u32,
    },
    /// `old_len`/`new_len` are flat slot counts (header included).
    Resize {
        segment_id: i64,
        old_len: u32,
        new_len: u32,
    },
}

/// Ordered sequence of segments with contiguous derived offsets.
///
/// Invariants:
/// - pinned segments precede all Regular/Trending segments,
/// - `segments[i+1].start_index == segments[i].start_index + segments[i].item_count()`,
/// - ids are unique within the non-pinned span.
#[derive(Clone, Debug, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, segment_index: usize) -> Option<&Segment> {
        self.segments.get(segment_index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total flat slots across all segments.
    pub fn flat_len(&self) -> u32 {
        self.segments
            .last()
            .map(|seg| seg.start_index() + seg.item_count())
            .unwrap_or(0)
    }

    /// Number of leading pinned segments; the non-pinned span starts here.
    pub fn pinned_len(&self) -> usize {
        self.segments
            .iter()
            .take_while(|seg| seg.kind.is_pinned())
            .count()
    }

    /// Index of the first non-pinned segment with the given id.
    pub fn index_of_id(&self, id: i64) -> Option<usize> {
        let pinned = self.pinned_len();
        (pinned..self.segments.len()).find(|&i| self.segments[i].id == id)
    }

    /// Inserts a segment at a segment index (not a flat position) and
    /// reindexes it plus every following segment.
    pub fn insert(&mut self, at_segment_index: usize, segment: Segment) -> RangeOp {
        assert!(
            at_segment_index <= self.segments.len(),
            "insert index {} out of bounds for {} segments",
            at_segment_index,
            self.segments.len()
        );
        let len = segment.item_count();
        self.segments.insert(at_segment_index, segment);
        self.reindex(at_segment_index, self.segments.len() - 1);
        let start = self.segments[at_segment_index].start_index();
        self.check_offsets();
        RangeOp::Insert { start, len }
    }

    /// Removes and returns the segment, reindexing everything after it.
    pub fn remove(&mut self, segment_index: usize) -> (Segment, RangeOp) {
        let segment = self.segments.remove(segment_index);
        if segment_index < self.segments.len() {
            self.reindex(segment_index, self.segments.len() - 1);
        }
        self.check_offsets();
        let op = RangeOp::Remove {
            start: segment.start_index(),
            len: segment.item_count(),
        };
        (segment, op)
    }

    /// Relocates a segment to a new segment index (interpreted against the
    /// table after the removal). Only the span between the two locations
    /// changes offsets.
    pub fn move_segment(&mut self, from: usize, to: usize) -> RangeOp {
        assert!(from < self.segments.len() && to < self.segments.len());
        let from_flat = self.segments[from].start_index();
        let len = self.segments[from].item_count();
        let segment = self.segments.remove(from);
        self.segments.insert(to, segment);
        self.reindex(from.min(to), from.max(to));
        let to_flat = self.segments[to].start_index();
        self.check_offsets();
        RangeOp::Move {
            from: from_flat,
            to: to_flat,
            len,
        }
    }

    /// Updates a segment's size in place, reindexing everything after it.
    pub fn resize(&mut self, segment_index: usize, new_size: u32) -> RangeOp {
        let old_len = self.segments[segment_index].item_count();
        let segment_id = self.segments[segment_index].id;
        self.segments[segment_index].set_size(new_size);
        let new_len = self.segments[segment_index].item_count();
        if segment_index + 1 < self.segments.len() {
            self.reindex(segment_index + 1, self.segments.len() - 1);
        }
        self.check_offsets();
        RangeOp::Resize {
            segment_id,
            old_len,
            new_len,
        }
    }

    /// Recomputes `start_index` for the inclusive span, walking forward
    /// once from the predecessor of `from`.
    fn reindex(&mut self, from: usize, to_inclusive: usize) {
        let mut next = if from == 0 {
            0
        } else {
            let prev = &self.segments[from - 1];
            prev.start_index() + prev.item_count()
        };
        for segment in &mut self.segments[from..=to_inclusive] {
            segment.set_start_index(next);
            next += segment.item_count();
        }
    }

    /// Compares the incrementally maintained offsets against a full
    /// recomputation. Drift is a programming error: hard failure in debug
    /// builds, logged and corrected in release builds.
    fn check_offsets(&mut self) {
        let mut expected = 0u32;
        let mut drift = None;
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.start_index() != expected {
                drift = Some((i, segment.start_index(), expected));
                break;
            }
            expected += segment.item_count();
        }
        let Some((index, actual, expected)) = drift else {
            return;
        };
        if cfg!(debug_assertions) {
            panic!(
                "segment offset drift at index {index}: start_index {actual}, recomputed {expected}"
            );
        }
        log::error!(
            "segment offset drift at index {index} (start_index {actual}, recomputed {expected}); forcing full reindex"
        );
        if !self.segments.is_empty() {
            self.reindex(0, self.segments.len() - 1);
        }
    }
}
