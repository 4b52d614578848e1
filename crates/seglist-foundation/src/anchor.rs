//! Scroll anchor offsets.
//!
//! Computes the pixel distance from the top of the list to the start of a
//! segment, so the caller can keep the same segment under the viewport
//! across insert/remove/move operations. Stateless given the table and
//! the height oracle; recomputed on demand and never cached, since anchor
//! queries are rare relative to mutations.

use crate::source::HeightOracle;
use crate::table::SegmentTable;

/// On-demand anchor offset calculator over a [`SegmentTable`].
pub struct ScrollAnchorTracker<'a> {
    table: &'a SegmentTable,
    heights: &'a dyn HeightOracle,
}

impl<'a> ScrollAnchorTracker<'a> {
    pub fn new(table: &'a SegmentTable, heights: &'a dyn HeightOracle) -> Self {
        Self { table, heights }
    }

    /// Sum of item heights for every flat position before the segment's
    /// start. An index one past the last segment yields the full list
    /// height; anything further is clamped to it.
    pub fn offset_for(&self, segment_index: usize) -> u32 {
        let end = self
            .table
            .get(segment_index)
            .map(|seg| seg.start_index())
            .unwrap_or_else(|| self.table.flat_len());
        (0..end).map(|pos| self.heights.height_of(pos)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, SegmentKind};

    struct Fixed(u32);

    impl HeightOracle for Fixed {
        fn height_of(&self, _flat_position: u32) -> u32 {
            self.0
        }
    }

    struct PerPosition(Vec<u32>);

    impl HeightOracle for PerPosition {
        fn height_of(&self, flat_position: u32) -> u32 {
            self.0[flat_position as usize]
        }
    }

    fn table() -> SegmentTable {
        let mut table = SegmentTable::new();
        table.insert(0, Segment::new(1, SegmentKind::Regular, 2)); // slots 0..3
        table.insert(1, Segment::new(2, SegmentKind::Regular, 1)); // slots 3..5
        table
    }

    #[test]
    fn test_offset_scales_with_start_index() {
        let table = table();
        let heights = Fixed(10);
        let tracker = ScrollAnchorTracker::new(&table, &heights);
        assert_eq!(tracker.offset_for(0), 0);
        assert_eq!(tracker.offset_for(1), 30);
        assert_eq!(tracker.offset_for(2), 50); // past the end: full height
    }

    #[test]
    fn test_offset_uses_per_item_heights() {
        let table = table();
        let heights = PerPosition(vec![40, 8, 8, 40, 8]);
        let tracker = ScrollAnchorTracker::new(&table, &heights);
        assert_eq!(tracker.offset_for(1), 56);
    }
}
