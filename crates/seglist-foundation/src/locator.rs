//! Flat position → owning segment resolution.
//!
//! Scroll-driven queries are almost always adjacent to the previous one,
//! so [`PositionLocator`] keeps a single-entry "last touched" cache and
//! walks one segment at a time in the implied direction. A cold or
//! invalidated cache degrades to a linear scan from the front. This is a
//! hint, not an index structure: O(1) amortized under locality, O(segments)
//! worst case, which is fine at tens of segments.

use std::ops::Range;

use crate::table::SegmentTable;

/// Last resolved segment and its flat range. The range is only trusted
/// while `stale` is false; a stale entry keeps `segment_index` as a walk
/// starting hint and nothing more.
#[derive(Clone, Debug)]
struct PositionCache {
    segment_index: usize,
    range: Range<u32>,
    stale: bool,
}

/// Hint-cached position resolver over a [`SegmentTable`].
#[derive(Debug, Default)]
pub struct PositionLocator {
    cache: Option<PositionCache>,
}

impl PositionLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the segment owning `flat_position`, or `None` when the
    /// position is past the end of the list.
    ///
    /// Position 0 is the list's fixed top item and always resolves to the
    /// first segment without consulting the cache.
    pub fn segment_for_position(
        &mut self,
        table: &SegmentTable,
        flat_position: u32,
    ) -> Option<usize> {
        if table.is_empty() {
            return None;
        }
        if flat_position == 0 {
            return Some(0);
        }
        if let Some(cache) = &self.cache {
            if !cache.stale && cache.range.contains(&flat_position) {
                return Some(cache.segment_index);
            }
        }
        // Stale or missing entries start the walk at the remembered index,
        // re-validated against the live table before being trusted.
        let hint = self
            .cache
            .as_ref()
            .map(|cache| cache.segment_index.min(table.len() - 1))
            .unwrap_or(0);
        let found = walk_from(table, hint, flat_position);
        if let Some(segment_index) = found {
            if let Some(segment) = table.get(segment_index) {
                self.cache = Some(PositionCache {
                    segment_index,
                    range: segment.flat_range(),
                    stale: false,
                });
            }
        }
        found
    }

    /// Marks the cache stale after a table mutation at
    /// `first_changed_segment`. Offsets at or after that index may have
    /// moved, so a cached entry there can no longer be trusted; entries
    /// strictly before it are untouched.
    pub fn invalidate_from(&mut self, first_changed_segment: usize) {
        if let Some(cache) = &mut self.cache {
            if cache.segment_index >= first_changed_segment {
                cache.stale = true;
            }
        }
    }

    /// Drops the cache entirely, hint included.
    pub fn clear(&mut self) {
        self.cache = None;
    }
}

/// Walks one segment at a time from `start` toward `flat_position`,
/// re-testing each segment's flat range. Starting at 0 this is the plain
/// linear scan.
fn walk_from(table: &SegmentTable, start: usize, flat_position: u32) -> Option<usize> {
    let mut index = start;
    loop {
        let range = table.get(index)?.flat_range();
        if flat_position < range.start {
            index = index.checked_sub(1)?;
        } else if flat_position >= range.end {
            index += 1;
            if index >= table.len() {
                return None;
            }
        } else {
            return Some(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, SegmentKind};

    fn table(sizes: &[u32]) -> SegmentTable {
        let mut table = SegmentTable::new();
        for (i, &size) in sizes.iter().enumerate() {
            table.insert(i, Segment::new(i as i64 + 1, SegmentKind::Regular, size));
        }
        table
    }

    /// Ground truth by definition: the unique segment whose flat range
    /// contains the position.
    fn scan(table: &SegmentTable, position: u32) -> Option<usize> {
        table
            .segments()
            .iter()
            .position(|seg| seg.contains(position))
    }

    #[test]
    fn test_cold_cache_resolves_by_linear_scan() {
        let table = table(&[2, 3, 4]); // flat ranges 0..3, 3..7, 7..12
        let mut locator = PositionLocator::new();
        assert_eq!(locator.segment_for_position(&table, 8), Some(2));
        assert_eq!(locator.segment_for_position(&table, 3), Some(1));
    }

    #[test]
    fn test_position_zero_bypasses_cache() {
        let table = table(&[2, 3]);
        let mut locator = PositionLocator::new();
        let _ = locator.segment_for_position(&table, 5);
        assert_eq!(locator.segment_for_position(&table, 0), Some(0));
    }

    #[test]
    fn test_warm_cache_walks_directionally() {
        let table = table(&[2, 3, 4, 1]);
        let mut locator = PositionLocator::new();
        // Warm the cache in the middle, then query both neighbors.
        assert_eq!(locator.segment_for_position(&table, 4), Some(1));
        assert_eq!(locator.segment_for_position(&table, 7), Some(2));
        assert_eq!(locator.segment_for_position(&table, 1), Some(0));
    }

    #[test]
    fn test_out_of_range_positions() {
        let table = table(&[2, 3]);
        let mut locator = PositionLocator::new();
        assert_eq!(locator.segment_for_position(&table, 7), None);
        assert_eq!(
            locator.segment_for_position(&SegmentTable::new(), 0),
            None
        );
    }

    #[test]
    fn test_stale_hint_is_revalidated() {
        let mut table = table(&[2, 3, 4]);
        let mut locator = PositionLocator::new();
        assert_eq!(locator.segment_for_position(&table, 10), Some(2));

        // Grow the first segment; every offset after it shifts.
        table.resize(0, 6);
        locator.invalidate_from(1);

        // Position 10 now belongs to segment 1 (ranges 0..7, 7..11, 11..16).
        assert_eq!(locator.segment_for_position(&table, 10), Some(1));
        for pos in 0..table.flat_len() {
            assert_eq!(
                locator.segment_for_position(&table, pos),
                scan(&table, pos),
                "position {pos}"
            );
        }
    }

    #[test]
    fn test_mutation_after_cached_segment_keeps_cache() {
        let mut table = table(&[2, 3, 4]);
        let mut locator = PositionLocator::new();
        assert_eq!(locator.segment_for_position(&table, 4), Some(1));

        table.resize(2, 9);
        locator.invalidate_from(2);

        assert_eq!(locator.segment_for_position(&table, 4), Some(1));
    }

    #[test]
    fn test_locator_matches_scan_for_all_positions() {
        let table = table(&[1, 0, 5, 2, 3]);
        let mut locator = PositionLocator::new();
        for pos in 0..table.flat_len() {
            assert_eq!(
                locator.segment_for_position(&table, pos),
                scan(&table, pos),
                "position {pos}"
            );
        }
        // And again in reverse, exercising the backward walk.
        for pos in (0..table.flat_len()).rev() {
            assert_eq!(
                locator.segment_for_position(&table, pos),
                scan(&table, pos),
                "position {pos}"
            );
        }
    }
}
