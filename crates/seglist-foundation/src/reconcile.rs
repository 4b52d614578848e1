//! Server-order reconciliation.
//!
//! Diffs the table's current non-pinned id order against a new
//! authoritative order and applies it as removals + moves, with genuinely
//! new ids tolerated only as a trailing append. Anything else (a new id
//! in the middle, duplicate ids) downgrades the whole reconciliation to a
//! full reload instead of attempting a general edit-distance diff: real
//! updates are almost always an install/uninstall at an edge, and the
//! reload path already exists for the rare reorder the server does send.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::table::{RangeOp, SegmentTable};

/// Result of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The order was applied as removals and moves. `new_ids` lists the
    /// accepted-but-unknown ids, in their final relative order, whose
    /// content still has to be fetched and appended.
    Patched { new_ids: Vec<i64> },
    /// The diff is not expressible as remove + move + append. Removals
    /// have already been applied (they cannot conflict with insertion
    /// ordering); the caller must re-derive the whole list from the
    /// source of truth.
    FullReload,
}

/// Reconciles the non-pinned span of `table` against `new_order`,
/// emitting one [`RangeOp`] per applied mutation.
///
/// `new_order` lists Regular/Trending ids only; pinned segments are
/// maintained separately and are never part of this id stream.
pub fn reconcile(
    table: &mut SegmentTable,
    new_order: &[i64],
    mut emit: impl FnMut(RangeOp),
) -> ReconcileOutcome {
    let pinned = table.pinned_len();

    let mut current_by_id: FxHashSet<i64> = table.segments()[pinned..]
        .iter()
        .map(|seg| seg.id)
        .collect();

    let mut seen: FxHashSet<i64> = FxHashSet::default();
    let mut retained: SmallVec<[i64; 8]> = SmallVec::new();
    let mut new_ids: SmallVec<[i64; 8]> = SmallVec::new();
    let mut full_reload = false;
    let mut seen_new = false;

    for &id in new_order {
        if !seen.insert(id) {
            // Malformed input; treated as an inexpressible diff, never a
            // crash.
            log::debug!("duplicate id {id} in authoritative order");
            full_reload = true;
            continue;
        }
        if current_by_id.remove(&id) {
            if seen_new {
                // A known id after a new one: the new id's insertion point
                // is not a trailing append.
                full_reload = true;
            }
            retained.push(id);
        } else {
            seen_new = true;
            new_ids.push(id);
        }
    }

    // Ids absent from the new order are removals. These always apply,
    // full-reload decision or not.
    let mut index = pinned;
    while index < table.len() {
        let id = table.segments()[index].id;
        if current_by_id.contains(&id) {
            let (_, op) = table.remove(index);
            emit(op);
        } else {
            index += 1;
        }
    }

    if full_reload {
        log::debug!("authoritative order needs a full reload ({} ids)", new_order.len());
        return ReconcileOutcome::FullReload;
    }

    // Realize the retained order one move at a time. Targets are computed
    // against the already-reduced table; after step `target`, positions
    // 0..=target are final.
    for (target, &id) in retained.iter().enumerate() {
        let Some(current) = table.index_of_id(id) else {
            debug_assert!(false, "retained id {id} vanished from the table");
            continue;
        };
        let destination = pinned + target;
        if current != destination {
            emit(table.move_segment(current, destination));
        }
    }

    ReconcileOutcome::Patched {
        new_ids: new_ids.into_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::{Segment, SegmentKind, SYNTHETIC_SEGMENT_ID};

    fn table_with(ids: &[i64]) -> SegmentTable {
        let mut table = SegmentTable::new();
        table.insert(
            0,
            Segment::new(SYNTHETIC_SEGMENT_ID, SegmentKind::Recent, 2),
        );
        for (i, &id) in ids.iter().enumerate() {
            table.insert(i + 1, Segment::new(id, SegmentKind::Regular, 3));
        }
        table
    }

    fn regular_ids(table: &SegmentTable) -> Vec<i64> {
        table.segments()[table.pinned_len()..]
            .iter()
            .map(|seg| seg.id)
            .collect()
    }

    #[test]
    fn test_pure_removal() {
        let mut table = table_with(&[1, 2, 3]);
        let mut ops = Vec::new();
        let outcome = reconcile(&mut table, &[1, 3], |op| ops.push(op));
        assert_eq!(outcome, ReconcileOutcome::Patched { new_ids: vec![] });
        assert_eq!(regular_ids(&table), vec![1, 3]);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], RangeOp::Remove { .. }));
    }

    #[test]
    fn test_pure_append() {
        let mut table = table_with(&[1, 2]);
        let mut ops = Vec::new();
        let outcome = reconcile(&mut table, &[1, 2, 3], |op| ops.push(op));
        assert_eq!(outcome, ReconcileOutcome::Patched { new_ids: vec![3] });
        assert_eq!(regular_ids(&table), vec![1, 2]);
        assert!(ops.is_empty());
    }

    #[test]
    fn test_reorder_only() {
        let mut table = table_with(&[1, 2, 3]);
        let mut ops = Vec::new();
        let outcome = reconcile(&mut table, &[3, 1, 2], |op| ops.push(op));
        assert_eq!(outcome, ReconcileOutcome::Patched { new_ids: vec![] });
        assert_eq!(regular_ids(&table), vec![3, 1, 2]);
        assert!(ops.iter().all(|op| matches!(op, RangeOp::Move { .. })));
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_ambiguous_insertion_downgrades_to_full_reload() {
        let mut table = table_with(&[1, 2]);
        let outcome = reconcile(&mut table, &[1, 9, 2], |_| {});
        assert_eq!(outcome, ReconcileOutcome::FullReload);
        // Neither retained id was removed.
        assert_eq!(regular_ids(&table), vec![1, 2]);
    }

    #[test]
    fn test_removals_still_apply_under_full_reload() {
        let mut table = table_with(&[1, 2, 3]);
        let mut ops = Vec::new();
        let outcome = reconcile(&mut table, &[1, 9, 2], |op| ops.push(op));
        assert_eq!(outcome, ReconcileOutcome::FullReload);
        assert_eq!(regular_ids(&table), vec![1, 2]);
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], RangeOp::Remove { .. }));
    }

    #[test]
    fn test_duplicate_ids_downgrade_to_full_reload() {
        let mut table = table_with(&[1, 2]);
        let outcome = reconcile(&mut table, &[1, 2, 1], |_| {});
        assert_eq!(outcome, ReconcileOutcome::FullReload);
    }

    #[test]
    fn test_trailing_new_ids_after_moves() {
        let mut table = table_with(&[1, 2, 3]);
        let mut ops = Vec::new();
        let outcome = reconcile(&mut table, &[3, 1, 9, 10], |op| ops.push(op));
        assert_eq!(
            outcome,
            ReconcileOutcome::Patched {
                new_ids: vec![9, 10]
            }
        );
        // 2 removed, 3 moved ahead of 1, new ids left for fetching.
        assert_eq!(regular_ids(&table), vec![3, 1]);
    }

    #[test]
    fn test_pinned_segments_are_untouched() {
        let mut table = table_with(&[1, 2]);
        reconcile(&mut table, &[2], |_| {});
        assert_eq!(table.pinned_len(), 1);
        assert_eq!(table.segments()[0].kind, SegmentKind::Recent);
    }

    #[test]
    fn test_empty_order_removes_everything_non_pinned() {
        let mut table = table_with(&[1, 2]);
        let outcome = reconcile(&mut table, &[], |_| {});
        assert_eq!(outcome, ReconcileOutcome::Patched { new_ids: vec![] });
        assert!(regular_ids(&table).is_empty());
        assert_eq!(table.pinned_len(), 1);
    }
}
