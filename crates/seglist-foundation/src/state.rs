//! Segment list state and fetch coordination.
//!
//! [`SegmentListState`] is the engine's public handle: it owns the
//! [`SegmentTable`] and [`PositionLocator`], runs reconciliations, and
//! serializes the asynchronous part behind a single-flight gate. Exactly
//! one fetch is outstanding at any time; authoritative orders arriving
//! while a batch is draining queue FIFO and replay once the batch ends.
//!
//! Everything here is single-threaded and cooperative: state lives in an
//! `Rc<RefCell<...>>`, fetch completions are marshaled back onto this thread
//! by the [`ContentSource`], and listeners are invoked after the borrow is
//! released so they may re-enter freely.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::anchor::ScrollAnchorTracker;
use crate::locator::PositionLocator;
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::segment::{Segment, SegmentContent, SegmentKind, SYNTHETIC_SEGMENT_ID};
use crate::source::{ContentSource, FetchError, HeightOracle};
use crate::table::{RangeOp, SegmentTable};

/// What `submit` did with an authoritative order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Reconciled synchronously; nothing left to fetch.
    Applied,
    /// Reconciled; a fetch batch for the new ids is now draining.
    Fetching,
    /// A batch was already active; the order was queued.
    Queued,
    /// The diff was not expressible: the caller must re-derive the list
    /// and push it through [`SegmentListState::apply_full_reload`].
    FullReloadNeeded,
}

/// One reconciliation's set of pending content fetches, drained
/// sequentially by a cursor.
struct FetchBatch {
    ids: Vec<i64>,
    cursor: usize,
}

struct SegmentListInner {
    table: SegmentTable,
    locator: PositionLocator,
    source: Rc<dyn ContentSource>,
    heights: Rc<dyn HeightOracle>,
    /// Deferred authoritative orders, oldest first. Deliberately not
    /// coalesced: each queued order may reflect state the caller already
    /// rendered optimistically.
    pending_orders: VecDeque<Vec<i64>>,
    batch: Option<FetchBatch>,
    /// True while a reconciliation is mid-flight (including its listener
    /// notifications, which run before the fetch batch exists). Re-entrant
    /// submissions queue behind this just as they do behind a batch.
    reconciling: bool,
    /// Bumped by a full reload; completions carrying an older epoch are
    /// dropped instead of resurrecting segments the reload replaced.
    epoch: u64,
    op_listeners: Vec<(u64, Rc<dyn Fn(&RangeOp)>)>,
    reload_listeners: Vec<(u64, Rc<dyn Fn()>)>,
    next_listener_id: u64,
}

type Ops = SmallVec<[RangeOp; 4]>;

/// Shared handle over the engine state. Clones refer to the same list.
#[derive(Clone)]
pub struct SegmentListState {
    inner: Rc<RefCell<SegmentListInner>>,
}

impl SegmentListState {
    pub fn new(source: Rc<dyn ContentSource>, heights: Rc<dyn HeightOracle>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SegmentListInner {
                table: SegmentTable::new(),
                locator: PositionLocator::new(),
                source,
                heights,
                pending_orders: VecDeque::new(),
                batch: None,
                reconciling: false,
                epoch: 0,
                op_listeners: Vec::new(),
                reload_listeners: Vec::new(),
                next_listener_id: 1,
            })),
        }
    }

    // ── Submission and fetch coordination ────────────────────────────────

    /// Accepts a new authoritative id order for the non-pinned span.
    ///
    /// Idle: reconciles immediately and, if unknown ids were accepted,
    /// starts the sequential fetch batch. Busy: queues the order behind
    /// the active batch; it replays once the batch drains.
    pub fn submit(&self, new_order: Vec<i64>) -> SubmitOutcome {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.batch.is_some() || inner.reconciling {
                log::debug!(
                    "reconciliation active; queueing order of {} ids ({} already queued)",
                    new_order.len(),
                    inner.pending_orders.len()
                );
                inner.pending_orders.push_back(new_order);
                return SubmitOutcome::Queued;
            }
        }
        let outcome = self.reconcile_idle(&new_order);
        // Listeners may have queued re-entrant orders; replay them now
        // unless a fetch batch took over the drain.
        if !self.is_busy() {
            self.drain_pending();
        }
        outcome
    }

    /// Runs one reconciliation while no batch is active. The `reconciling`
    /// flag stays raised until either the fetch batch is installed or the
    /// outcome is final, so the single-flight gate has no window in which
    /// a re-entrant listener could start a second reconciliation.
    fn reconcile_idle(&self, new_order: &[i64]) -> SubmitOutcome {
        let (outcome, ops) = {
            let mut inner = self.inner.borrow_mut();
            inner.reconciling = true;
            let SegmentListInner { table, locator, .. } = &mut *inner;
            let mut ops = Ops::new();
            let outcome = reconcile(table, new_order, |op| ops.push(op));
            // Reconciliation only mutates the non-pinned span.
            locator.invalidate_from(table.pinned_len());
            (outcome, ops)
        };
        self.notify_ops(&ops);
        match outcome {
            ReconcileOutcome::FullReload => {
                {
                    let mut inner = self.inner.borrow_mut();
                    inner.pending_orders.clear();
                    inner.epoch += 1;
                    inner.reconciling = false;
                }
                self.notify_reload_needed();
                SubmitOutcome::FullReloadNeeded
            }
            ReconcileOutcome::Patched { new_ids } if new_ids.is_empty() => {
                self.inner.borrow_mut().reconciling = false;
                SubmitOutcome::Applied
            }
            ReconcileOutcome::Patched { new_ids } => {
                {
                    // Hand the gate from the flag to the batch in one
                    // borrow; there is never a gap between the two.
                    let mut inner = self.inner.borrow_mut();
                    inner.batch = Some(FetchBatch {
                        ids: new_ids,
                        cursor: 0,
                    });
                    inner.reconciling = false;
                }
                self.issue_next_fetch();
                SubmitOutcome::Fetching
            }
        }
    }

    /// Issues the fetch at the batch cursor. Never more than one request
    /// is in flight; the next one is issued only from the completion of
    /// the previous.
    fn issue_next_fetch(&self) {
        let (id, epoch, source) = {
            let inner = self.inner.borrow();
            let Some(batch) = &inner.batch else { return };
            (
                batch.ids[batch.cursor],
                inner.epoch,
                Rc::clone(&inner.source),
            )
        };
        let state = self.clone();
        source.fetch_segment(
            id,
            Box::new(move |result| state.fetch_completed(epoch, id, result)),
        );
    }

    /// Applies one fetch result and advances the batch.
    fn fetch_completed(&self, epoch: u64, id: i64, result: Result<SegmentContent, FetchError>) {
        let mut ops = Ops::new();
        let batch_done = {
            let mut inner = self.inner.borrow_mut();
            if inner.epoch != epoch {
                log::debug!("dropping stale fetch completion for segment {id}");
                return;
            }
            let done = match inner.batch.as_mut() {
                None => return,
                Some(batch) => {
                    debug_assert_eq!(batch.ids.get(batch.cursor), Some(&id));
                    batch.cursor += 1;
                    batch.cursor == batch.ids.len()
                }
            };
            match result {
                Ok(content) if content.size > 0 => {
                    // Accepted new ids are a contiguous tail run, so each
                    // resolved segment lands at the current end of the
                    // table; batch mutual exclusion keeps that index valid
                    // across the whole drain.
                    let at = inner.table.len();
                    let kind = if content.kind.is_pinned() {
                        debug_assert!(false, "fetched segment {id} claims a pinned kind");
                        SegmentKind::Regular
                    } else {
                        content.kind
                    };
                    let segment = Segment::new(content.id, kind, content.size);
                    ops.push(inner.table.insert(at, segment));
                    inner.locator.invalidate_from(at);
                }
                Ok(content) => {
                    log::debug!("segment {} resolved with no items; skipping", content.id);
                }
                Err(err) => {
                    log::warn!("fetch for segment {id} failed: {err}; skipping");
                }
            }
            if done {
                inner.batch = None;
            }
            done
        };
        self.notify_ops(&ops);
        if batch_done {
            self.drain_pending();
        } else {
            self.issue_next_fetch();
        }
    }

    /// Replays queued orders, oldest first, until one starts a new batch,
    /// one downgrades to a full reload, or the queue is empty.
    fn drain_pending(&self) {
        loop {
            let next = self.inner.borrow_mut().pending_orders.pop_front();
            let Some(order) = next else { return };
            match self.reconcile_idle(&order) {
                SubmitOutcome::Fetching | SubmitOutcome::FullReloadNeeded => return,
                SubmitOutcome::Applied | SubmitOutcome::Queued => {}
            }
        }
    }

    /// Whether a fetch batch is currently draining.
    pub fn is_busy(&self) -> bool {
        self.inner.borrow().batch.is_some()
    }

    /// Number of authoritative orders waiting behind the active batch.
    pub fn pending_order_count(&self) -> usize {
        self.inner.borrow().pending_orders.len()
    }

    // ── Direct content pushes ────────────────────────────────────────────

    /// Applies a "pinned content changed" push (recents updated, favorites
    /// changed, a chat's own set appearing): creates the pinned segment at
    /// its canonical slot, resizes it in place, or removes it when `size`
    /// is 0. Pinned segments never take part in order reconciliation.
    pub fn set_pinned(&self, kind: SegmentKind, size: u32) {
        self.apply_pinned(kind, size, true);
    }

    /// Like [`set_pinned`](Self::set_pinned), but the segment renders no
    /// header row and occupies exactly `size` flat slots.
    pub fn set_pinned_headless(&self, kind: SegmentKind, size: u32) {
        self.apply_pinned(kind, size, false);
    }

    fn apply_pinned(&self, kind: SegmentKind, size: u32, has_header: bool) {
        assert!(kind.is_pinned(), "set_pinned called with {kind:?}");
        let make = |size| {
            if has_header {
                Segment::new(SYNTHETIC_SEGMENT_ID, kind, size)
            } else {
                Segment::headless(SYNTHETIC_SEGMENT_ID, kind, size)
            }
        };
        let mut ops = Ops::new();
        {
            let mut inner = self.inner.borrow_mut();
            let existing = inner
                .table
                .segments()
                .iter()
                .position(|seg| seg.kind == kind);
            match existing {
                Some(index) if size == 0 => {
                    let (_, op) = inner.table.remove(index);
                    ops.push(op);
                    inner.locator.invalidate_from(index);
                }
                Some(index) if inner.table.segments()[index].has_header() != has_header => {
                    // Header style changed: replace in place.
                    let (_, op) = inner.table.remove(index);
                    ops.push(op);
                    ops.push(inner.table.insert(index, make(size)));
                    inner.locator.invalidate_from(index);
                }
                Some(index) => {
                    if inner.table.segments()[index].size() != size {
                        ops.push(inner.table.resize(index, size));
                        inner.locator.invalidate_from(index);
                    }
                }
                None if size == 0 => {}
                None => {
                    let rank = kind.pinned_rank();
                    let at = inner
                        .table
                        .segments()
                        .iter()
                        .take_while(|seg| seg.kind.is_pinned() && seg.kind.pinned_rank() < rank)
                        .count();
                    ops.push(inner.table.insert(at, make(size)));
                    inner.locator.invalidate_from(at);
                }
            }
        }
        self.notify_ops(&ops);
    }

    /// Replaces the whole non-pinned span with freshly derived contents:
    /// the caller's reaction to a [`SubmitOutcome::FullReloadNeeded`].
    ///
    /// Clears the pending queue, abandons the active batch, and
    /// invalidates any still-in-flight completions.
    pub fn apply_full_reload(&self, packs: &[SegmentContent]) {
        let mut ops = Ops::new();
        {
            let mut inner = self.inner.borrow_mut();
            inner.epoch += 1;
            inner.batch = None;
            inner.pending_orders.clear();
            let pinned = inner.table.pinned_len();
            while inner.table.len() > pinned {
                let last = inner.table.len() - 1;
                let (_, op) = inner.table.remove(last);
                ops.push(op);
            }
            for content in packs {
                if content.size == 0 || content.kind.is_pinned() {
                    continue;
                }
                let at = inner.table.len();
                let segment = Segment::new(content.id, content.kind, content.size);
                ops.push(inner.table.insert(at, segment));
            }
            inner.locator.invalidate_from(pinned);
        }
        self.notify_ops(&ops);
    }

    // ── Queries ──────────────────────────────────────────────────────────

    /// Resolves a flat position to its owning segment index.
    pub fn segment_for_position(&self, flat_position: u32) -> Option<usize> {
        let mut inner = self.inner.borrow_mut();
        let SegmentListInner { table, locator, .. } = &mut *inner;
        locator.segment_for_position(table, flat_position)
    }

    /// Pixel offset from the top of the list to the segment's start, per
    /// the height oracle.
    pub fn offset_for(&self, segment_index: usize) -> u32 {
        let inner = self.inner.borrow();
        ScrollAnchorTracker::new(&inner.table, &*inner.heights).offset_for(segment_index)
    }

    /// Flat index of the segment's header/anchor item, for
    /// scroll-to-segment.
    pub fn flat_start_of(&self, segment_index: usize) -> Option<u32> {
        self.inner
            .borrow()
            .table
            .get(segment_index)
            .map(|seg| seg.start_index())
    }

    /// Segment index of a non-pinned id, if present.
    pub fn segment_index_of_id(&self, id: i64) -> Option<usize> {
        self.inner.borrow().table.index_of_id(id)
    }

    /// Total flat slots across all segments.
    pub fn flat_len(&self) -> u32 {
        self.inner.borrow().table.flat_len()
    }

    /// Number of segments.
    pub fn segment_count(&self) -> usize {
        self.inner.borrow().table.len()
    }

    /// Runs a closure against the table; the read-side equivalent of the
    /// op stream, mostly for assertions and diagnostics.
    pub fn with_table<T>(&self, f: impl FnOnce(&SegmentTable) -> T) -> T {
        f(&self.inner.borrow().table)
    }

    // ── Listener registry ────────────────────────────────────────────────

    /// Registers a flat-list mutation listener; returns an id for
    /// [`remove_range_op_listener`](Self::remove_range_op_listener).
    pub fn add_range_op_listener(&self, listener: Rc<dyn Fn(&RangeOp)>) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.op_listeners.push((id, listener));
        id
    }

    pub fn remove_range_op_listener(&self, id: u64) {
        self.inner
            .borrow_mut()
            .op_listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Registers a listener for full-reload downgrades. Needed for queued
    /// orders: their reconciliation runs after the submit call returned,
    /// so a downgrade there cannot be reported as a return value.
    pub fn add_full_reload_listener(&self, listener: Rc<dyn Fn()>) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.reload_listeners.push((id, listener));
        id
    }

    pub fn remove_full_reload_listener(&self, id: u64) {
        self.inner
            .borrow_mut()
            .reload_listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }

    /// Clones listeners out of the borrow before calling them, so a
    /// listener can re-enter the state.
    fn notify_ops(&self, ops: &[RangeOp]) {
        if ops.is_empty() {
            return;
        }
        let listeners: Vec<Rc<dyn Fn(&RangeOp)>> = self
            .inner
            .borrow()
            .op_listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for op in ops {
            for listener in &listeners {
                listener(op);
            }
        }
    }

    fn notify_reload_needed(&self) {
        let listeners: Vec<Rc<dyn Fn()>> = self
            .inner
            .borrow()
            .reload_listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}
