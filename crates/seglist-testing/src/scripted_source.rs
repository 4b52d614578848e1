//! Manually-resolved content source.

use std::cell::RefCell;
use std::collections::VecDeque;

use seglist_foundation::{ContentSource, FetchCallback, FetchError, SegmentContent};

/// A [`ContentSource`] that parks every fetch until the test resolves or
/// fails it explicitly. Lets tests interleave submissions with fetch
/// completions in any order and assert on the single-flight discipline.
#[derive(Default)]
pub struct ScriptedContentSource {
    pending: RefCell<VecDeque<(i64, FetchCallback)>>,
    fetch_log: RefCell<Vec<i64>>,
}

impl ScriptedContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fetches currently parked. The coordinator never lets
    /// this exceed 1.
    pub fn outstanding(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Id of the oldest parked fetch.
    pub fn next_pending_id(&self) -> Option<i64> {
        self.pending.borrow().front().map(|(id, _)| *id)
    }

    /// Every id ever requested, in request order.
    pub fn fetch_log(&self) -> Vec<i64> {
        self.fetch_log.borrow().clone()
    }

    /// Completes the oldest parked fetch with `content`.
    pub fn resolve_next(&self, content: SegmentContent) {
        let (id, callback) = self
            .pending
            .borrow_mut()
            .pop_front()
            .expect("no fetch outstanding");
        assert_eq!(id, content.id, "resolving the wrong fetch");
        // Borrow released: the completion may re-enter fetch_segment.
        callback(Ok(content));
    }

    /// Fails the oldest parked fetch.
    pub fn fail_next(&self, error: FetchError) {
        let (_, callback) = self
            .pending
            .borrow_mut()
            .pop_front()
            .expect("no fetch outstanding");
        callback(Err(error));
    }
}

impl ContentSource for ScriptedContentSource {
    fn fetch_segment(&self, id: i64, on_complete: FetchCallback) {
        self.fetch_log.borrow_mut().push(id);
        self.pending.borrow_mut().push_back((id, on_complete));
    }
}
