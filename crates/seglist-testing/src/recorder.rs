//! Range-op capture and height oracles.

use std::cell::RefCell;
use std::rc::Rc;

use seglist_foundation::{HeightOracle, RangeOp, SegmentListState};

/// Captures every [`RangeOp`] the engine emits, in order.
#[derive(Clone, Default)]
pub struct RangeOpRecorder {
    ops: Rc<RefCell<Vec<RangeOp>>>,
}

impl RangeOpRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers this recorder on the state; returns the listener id.
    pub fn attach(&self, state: &SegmentListState) -> u64 {
        let ops = Rc::clone(&self.ops);
        state.add_range_op_listener(Rc::new(move |op| ops.borrow_mut().push(op.clone())))
    }

    /// Ops recorded so far.
    pub fn ops(&self) -> Vec<RangeOp> {
        self.ops.borrow().clone()
    }

    /// Drains and returns the recorded ops.
    pub fn take(&self) -> Vec<RangeOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }
}

/// Every item is the same height.
pub struct FixedHeightOracle {
    pub height: u32,
}

impl HeightOracle for FixedHeightOracle {
    fn height_of(&self, _flat_position: u32) -> u32 {
        self.height
    }
}

/// Per-position heights; positions past the table yield 0.
pub struct HeightsByPosition(pub Vec<u32>);

impl HeightOracle for HeightsByPosition {
    fn height_of(&self, flat_position: u32) -> u32 {
        self.0.get(flat_position as usize).copied().unwrap_or(0)
    }
}
