//! Test doubles and harness utilities for the seglist engine.
//!
//! Provides a manually-resolved [`ScriptedContentSource`] for driving the
//! fetch coordinator step by step, a [`RangeOpRecorder`] for asserting on
//! the emitted flat-list mutations, and simple height oracles.

mod recorder;
mod scripted_source;

pub use recorder::*;
pub use scripted_source::*;
