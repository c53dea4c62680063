use std::sync::atomic::{AtomicI64, Ordering};

use crate::id::LineId;

/// A read-only borrow over every line's current value, handed to a
/// `Calculated` line's `compute` closure during `recalculate`.
///
/// This is the Rust-native replacement for re-exposing `&Crossbar` to the
/// callback: `LineView` exposes `value` and nothing else, so the closure
/// has no path back into `recalculate`/`feed_input`/`post_request`/`pending`
/// and cannot deadlock on the mutex its caller already holds.
pub struct LineView<'a> {
    values: &'a [AtomicI64],
}

impl<'a> LineView<'a> {
    pub(crate) fn new(values: &'a [AtomicI64]) -> Self {
        Self { values }
    }

    /// Reads a line's current value. Lock-free: backed by an atomic load,
    /// matching the engine's own `Crossbar::value`.
    pub fn value(&self, id: LineId) -> i64 {
        self.values[id.index()].load(Ordering::Acquire)
    }
}
