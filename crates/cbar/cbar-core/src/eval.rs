//! Pure per-kind recomputation rules.
//!
//! Each function here takes a kind's config and its own auxiliary state and
//! returns the line's new value, with no knowledge of the sweep, the mutex,
//! or any other line beyond the single peer value it's handed. The sweep
//! engine (`crossbar.rs`) is responsible for ordering, dispatch, and
//! threading the right peer values in.

use crate::config::{Compute, ExternalRead};
use crate::view::LineView;

/// `Input`: publish the staged write. A no-op in the original; made
/// explicit here so the sweep's dispatch table stays exhaustive.
#[inline]
pub(crate) fn input(staged: i64) -> i64 {
    staged
}

/// `External`: pull from the host callback, optionally inverting.
pub(crate) fn external(read: &ExternalRead, invert: bool) -> i64 {
    let raw = read();
    if invert {
        (raw == 0) as i64
    } else {
        raw
    }
}

/// `Threshold`: hysteresis comparator. `current` is truthy exactly when the
/// line is "armed" (already tripped high), which selects which trip point
/// governs this sweep. Both directions use `>=`, the behavior-preserving
/// form adopted here over the original's inconsistent `>`/`>=` mix.
#[inline]
pub(crate) fn threshold(current: i64, input_value: i64, threshold_up: i64, threshold_down: i64) -> i64 {
    let armed = current != 0;
    let tripped = if armed {
        input_value >= threshold_down
    } else {
        input_value >= threshold_up
    };
    tripped as i64
}

/// `Debounce`: three-way state machine over (target candidate, published
/// value).
///
/// `target` is `None` only on the very first sweep; any `None` takes the
/// "input moved" branch unconditionally, which is
/// what makes the first sweep always start counting immediately.
pub(crate) fn debounce(
    current: i64,
    input_value: i64,
    target: &mut Option<i64>,
    timer_ms: &mut i64,
    delta_ms: i64,
    timeout_up_ms: i64,
    timeout_down_ms: i64,
) -> i64 {
    match *target {
        Some(t) if t == input_value => {
            if input_value != current {
                let timeout = if input_value != 0 { timeout_up_ms } else { timeout_down_ms };
                *timer_ms += delta_ms;
                if *timer_ms > timeout {
                    return input_value;
                }
            }
            current
        }
        _ => {
            *target = Some(input_value);
            *timer_ms = 0;
            current
        }
    }
}

/// `Calculated`: delegate to the host closure, which may only read peer
/// values through `view` (see `LineView`'s docs for why).
#[inline]
pub(crate) fn calculated(compute: &Compute, view: &LineView<'_>) -> i64 {
    compute(view)
}

/// `Monitor`: edge detector on `input_value`, comparing against the last
/// value it saw (`None` on the first sweep forces an initial fire, giving
/// every monitor its first-sweep "fire once" behavior).
///
/// Returns `current` unchanged when no edge is observed — this is what
/// lets a still-pending flag survive until a reader clears it via
/// `pending`, and what lets an already-cleared flag stay cleared.
pub(crate) fn monitor(current: i64, input_value: i64, previous: &mut Option<i64>) -> i64 {
    match *previous {
        Some(p) if p == input_value => current,
        _ => {
            *previous = Some(input_value);
            1
        }
    }
}

/// `Periodic`: accumulate delta; fire and reset (not decrement) on
/// crossing `period_ms`, so a long delta cannot queue multiple fires.
/// Returns `None` when no fire happened (leave `current` unchanged).
pub(crate) fn periodic(elapsed_ms: &mut i64, delta_ms: i64, period_ms: i64) -> Option<i64> {
    *elapsed_ms += delta_ms;
    if *elapsed_ms >= period_ms {
        *elapsed_ms = 0;
        Some(1)
    } else {
        None
    }
}
