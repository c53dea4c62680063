use crate::config::{LineConfig, LineKind};

/// Per-kind runtime auxiliary state, mutated only while the crossbar's
/// mutex is held. Kinds with no auxiliary state (`External`, `Threshold`,
/// `Request`, `Calculated`) carry `None`.
///
/// `Option<i64>` replaces the original's `INT_MIN` sentinel for "no
/// previous sample yet"; `None` forces the same first-sweep behavior
/// (debounce starts counting immediately, every monitor fires once)
/// without a magic integer.
pub(crate) enum LineAux {
    Input { staged: i64 },
    Debounce { target: Option<i64>, timer_ms: i64 },
    Monitor { previous: Option<i64> },
    Periodic { elapsed_ms: i64 },
    None,
}

impl LineAux {
    /// Builds the initial auxiliary state for a configured line.
    ///
    /// Each kind is initialized in its own arm — unlike the original, whose
    /// `case MONITOR` block falls through into `PERIODIC` for lack of a
    /// `break`, harmlessly only because the C aux union overlaps. No
    /// fallthrough is possible here: the match is exhaustive over an enum,
    /// not a switch over a tag.
    pub(crate) fn initial(kind: &LineKind) -> Self {
        match kind {
            LineKind::Input => LineAux::Input { staged: 0 },
            LineKind::Debounce { .. } => LineAux::Debounce {
                target: None,
                timer_ms: 0,
            },
            LineKind::Monitor { .. } => LineAux::Monitor { previous: None },
            LineKind::Periodic { .. } => LineAux::Periodic { elapsed_ms: 0 },
            LineKind::External { .. } | LineKind::Threshold { .. } | LineKind::Request | LineKind::Calculated { .. } => {
                LineAux::None
            }
        }
    }
}

/// Builds the aux-state vector for a full config table, in index order.
pub(crate) fn initial_aux(configs: &[LineConfig]) -> Vec<LineAux> {
    configs.iter().map(|c| LineAux::initial(&c.kind)).collect()
}
