use crate::id::LineId;

/// A host-supplied external read. Captures whatever state it needs
/// (a GPIO handle, a shared register) instead of threading a `void *priv`
/// through the engine — the closure's environment *is* the priv cell.
pub type ExternalRead = Box<dyn Fn() -> i64 + Send + Sync>;

/// A host-supplied pure function of the lines below a `Calculated` line's
/// own index. Receives a read-only [`crate::view::LineView`] rather than a
/// handle to the whole crossbar, so it has no way to call back into
/// `recalculate`/`feed_input`/`post_request`/`pending` and deadlock itself.
pub type Compute = Box<dyn Fn(&crate::view::LineView<'_>) -> i64 + Send + Sync>;

/// One line's kind and kind-specific configuration, as a single sum type.
///
/// This replaces the tagged-union-of-param-blocks shape of the original: the
/// kind tag and its payload can never disagree, and dispatch is an
/// exhaustive match instead of a manual `type` field check.
pub enum LineKind {
    /// Host-fed scalar; latched on `feed_input`, published on the next sweep.
    Input,
    /// Pulled each sweep from a host-supplied read callback.
    External { read: ExternalRead, invert: bool },
    /// Boolean with hysteresis over another line's scalar value.
    Threshold {
        input: LineId,
        threshold_up: i64,
        threshold_down: i64,
    },
    /// Boolean that follows `input` only after it has held its new value
    /// for a per-direction timeout.
    Debounce {
        input: LineId,
        timeout_up_ms: i64,
        timeout_down_ms: i64,
    },
    /// Edge-sticky boolean raised by the host, cleared by the reader.
    Request,
    /// Boolean/scalar produced by a host-supplied pure function.
    Calculated { compute: Compute },
    /// Edge detector on another line.
    Monitor { input: LineId },
    /// Self-raising pending flag every `period_ms` of accumulated delta.
    Periodic { period_ms: i64 },
}

impl std::fmt::Debug for LineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineKind::Input => write!(f, "Input"),
            LineKind::External { invert, .. } => {
                f.debug_struct("External").field("invert", invert).finish()
            }
            LineKind::Threshold {
                input,
                threshold_up,
                threshold_down,
            } => f
                .debug_struct("Threshold")
                .field("input", input)
                .field("threshold_up", threshold_up)
                .field("threshold_down", threshold_down)
                .finish(),
            LineKind::Debounce {
                input,
                timeout_up_ms,
                timeout_down_ms,
            } => f
                .debug_struct("Debounce")
                .field("input", input)
                .field("timeout_up_ms", timeout_up_ms)
                .field("timeout_down_ms", timeout_down_ms)
                .finish(),
            LineKind::Request => write!(f, "Request"),
            LineKind::Calculated { .. } => f.debug_struct("Calculated").finish(),
            LineKind::Monitor { input } => f.debug_struct("Monitor").field("input", input).finish(),
            LineKind::Periodic { period_ms } => {
                f.debug_struct("Periodic").field("period_ms", period_ms).finish()
            }
        }
    }
}

/// One configured line: a stable name plus its kind. Immutable for the
/// lifetime of the owning [`crate::Crossbar`].
pub struct LineConfig {
    pub name: String,
    pub kind: LineKind,
}

impl LineConfig {
    pub fn new(name: impl Into<String>, kind: LineKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The dependency this line reads from the table, if its kind declares
    /// one statically. `Calculated` lines read through [`crate::view::LineView`]
    /// inside their closure and so have no statically checkable dependency;
    /// this mirrors the original's silent reliance on declaration order for
    /// that one kind.
    fn declared_dependency(&self) -> Option<LineId> {
        match &self.kind {
            LineKind::Threshold { input, .. }
            | LineKind::Debounce { input, .. }
            | LineKind::Monitor { input } => Some(*input),
            _ => None,
        }
    }
}

/// Configuration-time failures. Runtime misuse is a
/// programmer error and panics instead — see [`crate::crossbar::Crossbar`].
#[derive(Debug, thiserror::Error)]
pub enum CbarError {
    #[error("line {dependent} ('{dependent_name}') depends on unknown line id {input}")]
    UnknownLine {
        dependent: u32,
        dependent_name: String,
        input: u32,
    },

    #[error(
        "line {dependent} ('{dependent_name}') depends on line {input}, which is not \
         lower-indexed; dependencies must reference an already-evaluated line"
    )]
    ForwardReference {
        dependent: u32,
        dependent_name: String,
        input: u32,
    },
}

/// Validates the topology invariant: every
/// declared dependency edge must point at a strictly lower-indexed line.
/// Run once at construction, before any state is allocated.
pub(crate) fn validate_topology(configs: &[LineConfig]) -> Result<(), CbarError> {
    for (idx, config) in configs.iter().enumerate() {
        if let Some(input) = config.declared_dependency() {
            let input_idx = input.index();
            if input_idx >= configs.len() {
                return Err(CbarError::UnknownLine {
                    dependent: idx as u32,
                    dependent_name: config.name.clone(),
                    input: input.0,
                });
            }
            if input_idx >= idx {
                return Err(CbarError::ForwardReference {
                    dependent: idx as u32,
                    dependent_name: config.name.clone(),
                    input: input.0,
                });
            }
        }
    }
    Ok(())
}
