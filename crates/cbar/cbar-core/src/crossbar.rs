use std::io::{self, Write};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::config::{validate_topology, CbarError, LineConfig, LineKind};
use crate::eval;
use crate::id::LineId;
use crate::state::{initial_aux, LineAux};
use crate::view::LineView;

/// The signal crossbar: an in-process evaluation engine over a fixed,
/// ordered table of lines.
///
/// - `configs`/`values`/line count never change after [`Crossbar::init`].
/// - `values` holds one atomic word per line, readable lock-free via
///   [`Crossbar::value`].
/// - all other mutation (`recalculate`, `feed_input`, `post_request`,
///   `pending`) serializes through a single coarse mutex guarding the
///   per-kind auxiliary state.
pub struct Crossbar {
    configs: Vec<LineConfig>,
    values: Vec<AtomicI64>,
    aux: Mutex<Vec<LineAux>>,
}

impl Crossbar {
    /// Builds a crossbar from an ordered, immutable config table and runs
    /// the priming sweep.
    ///
    /// Rejects the table if any line's declared dependency is out of range
    /// or not strictly lower-indexed; this is the one recoverable error
    /// surface the engine has.
    pub fn init(configs: Vec<LineConfig>) -> Result<Self, CbarError> {
        validate_topology(&configs)?;

        let values = configs.iter().map(|_| AtomicI64::new(0)).collect();
        let aux = initial_aux(&configs);

        let cbar = Self {
            configs,
            values,
            aux: Mutex::new(aux),
        };
        cbar.recalculate(0);
        Ok(cbar)
    }

    /// One forward pass over the table, advancing time by `delta_ms`.
    /// Dispatches on kind in index order, so every dependent observes its
    /// declared input's already-updated value within the same sweep.
    pub fn recalculate(&self, delta_ms: i64) {
        let mut aux = self.aux.lock().expect("cbar mutex poisoned");

        for idx in 0..self.configs.len() {
            let config = &self.configs[idx];
            let current = self.values[idx].load(Ordering::Relaxed);

            let new_value = match &config.kind {
                LineKind::Input => {
                    let staged = match &aux[idx] {
                        LineAux::Input { staged } => *staged,
                        _ => unreachable!("Input line without Input aux"),
                    };
                    Some(staged)
                }
                LineKind::External { read, invert } => Some(eval::external(read, *invert)),
                LineKind::Threshold {
                    input,
                    threshold_up,
                    threshold_down,
                } => {
                    let input_value = self.values[input.index()].load(Ordering::Relaxed);
                    Some(eval::threshold(current, input_value, *threshold_up, *threshold_down))
                }
                LineKind::Debounce {
                    input,
                    timeout_up_ms,
                    timeout_down_ms,
                } => {
                    let input_value = self.values[input.index()].load(Ordering::Relaxed);
                    let LineAux::Debounce { target, timer_ms } = &mut aux[idx] else {
                        unreachable!("Debounce line without Debounce aux")
                    };
                    Some(eval::debounce(
                        current,
                        input_value,
                        target,
                        timer_ms,
                        delta_ms,
                        *timeout_up_ms,
                        *timeout_down_ms,
                    ))
                }
                LineKind::Request => None,
                LineKind::Calculated { compute } => {
                    let view = LineView::new(&self.values);
                    Some(eval::calculated(compute, &view))
                }
                LineKind::Monitor { input } => {
                    let input_value = self.values[input.index()].load(Ordering::Relaxed);
                    let LineAux::Monitor { previous } = &mut aux[idx] else {
                        unreachable!("Monitor line without Monitor aux")
                    };
                    Some(eval::monitor(current, input_value, previous))
                }
                LineKind::Periodic { period_ms } => {
                    let LineAux::Periodic { elapsed_ms } = &mut aux[idx] else {
                        unreachable!("Periodic line without Periodic aux")
                    };
                    eval::periodic(elapsed_ms, delta_ms, *period_ms)
                }
            };

            if let Some(v) = new_value {
                self.values[idx].store(v, Ordering::Release);
            }
        }
    }

    /// Stages a new value for an `Input` line. Takes effect on the next
    /// `recalculate`, not immediately — this is what lets a single sweep
    /// see a consistent snapshot of all inputs fed since the last one.
    ///
    /// # Panics
    /// Panics if `id` does not name an `Input` line, or is out of range.
    pub fn feed_input(&self, id: LineId, value: i64) {
        let config = self.line_config(id);
        assert!(
            matches!(config.kind, LineKind::Input),
            "feed_input on non-Input line '{}'",
            config.name
        );

        let mut aux = self.aux.lock().expect("cbar mutex poisoned");
        let LineAux::Input { staged } = &mut aux[id.index()] else {
            unreachable!("Input line without Input aux")
        };
        *staged = value;
    }

    /// Raises a `Request` line. Multiple posts before a read collapse: the
    /// request is non-counting.
    ///
    /// # Panics
    /// Panics if `id` does not name a `Request` line, or is out of range.
    pub fn post_request(&self, id: LineId) {
        let config = self.line_config(id);
        assert!(
            matches!(config.kind, LineKind::Request),
            "post_request on non-Request line '{}'",
            config.name
        );

        let _aux = self.aux.lock().expect("cbar mutex poisoned");
        self.values[id.index()].store(1, Ordering::Release);
    }

    /// Reads a line's current value without acquiring the mutex — safe to
    /// call reentrantly from a `Calculated` compute closure via
    /// [`LineView`], and safe to call from any thread as an advisory
    /// snapshot of the most recently published sweep.
    pub fn value(&self, id: LineId) -> i64 {
        self.values[id.index()].load(Ordering::Acquire)
    }

    /// Atomically reads and clears an edge-triggered line's pending flag.
    /// Returns the value that was there before clearing.
    ///
    /// # Panics
    /// Panics if `id` does not name a `Request`, `Monitor`, or `Periodic`
    /// line, or is out of range.
    pub fn pending(&self, id: LineId) -> bool {
        let config = self.line_config(id);
        assert!(
            matches!(
                config.kind,
                LineKind::Request | LineKind::Monitor { .. } | LineKind::Periodic { .. }
            ),
            "pending on non-event line '{}'",
            config.name
        );

        let _aux = self.aux.lock().expect("cbar mutex poisoned");
        let prior = self.values[id.index()].swap(0, Ordering::AcqRel);
        prior != 0
    }

    /// Writes `name = value` for every configured line to `sink`.
    /// Diagnostic only; takes no lock and mutates no state.
    pub fn dump(&self, sink: &mut dyn Write) -> io::Result<()> {
        for (idx, config) in self.configs.iter().enumerate() {
            writeln!(sink, "cbar: {} = {}", config.name, self.values[idx].load(Ordering::Acquire))?;
        }
        Ok(())
    }

    /// Number of configured lines.
    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    fn line_config(&self, id: LineId) -> &LineConfig {
        self.configs
            .get(id.index())
            .unwrap_or_else(|| panic!("line id {} out of range (0..{})", id.0, self.configs.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LineConfig;

    fn lines(kinds: Vec<LineKind>) -> Vec<LineConfig> {
        kinds
            .into_iter()
            .enumerate()
            .map(|(i, k)| LineConfig::new(format!("line{i}"), k))
            .collect()
    }

    /// Input values stay stale until the next sweep, then publish.
    #[test]
    fn input_deferral() {
        let cbar = Crossbar::init(lines(vec![LineKind::Input])).unwrap();
        let lv = LineId(0);

        assert_eq!(cbar.value(lv), 0);
        cbar.feed_input(lv, 3185);
        assert_eq!(cbar.value(lv), 0);
        cbar.recalculate(0);
        assert_eq!(cbar.value(lv), 3185);
    }

    #[test]
    fn external_reads_upstream_and_can_invert() {
        use std::sync::atomic::{AtomicI64 as Gpio, Ordering as GpioOrdering};
        use std::sync::Arc;

        let pin0 = Arc::new(Gpio::new(0));
        let pin1 = Arc::new(Gpio::new(1));
        let pin2 = Arc::new(Gpio::new(1));

        let (p0, p1, p2) = (pin0.clone(), pin1.clone(), pin2.clone());
        let configs = lines_external(vec![
            (p0, false),
            (p1, false),
            (p2, true),
        ]);
        let cbar = Crossbar::init(configs).unwrap();

        assert_eq!(cbar.value(LineId(0)), 0);
        assert_eq!(cbar.value(LineId(1)), 1);
        assert_eq!(cbar.value(LineId(2)), 0);

        pin0.store(1, GpioOrdering::Relaxed);
        pin1.store(0, GpioOrdering::Relaxed);
        pin2.store(0, GpioOrdering::Relaxed);

        // stale until the next sweep
        assert_eq!(cbar.value(LineId(0)), 0);
        cbar.recalculate(0);
        assert_eq!(cbar.value(LineId(0)), 1);
        assert_eq!(cbar.value(LineId(1)), 0);
        assert_eq!(cbar.value(LineId(2)), 1);
    }

    fn lines_external(pins: Vec<(std::sync::Arc<std::sync::atomic::AtomicI64>, bool)>) -> Vec<LineConfig> {
        pins.into_iter()
            .enumerate()
            .map(|(i, (pin, invert))| {
                LineConfig::new(
                    format!("in{i}"),
                    LineKind::External {
                        read: Box::new(move || pin.load(std::sync::atomic::Ordering::Relaxed)),
                        invert,
                    },
                )
            })
            .collect()
    }

    /// Hysteresis trip points on a rising-then-falling voltage sweep.
    #[test]
    fn threshold_hysteresis_scenario() {
        let configs = vec![
            LineConfig::new("voltage", LineKind::Input),
            LineConfig::new(
                "voltage_ok",
                LineKind::Threshold {
                    input: LineId(0),
                    threshold_up: 1050,
                    threshold_down: 950,
                },
            ),
        ];
        let cbar = Crossbar::init(configs).unwrap();
        let (voltage, ok) = (LineId(0), LineId(1));

        assert_eq!(cbar.value(ok), 0);

        for (input, expected) in [(0, 0), (1049, 0), (1050, 1), (950, 1), (949, 0)] {
            cbar.feed_input(voltage, input);
            cbar.recalculate(0);
            assert_eq!(cbar.value(ok), expected, "input={input}");
        }
    }

    /// Debounce rides through a dip shorter than its timeout.
    #[test]
    fn debounce_scenario() {
        let configs = vec![
            LineConfig::new("in0", LineKind::Input),
            LineConfig::new(
                "a",
                LineKind::Debounce {
                    input: LineId(0),
                    timeout_up_ms: 0,
                    timeout_down_ms: 1000,
                },
            ),
        ];
        let cbar = Crossbar::init(configs).unwrap();
        let (input, a) = (LineId(0), LineId(1));

        cbar.feed_input(input, 1);
        cbar.recalculate(0);
        assert_eq!(cbar.value(a), 1);

        cbar.feed_input(input, 0);
        cbar.recalculate(5000);
        assert_eq!(cbar.value(a), 1);
        cbar.recalculate(250);
        assert_eq!(cbar.value(a), 1);
        cbar.recalculate(750);
        assert_eq!(cbar.value(a), 0);
    }

    /// Once settled, holding the input at its published value across
    /// further sweeps must not re-mutate the debounce's target/timer, no
    /// matter how much delta accrues.
    #[test]
    fn debounce_steady_state_does_not_remutate() {
        let configs = vec![
            LineConfig::new("in0", LineKind::Input),
            LineConfig::new(
                "a",
                LineKind::Debounce {
                    input: LineId(0),
                    timeout_up_ms: 0,
                    timeout_down_ms: 1000,
                },
            ),
        ];
        let cbar = Crossbar::init(configs).unwrap();
        let (input, a) = (LineId(0), LineId(1));

        cbar.feed_input(input, 1);
        cbar.recalculate(0);
        assert_eq!(cbar.value(a), 1);

        cbar.feed_input(input, 0);
        cbar.recalculate(5000);
        cbar.recalculate(250);
        cbar.recalculate(750);
        assert_eq!(cbar.value(a), 0);

        let snapshot = || {
            let aux = cbar.aux.lock().unwrap();
            match aux[a.index()] {
                LineAux::Debounce { target, timer_ms } => (target, timer_ms),
                _ => unreachable!("debounce line without debounce aux"),
            }
        };
        let settled = snapshot();

        cbar.recalculate(10);
        assert_eq!(cbar.value(a), 0);
        assert_eq!(snapshot(), settled);

        cbar.recalculate(10_000);
        assert_eq!(cbar.value(a), 0);
        assert_eq!(snapshot(), settled);
    }

    /// Full three-debounce-line table from the original's tests.c, to
    /// cover all three timeout combinations and the flap scenario.
    #[test]
    fn debounce_three_lines_and_flap() {
        let configs = vec![
            LineConfig::new("in0", LineKind::Input),
            LineConfig::new(
                "a",
                LineKind::Debounce {
                    input: LineId(0),
                    timeout_up_ms: 0,
                    timeout_down_ms: 1000,
                },
            ),
            LineConfig::new(
                "b",
                LineKind::Debounce {
                    input: LineId(0),
                    timeout_up_ms: 1000,
                    timeout_down_ms: 1000,
                },
            ),
            LineConfig::new(
                "c",
                LineKind::Debounce {
                    input: LineId(0),
                    timeout_up_ms: 1000,
                    timeout_down_ms: 0,
                },
            ),
        ];
        let cbar = Crossbar::init(configs).unwrap();
        let (input, a, b, c) = (LineId(0), LineId(1), LineId(2), LineId(3));

        assert_eq!(cbar.value(a), 0);
        assert_eq!(cbar.value(b), 0);
        assert_eq!(cbar.value(c), 0);

        cbar.feed_input(input, 1);
        assert_eq!(cbar.value(a), 0);

        cbar.recalculate(0);
        assert_eq!(cbar.value(a), 1);
        assert_eq!(cbar.value(b), 0);
        assert_eq!(cbar.value(c), 0);

        cbar.recalculate(999);
        assert_eq!(cbar.value(b), 0);
        assert_eq!(cbar.value(c), 0);

        cbar.recalculate(1);
        assert_eq!(cbar.value(a), 1);
        assert_eq!(cbar.value(b), 1);
        assert_eq!(cbar.value(c), 1);

        cbar.feed_input(input, 0);
        cbar.recalculate(5000);
        assert_eq!(cbar.value(a), 1);
        assert_eq!(cbar.value(b), 1);
        assert_eq!(cbar.value(c), 0);

        cbar.recalculate(250);
        assert_eq!(cbar.value(a), 1);
        assert_eq!(cbar.value(b), 1);
        assert_eq!(cbar.value(c), 0);

        cbar.recalculate(750);
        assert_eq!(cbar.value(a), 0);
        assert_eq!(cbar.value(b), 0);
        assert_eq!(cbar.value(c), 0);

        // flapping below the debounce threshold never lets A or B fire
        for _ in 0..4 {
            cbar.feed_input(input, 1);
            cbar.recalculate(500);
            assert_eq!(cbar.value(a), 1);
            assert_eq!(cbar.value(b), 0);
            assert_eq!(cbar.value(c), 0);

            cbar.feed_input(input, 0);
            cbar.recalculate(500);
            assert_eq!(cbar.value(a), 1);
            assert_eq!(cbar.value(b), 0);
            assert_eq!(cbar.value(c), 0);
        }
    }

    /// Posting a request twice before a read still collapses to one pending flag.
    #[test]
    fn request_is_non_counting() {
        let configs = vec![
            LineConfig::new("req1", LineKind::Request),
            LineConfig::new("req2", LineKind::Request),
        ];
        let cbar = Crossbar::init(configs).unwrap();
        let (req1, req2) = (LineId(0), LineId(1));

        assert!(!cbar.pending(req1));
        assert!(!cbar.pending(req2));

        cbar.post_request(req1);
        assert!(cbar.pending(req1));
        assert!(!cbar.pending(req1));

        cbar.post_request(req2);
        cbar.post_request(req2);
        assert!(cbar.pending(req2));
        assert!(!cbar.pending(req2));
    }

    /// A calculated line reads two lower-indexed inputs through LineView.
    #[test]
    fn calculated_idling() {
        let configs = vec![
            LineConfig::new("engine_running", LineKind::Input),
            LineConfig::new("in_motion", LineKind::Input),
            LineConfig::new(
                "idling",
                LineKind::Calculated {
                    compute: Box::new(|view| {
                        let running = view.value(LineId(0)) != 0;
                        let moving = view.value(LineId(1)) != 0;
                        (running && !moving) as i64
                    }),
                },
            ),
        ];
        let cbar = Crossbar::init(configs).unwrap();
        let (engine_running, in_motion, idling) = (LineId(0), LineId(1), LineId(2));

        assert_eq!(cbar.value(idling), 0);

        cbar.feed_input(engine_running, 1);
        cbar.recalculate(100);
        assert_eq!(cbar.value(idling), 1);

        cbar.feed_input(in_motion, 1);
        cbar.recalculate(100);
        assert_eq!(cbar.value(idling), 0);
    }

    /// Monitors fire on their first sweep and stay silent across a glitch that reverses within one sweep.
    #[test]
    fn monitor_first_fire_and_glitch_suppression() {
        let configs = vec![
            LineConfig::new("gps_fix", LineKind::Input),
            LineConfig::new("monitor_gps", LineKind::Monitor { input: LineId(0) }),
        ];
        let cbar = Crossbar::init(configs).unwrap();
        let (gps_fix, monitor_gps) = (LineId(0), LineId(1));

        assert!(cbar.pending(monitor_gps));
        assert!(!cbar.pending(monitor_gps));

        cbar.feed_input(gps_fix, 1);
        cbar.recalculate(100);
        assert!(cbar.pending(monitor_gps));
        assert!(!cbar.pending(monitor_gps));

        // a glitch that reverses within one sweep is invisible
        cbar.feed_input(gps_fix, 0);
        cbar.feed_input(gps_fix, 1);
        cbar.recalculate(100);
        assert!(!cbar.pending(monitor_gps));
    }

    /// Periodic fires exactly once per accumulated period, discarding any remainder.
    #[test]
    fn periodic_scenario() {
        let configs = vec![LineConfig::new("tick", LineKind::Periodic { period_ms: 1000 })];
        let cbar = Crossbar::init(configs).unwrap();
        let tick = LineId(0);

        assert!(!cbar.pending(tick));

        cbar.recalculate(500);
        assert!(!cbar.pending(tick));
        cbar.recalculate(499);
        assert!(!cbar.pending(tick));
        cbar.recalculate(1);
        assert!(cbar.pending(tick));
        assert!(!cbar.pending(tick));

        cbar.recalculate(1000);
        cbar.recalculate(1000);
        cbar.recalculate(1000);
        assert!(cbar.pending(tick));
        assert!(!cbar.pending(tick));

        cbar.recalculate(1500);
        assert!(cbar.pending(tick));
        assert!(!cbar.pending(tick));
        cbar.recalculate(500);
        assert!(!cbar.pending(tick));
    }

    #[test]
    #[should_panic(expected = "feed_input on non-Input")]
    fn feed_input_on_wrong_kind_panics() {
        let cbar = Crossbar::init(lines(vec![LineKind::Request])).unwrap();
        cbar.feed_input(LineId(0), 1);
    }

    #[test]
    #[should_panic(expected = "post_request on non-Request")]
    fn post_request_on_wrong_kind_panics() {
        let cbar = Crossbar::init(lines(vec![LineKind::Input])).unwrap();
        cbar.post_request(LineId(0));
    }

    #[test]
    #[should_panic(expected = "pending on non-event line")]
    fn pending_on_wrong_kind_panics() {
        let cbar = Crossbar::init(lines(vec![LineKind::Input])).unwrap();
        cbar.pending(LineId(0));
    }

    #[test]
    fn topology_violation_is_rejected_at_init() {
        let configs = vec![LineConfig::new("a", LineKind::Monitor { input: LineId(1) })];
        assert!(Crossbar::init(configs).is_err());
    }

    #[test]
    fn dump_writes_name_value_pairs() {
        let cbar = Crossbar::init(lines(vec![LineKind::Input])).unwrap();
        cbar.feed_input(LineId(0), 42);
        cbar.recalculate(0);

        let mut buf = Vec::new();
        cbar.dump(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "cbar: line0 = 42\n");
    }
}
