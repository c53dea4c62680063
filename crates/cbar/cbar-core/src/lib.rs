//! A signal crossbar: a small, in-process evaluation engine that composes a
//! fixed set of typed lines into a dependency graph and recomputes every
//! line's value on each tick from external reads, derived logic, and
//! time-driven rules.
//!
//! Lines are declared once as an ordered [`LineConfig`] table and built into
//! a [`Crossbar`] with [`Crossbar::init`]. The host then drives time with
//! [`Crossbar::recalculate`], feeds scalar inputs with
//! [`Crossbar::feed_input`], raises edge-triggered requests with
//! [`Crossbar::post_request`], and reads values/pending flags with
//! [`Crossbar::value`]/[`Crossbar::pending`].

mod config;
mod crossbar;
mod eval;
mod id;
mod state;
mod view;

pub use config::{CbarError, Compute, ExternalRead, LineConfig, LineKind};
pub use crossbar::Crossbar;
pub use id::LineId;
pub use view::LineView;
