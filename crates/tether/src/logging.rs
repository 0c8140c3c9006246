#![forbid(unsafe_code)]

//! Tracing targets and span helpers shared by the signal internals.
//!
//! All events are emitted through [`tracing`] under [`TARGET`], so hosts can
//! filter them with e.g. `RUST_LOG=tether::signal=trace`. Nothing here
//! installs a subscriber; that is the host application's job.

use tracing::Span;

/// Target used by every event this crate emits.
pub const TARGET: &str = "tether::signal";

/// Placeholder shown for signals created without a label.
pub const UNLABELED: &str = "<unlabeled>";

/// Span wrapping one dispatch walk.
pub(crate) fn dispatch_span(label: &str, len: usize, depth: usize) -> Span {
    tracing::trace_span!(target: TARGET, "signal.dispatch", label, len, depth)
}
