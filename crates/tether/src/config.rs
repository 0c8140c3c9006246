#![forbid(unsafe_code)]

//! Construction options for [`Signal`](crate::Signal).

use std::borrow::Cow;

/// Options applied when a signal is created.
///
/// The default configuration matches [`Signal::new`](crate::Signal::new):
/// no label, no preallocation, unbounded re-entrant dispatch depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalConfig {
    /// Human-readable name attached to log events and `Debug` output.
    pub label: Option<Cow<'static, str>>,
    /// Number of binding slots to preallocate.
    pub capacity: usize,
    /// Maximum number of nested dispatches of a single signal.
    ///
    /// `None` means unbounded. When the bound is reached, further nested
    /// `dispatch` calls return `false` without running the filter or any
    /// handler. Useful as a guard against proxy cycles.
    pub max_depth: Option<usize>,
}

impl SignalConfig {
    /// Create a config carrying only a label.
    pub fn labeled(label: impl Into<Cow<'static, str>>) -> Self {
        Self {
            label: Some(label.into()),
            ..Default::default()
        }
    }

    /// Set the label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the number of preallocated binding slots.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Bound nested dispatch depth. A depth of 0 is clamped to 1 so the
    /// outermost dispatch always runs.
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth.max(1));
        self
    }
}
