#![forbid(unsafe_code)]

//! Signals: synchronous, in-process event dispatch.
//!
//! # Role
//! `tether` is the event-bus building block. A [`Signal<A>`] holds an
//! ordered list of handlers taking `&A`; [`Signal::dispatch`] calls them in
//! registration order on the caller's thread before returning.
//!
//! # Primary responsibilities
//! - **Registration**: [`Signal::add`] / [`Signal::once`] (plus `_with`
//!   variants binding a receiver) return a [`Binding`] handle.
//! - **Removal**: [`Signal::detach`], [`Binding::detach`],
//!   [`Signal::detach_all`], or drop-to-detach via [`ScopedBinding`].
//! - **Gating**: [`Signal::filter`] suppresses dispatch without consuming
//!   one-shot handlers.
//! - **Composition**: [`Signal::proxy`] / [`Signal::relay_from`] chain
//!   signals so one dispatch cascades into another.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tether::Signal;
//!
//! let resized: Signal<(u16, u16)> = Signal::new();
//! let area = Rc::new(Cell::new(0u32));
//! let sink = Rc::clone(&area);
//!
//! let binding = resized.add(move |(w, h)| sink.set(u32::from(*w) * u32::from(*h)));
//! assert!(resized.dispatch(&(80, 24)));
//! assert_eq!(area.get(), 1920);
//!
//! assert!(binding.detach());
//! assert!(!resized.dispatch(&(100, 40)));
//! ```
//!
//! # Threading
//! Signals are `!Send`/`!Sync`. Handlers may re-enter the signal (dispatch,
//! add, detach) while a dispatch is running.

mod arena;
pub mod binding;
pub mod config;
pub mod logging;
pub mod signal;

pub use arena::BindingKey;
pub use binding::{Binding, ScopedBinding};
pub use config::SignalConfig;
pub use signal::Signal;
