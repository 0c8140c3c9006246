#![forbid(unsafe_code)]

//! Synchronous signal dispatcher.
//!
//! # Design
//!
//! [`Signal<A>`] keeps its registrations in an intrusive doubly linked list
//! threaded through a generation-checked arena. Handles ([`Binding`]) refer
//! back to the signal through a `Weak` pointer plus a key, so there is no
//! `Signal -> Binding -> Signal` ownership cycle.
//!
//! The argument type `A` is fixed per signal; use a tuple for several
//! values. Handlers receive `&A`.
//!
//! # Dispatch walk
//!
//! Every in-progress dispatch owns a cursor naming the *next* record to
//! visit. Cursors live in the signal's shared state, and unlinking a record
//! moves any cursor pointing at it to its successor. Handlers may therefore
//! add, detach or re-dispatch freely:
//!
//! - detaching a record not yet visited prevents its invocation,
//! - detaching the running record (or a one-shot record consuming itself)
//!   leaves the walk intact,
//! - `detach_all` ends every active walk,
//! - records appended mid-walk are visited only if the walk has not passed
//!   the old tail yet.
//!
//! No internal borrow is held while user code (handlers, filters, drops of
//! removed closures) runs.
//!
//! # Performance
//!
//! | Operation      | Complexity |
//! |----------------|------------|
//! | `add()`/`once()` | O(1) amortized |
//! | `detach()`     | O(1) + O(D) active walks |
//! | `has()`        | O(1)       |
//! | `dispatch()`   | O(N)       |
//! | `handlers()`   | O(N)       |
//!
//! # Failure Modes
//!
//! - **Panicking handler**: the panic propagates to the `dispatch` caller and
//!   the rest of that walk is skipped. The list stays consistent; one-shot
//!   records visited so far (including the panicking one) are gone.
//! - **Proxy cycles**: dispatch recurses until the stack overflows unless
//!   [`SignalConfig::max_depth`] is set.

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::arena::{Arena, BindingKey};
use crate::binding::Binding;
use crate::config::SignalConfig;
use crate::logging::{self, TARGET, UNLABELED};

type Callback<A> = Rc<dyn Fn(&A)>;
type Filter<A> = Rc<dyn Fn(&A) -> bool>;

/// One registration as stored in the arena.
struct Record<A> {
    callback: Callback<A>,
    receiver: Option<Rc<dyn Any>>,
    once: bool,
    prev: Option<u32>,
    next: Option<u32>,
}

/// Shared interior for [`Signal<A>`].
pub(crate) struct SignalInner<A> {
    records: Arena<Record<A>>,
    head: Option<u32>,
    tail: Option<u32>,
    filter: Option<Filter<A>>,
    /// Next record to visit, one entry per active dispatch (innermost last).
    cursors: Vec<Option<u32>>,
    label: Option<Cow<'static, str>>,
    max_depth: Option<usize>,
}

impl<A> SignalInner<A> {
    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(UNLABELED)
    }

    fn push_back(
        &mut self,
        callback: Callback<A>,
        receiver: Option<Rc<dyn Any>>,
        once: bool,
    ) -> BindingKey {
        let tail = self.tail;
        let key = self.records.insert(Record {
            callback,
            receiver,
            once,
            prev: tail,
            next: None,
        });
        match tail.and_then(|t| self.records.get_at_mut(t)) {
            Some(last) => last.next = Some(key.index()),
            None => self.head = Some(key.index()),
        }
        self.tail = Some(key.index());
        key
    }

    /// Splice the record at `index` out of the list.
    ///
    /// The removed record is returned so the caller can drop it after
    /// releasing the borrow.
    fn unlink(&mut self, index: u32) -> Option<Record<A>> {
        let record = self.records.remove_at(index)?;

        match record.prev.and_then(|p| self.records.get_at_mut(p)) {
            Some(prev) => prev.next = record.next,
            None => self.head = record.next,
        }
        match record.next.and_then(|n| self.records.get_at_mut(n)) {
            Some(next) => next.prev = record.prev,
            None => self.tail = record.prev,
        }

        for cursor in &mut self.cursors {
            if *cursor == Some(index) {
                *cursor = record.next;
            }
        }

        Some(record)
    }

    fn unlink_key(&mut self, key: BindingKey) -> Option<Record<A>> {
        if !self.records.contains(key) {
            return None;
        }
        self.unlink(key.index())
    }

    fn take_all(&mut self) -> Vec<Record<A>> {
        let mut removed = Vec::with_capacity(self.records.len());
        let mut node = self.head.take();
        self.tail = None;
        for cursor in &mut self.cursors {
            *cursor = None;
        }
        while let Some(index) = node {
            let Some(record) = self.records.remove_at(index) else {
                break;
            };
            node = record.next;
            removed.push(record);
        }
        removed
    }
}

/// A synchronous, single-threaded dispatcher.
///
/// Cloning a `Signal` creates a new handle to the **same** dispatcher: both
/// handles share registrations and filter.
///
/// # Invariants
///
/// 1. `head` and `tail` are both absent iff no record is attached.
/// 2. Records are visited in registration order.
/// 3. A [`Binding`] is owned by this signal iff its record is reachable from
///    `head`.
/// 4. A rejected or empty dispatch never consumes one-shot records.
pub struct Signal<A: 'static = ()> {
    inner: Rc<RefCell<SignalInner<A>>>,
}

impl<A: 'static> Clone for Signal<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Default for Signal<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> fmt::Debug for Signal<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Signal")
                .field("label", &inner.label())
                .field("len", &inner.records.len())
                .field("has_filter", &inner.filter.is_some())
                .field("active_dispatches", &inner.cursors.len())
                .finish(),
            Err(_) => f.debug_struct("Signal").finish_non_exhaustive(),
        }
    }
}

impl<A: 'static> Signal<A> {
    /// Create an empty signal.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SignalConfig::default())
    }

    /// Create an empty signal with the given options.
    #[must_use]
    pub fn with_config(config: SignalConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SignalInner {
                records: Arena::with_capacity(config.capacity),
                head: None,
                tail: None,
                filter: None,
                cursors: Vec::new(),
                label: config.label,
                max_depth: config.max_depth,
            })),
        }
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<SignalInner<A>>>) -> Self {
        Self { inner }
    }

    /// True if both handles refer to the same dispatcher.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Label from the construction config, if any.
    #[must_use]
    pub fn label(&self) -> Option<String> {
        self.inner.borrow().label.as_deref().map(str::to_owned)
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().records.len()
    }

    /// True if no handler is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_any()
    }

    /// True if at least one handler is attached.
    #[must_use]
    pub fn has_any(&self) -> bool {
        self.inner.borrow().head.is_some()
    }

    /// True if `binding` is currently attached to this signal.
    ///
    /// Foreign or detached bindings yield `false`.
    #[must_use]
    pub fn has(&self, binding: &Binding<A>) -> bool {
        std::ptr::eq(binding.owner_ptr(), Rc::as_ptr(&self.inner))
            && self.inner.borrow().records.contains(binding.key())
    }

    /// Snapshot of the attached handlers, head to tail.
    #[must_use]
    pub fn handlers(&self) -> Vec<Binding<A>> {
        let inner = self.inner.borrow();
        let mut out = Vec::with_capacity(inner.records.len());
        let mut node = inner.head;
        while let Some(index) = node {
            let (Some(key), Some(record)) =
                (inner.records.key_at(index), inner.records.get_at(index))
            else {
                break;
            };
            out.push(Binding::new(
                Rc::downgrade(&self.inner),
                key,
                record.once,
                record.receiver.clone(),
            ));
            node = record.next;
        }
        out
    }

    /// Attach a handler invoked on every dispatch.
    pub fn add(&self, callback: impl Fn(&A) + 'static) -> Binding<A> {
        self.attach(Rc::new(callback), None, false)
    }

    /// Attach a handler invoked on the next successful dispatch only.
    pub fn once(&self, callback: impl Fn(&A) + 'static) -> Binding<A> {
        self.attach(Rc::new(callback), None, true)
    }

    /// Attach a handler that receives `receiver` as its first argument.
    pub fn add_with<R: 'static>(
        &self,
        receiver: R,
        callback: impl Fn(&R, &A) + 'static,
    ) -> Binding<A> {
        let (callback, receiver) = bind_receiver(receiver, callback);
        self.attach(callback, Some(receiver), false)
    }

    /// One-shot variant of [`add_with`](Self::add_with).
    pub fn once_with<R: 'static>(
        &self,
        receiver: R,
        callback: impl Fn(&R, &A) + 'static,
    ) -> Binding<A> {
        let (callback, receiver) = bind_receiver(receiver, callback);
        self.attach(callback, Some(receiver), true)
    }

    fn attach(
        &self,
        callback: Callback<A>,
        receiver: Option<Rc<dyn Any>>,
        once: bool,
    ) -> Binding<A> {
        let key = {
            let mut inner = self.inner.borrow_mut();
            let key = inner.push_back(callback, receiver.clone(), once);
            trace!(
                target: TARGET,
                label = inner.label(),
                index = key.index(),
                once,
                len = inner.records.len(),
                "handler attached"
            );
            key
        };
        Binding::new(Rc::downgrade(&self.inner), key, once, receiver)
    }

    /// Detach `binding` from this signal.
    ///
    /// A binding owned by another signal, or already detached, is ignored.
    pub fn detach(&self, binding: &Binding<A>) -> &Self {
        if !std::ptr::eq(binding.owner_ptr(), Rc::as_ptr(&self.inner)) {
            return self;
        }
        let removed = {
            let mut inner = self.inner.borrow_mut();
            let removed = inner.unlink_key(binding.key());
            if removed.is_some() {
                trace!(
                    target: TARGET,
                    label = inner.label(),
                    index = binding.key().index(),
                    len = inner.records.len(),
                    "handler detached"
                );
            }
            removed
        };
        // Closure captures may run arbitrary drops; keep them outside the borrow.
        drop(removed);
        self
    }

    /// Detach every handler.
    pub fn detach_all(&self) -> &Self {
        let removed = {
            let mut inner = self.inner.borrow_mut();
            if inner.head.is_none() {
                return self;
            }
            let removed = inner.take_all();
            debug!(
                target: TARGET,
                label = inner.label(),
                count = removed.len(),
                "all handlers detached"
            );
            removed
        };
        drop(removed);
        self
    }

    /// Install a gating predicate, replacing any previous one.
    ///
    /// The predicate sees the same argument as the handlers. When it
    /// returns `false` the dispatch is suppressed and one-shot handlers are
    /// kept.
    pub fn filter(&self, predicate: impl Fn(&A) -> bool + 'static) {
        let previous = self.inner.borrow_mut().filter.replace(Rc::new(predicate));
        drop(previous);
    }

    /// Remove the gating predicate.
    pub fn clear_filter(&self) {
        let previous = self.inner.borrow_mut().filter.take();
        drop(previous);
    }

    /// Invoke every attached handler, in registration order, with `args`.
    ///
    /// Returns `false` if no handler is attached, if the filter rejected
    /// `args`, or if the configured depth bound was reached; `true`
    /// otherwise, even if handlers detached everything mid-walk.
    ///
    /// # Panics
    ///
    /// Propagates any panic raised by a handler or the filter.
    pub fn dispatch(&self, args: &A) -> bool {
        let (filter, span) = {
            let inner = self.inner.borrow();
            if inner.head.is_none() {
                return false;
            }
            let depth = inner.cursors.len();
            if inner.max_depth.is_some_and(|max| depth >= max) {
                warn!(
                    target: TARGET,
                    label = inner.label(),
                    depth,
                    "dispatch depth limit reached, skipping"
                );
                return false;
            }
            let span = logging::dispatch_span(inner.label(), inner.records.len(), depth);
            (inner.filter.clone(), span)
        };
        let _entered = span.enter();

        if let Some(filter) = filter {
            if !filter(args) {
                debug!(target: TARGET, "dispatch suppressed by filter");
                return false;
            }
        }

        let walk = Walk::begin(&self.inner);
        while let Some(callback) = walk.step() {
            callback(args);
        }
        true
    }

    /// Re-dispatch this signal whenever any of `upstreams` dispatches.
    ///
    /// The links are ordinary non-once handlers on the upstream signals;
    /// no handle is returned. Use [`relay_from`](Self::relay_from) to keep
    /// one.
    pub fn proxy(&self, upstreams: &[&Signal<A>]) -> &Self {
        for upstream in upstreams {
            self.relay_from(upstream);
        }
        self
    }

    /// Link a single upstream signal to this one and return the hidden
    /// handler's binding, so the link can be detached on its own.
    ///
    /// The link holds this signal weakly; once every handle to it is
    /// dropped the link does nothing.
    pub fn relay_from(&self, upstream: &Signal<A>) -> Binding<A> {
        let downstream = Rc::downgrade(&self.inner);
        let binding = upstream.add(move |args: &A| {
            if let Some(inner) = downstream.upgrade() {
                Signal::from_inner(inner).dispatch(args);
            }
        });
        debug!(
            target: TARGET,
            upstream = upstream.inner.borrow().label(),
            downstream = self.inner.borrow().label(),
            "proxy linked"
        );
        binding
    }
}

fn bind_receiver<A: 'static, R: 'static>(
    receiver: R,
    callback: impl Fn(&R, &A) + 'static,
) -> (Callback<A>, Rc<dyn Any>) {
    let receiver = Rc::new(receiver);
    let bound = Rc::clone(&receiver);
    let callback: Callback<A> = Rc::new(move |args: &A| callback(&bound, args));
    (callback, receiver)
}

/// Cursor registration for one dispatch walk.
///
/// Dropping the walk (normally or while unwinding from a handler panic)
/// removes its cursor.
struct Walk<'a, A> {
    inner: &'a RefCell<SignalInner<A>>,
    depth: usize,
}

impl<'a, A> Walk<'a, A> {
    fn begin(inner: &'a RefCell<SignalInner<A>>) -> Self {
        let mut state = inner.borrow_mut();
        let head = state.head;
        state.cursors.push(head);
        let depth = state.cursors.len() - 1;
        Self { inner, depth }
    }

    /// Advance the cursor and return the callback to invoke, consuming the
    /// record first if it is one-shot.
    fn step(&self) -> Option<Callback<A>> {
        let (callback, consumed) = {
            let mut state = self.inner.borrow_mut();
            let index = (*state.cursors.get(self.depth)?)?;
            let record = state.records.get_at(index)?;
            let callback = Rc::clone(&record.callback);
            let (next, once) = (record.next, record.once);
            state.cursors[self.depth] = next;
            let consumed = if once { state.unlink(index) } else { None };
            (callback, consumed)
        };
        drop(consumed);
        Some(callback)
    }
}

impl<A> Drop for Walk<'_, A> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.inner.try_borrow_mut() {
            state.cursors.truncate(self.depth);
        }
    }
}
