#![forbid(unsafe_code)]

//! Handles to individual handler registrations.
//!
//! A [`Binding`] is returned by [`Signal::add`] and friends. It never keeps
//! its signal alive: the owner is held as a `Weak` reference plus a
//! generation-checked [`BindingKey`], so a handle whose record was detached
//! (or whose signal was dropped) simply reports that it has no owner.
//!
//! Dropping a `Binding` does **not** detach it. Wrap it with
//! [`Binding::scoped`] to get drop-to-detach behavior.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::arena::BindingKey;
use crate::signal::{Signal, SignalInner};

/// Handle to one handler registration on a [`Signal`].
///
/// Cloning a `Binding` yields another handle to the **same** registration.
pub struct Binding<A: 'static> {
    owner: Weak<RefCell<SignalInner<A>>>,
    key: BindingKey,
    once: bool,
    receiver: Option<Rc<dyn Any>>,
}

impl<A: 'static> Binding<A> {
    pub(crate) fn new(
        owner: Weak<RefCell<SignalInner<A>>>,
        key: BindingKey,
        once: bool,
        receiver: Option<Rc<dyn Any>>,
    ) -> Self {
        Self {
            owner,
            key,
            once,
            receiver,
        }
    }

    pub(crate) fn owner_ptr(&self) -> *const RefCell<SignalInner<A>> {
        self.owner.as_ptr()
    }

    /// Key of this registration inside its signal.
    #[must_use]
    pub fn key(&self) -> BindingKey {
        self.key
    }

    /// Whether this registration is removed on its first invocation.
    #[must_use]
    pub fn is_once(&self) -> bool {
        self.once
    }

    /// Receiver bound at registration, if it has type `R`.
    #[must_use]
    pub fn receiver<R: 'static>(&self) -> Option<Rc<R>> {
        self.receiver.clone()?.downcast::<R>().ok()
    }

    /// Owning signal, if the registration is still attached.
    #[must_use]
    pub fn owner(&self) -> Option<Signal<A>> {
        let signal = Signal::from_inner(self.owner.upgrade()?);
        signal.has(self).then_some(signal)
    }

    /// True while the registration is attached to a live signal.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.owner().is_some()
    }

    /// Detach from the owning signal.
    ///
    /// Returns `false` if the binding was already detached (or its signal
    /// dropped); this is not an error.
    pub fn detach(&self) -> bool {
        match self.owner() {
            Some(signal) => {
                signal.detach(self);
                true
            }
            None => false,
        }
    }

    /// Same as [`detach`](Self::detach), ignoring the result.
    pub fn dispose(&self) {
        self.detach();
    }

    /// Turn this handle into a guard that detaches on drop.
    #[must_use]
    pub fn scoped(self) -> ScopedBinding<A> {
        ScopedBinding {
            binding: self,
            armed: true,
        }
    }
}

impl<A: 'static> Clone for Binding<A> {
    fn clone(&self) -> Self {
        Self {
            owner: Weak::clone(&self.owner),
            key: self.key,
            once: self.once,
            receiver: self.receiver.clone(),
        }
    }
}

impl<A: 'static> PartialEq for Binding<A> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && Weak::ptr_eq(&self.owner, &other.owner)
    }
}

impl<A: 'static> Eq for Binding<A> {}

impl<A: 'static> fmt::Debug for Binding<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("key", &self.key)
            .field("once", &self.once)
            .field("has_receiver", &self.receiver.is_some())
            .finish()
    }
}

/// RAII guard that disposes its [`Binding`] when dropped.
#[must_use = "dropping a ScopedBinding detaches the handler immediately"]
pub struct ScopedBinding<A: 'static> {
    binding: Binding<A>,
    armed: bool,
}

impl<A: 'static> ScopedBinding<A> {
    /// The guarded handle.
    pub fn binding(&self) -> &Binding<A> {
        &self.binding
    }

    /// Disarm the guard and hand back the plain handle. The registration
    /// stays attached.
    pub fn release(mut self) -> Binding<A> {
        self.armed = false;
        self.binding.clone()
    }
}

impl<A: 'static> Drop for ScopedBinding<A> {
    fn drop(&mut self) {
        if self.armed {
            self.binding.dispose();
        }
    }
}

impl<A: 'static> fmt::Debug for ScopedBinding<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedBinding")
            .field("binding", &self.binding)
            .field("armed", &self.armed)
            .finish()
    }
}
