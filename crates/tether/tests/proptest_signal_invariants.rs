//! Property-based invariant tests for the signal list.
//!
//! A random sequence of operations is applied both to a [`Signal`] and to a
//! plain `Vec` model; after every step the two must agree:
//!
//! 1. `handlers()` lists exactly the model's bindings, in registration order.
//! 2. `len()`, `has_any()` and `has()` agree with the model.
//! 3. A dispatch invokes the model's handlers in order, then drops the
//!    one-shot ones.
//! 4. Detached handles report no owner; detaching twice is a no-op.
//! 5. A rejecting filter never invokes or consumes anything.
//! 6. An accepting filter behaves exactly like no filter.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use tether::{Binding, Signal};

// ── Strategies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Add { once: bool },
    /// Detach the n-th binding ever created (modulo count), attached or not.
    Detach(usize),
    /// Detach via the binding handle instead of the signal.
    DetachViaBinding(usize),
    Dispatch,
    DetachAll,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => any::<bool>().prop_map(|once| Op::Add { once }),
        2 => any::<usize>().prop_map(Op::Detach),
        1 => any::<usize>().prop_map(Op::DetachViaBinding),
        3 => Just(Op::Dispatch),
        1 => Just(Op::DetachAll),
    ]
}

fn ops_strategy(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(op_strategy(), 1..=max_len)
}

// ── Harness ───────────────────────────────────────────────────────────────

struct Harness {
    signal: Signal,
    calls: Rc<RefCell<Vec<usize>>>,
    /// Every binding ever created, indexed by id.
    created: Vec<Binding<()>>,
    /// Model list: (id, once) in expected dispatch order.
    model: Vec<(usize, bool)>,
}

impl Harness {
    fn new() -> Self {
        Self {
            signal: Signal::new(),
            calls: Rc::new(RefCell::new(Vec::new())),
            created: Vec::new(),
            model: Vec::new(),
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Add { once } => {
                let id = self.created.len();
                let calls = Rc::clone(&self.calls);
                let handler = move |_: &()| calls.borrow_mut().push(id);
                let binding = if once {
                    self.signal.once(handler)
                } else {
                    self.signal.add(handler)
                };
                self.created.push(binding);
                self.model.push((id, once));
            }
            Op::Detach(n) | Op::DetachViaBinding(n) => {
                if self.created.is_empty() {
                    return;
                }
                let id = n % self.created.len();
                let binding = &self.created[id];
                let attached = self.model.iter().any(|(m, _)| *m == id);
                if matches!(op, Op::Detach(_)) {
                    self.signal.detach(binding);
                } else {
                    assert_eq!(binding.detach(), attached);
                }
                self.model.retain(|(m, _)| *m != id);
            }
            Op::Dispatch => {
                self.calls.borrow_mut().clear();
                let fired = self.signal.dispatch(&());
                assert_eq!(fired, !self.model.is_empty());
                let expected: Vec<usize> = self.model.iter().map(|(id, _)| *id).collect();
                assert_eq!(*self.calls.borrow(), expected);
                self.model.retain(|(_, once)| !once);
            }
            Op::DetachAll => {
                self.signal.detach_all();
                self.model.clear();
            }
        }
    }

    fn check(&self) {
        let expected: Vec<Binding<()>> = self
            .model
            .iter()
            .map(|(id, _)| self.created[*id].clone())
            .collect();
        assert_eq!(self.signal.handlers(), expected);
        assert_eq!(self.signal.len(), self.model.len());
        assert_eq!(self.signal.has_any(), !self.model.is_empty());

        for (id, binding) in self.created.iter().enumerate() {
            let attached = self.model.iter().any(|(m, _)| *m == id);
            assert_eq!(self.signal.has(binding), attached);
            assert_eq!(binding.is_attached(), attached);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// List model equivalence
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn list_matches_model(ops in ops_strategy(64)) {
        let mut h = Harness::new();
        for op in &ops {
            h.apply(op);
            h.check();
        }
    }

    #[test]
    fn registration_order_is_preserved(onces in proptest::collection::vec(any::<bool>(), 0..32)) {
        let signal: Signal = Signal::new();
        let bindings: Vec<_> = onces
            .iter()
            .map(|&once| if once { signal.once(|_| {}) } else { signal.add(|_| {}) })
            .collect();
        prop_assert_eq!(signal.handlers(), bindings);
    }

    #[test]
    fn detach_is_idempotent(count in 1usize..16, pick in any::<usize>()) {
        let signal: Signal = Signal::new();
        let foreign: Signal = Signal::new();
        let bindings: Vec<_> = (0..count).map(|_| signal.add(|_| {})).collect();
        let stranger = foreign.add(|_| {});
        let victim = &bindings[pick % count];

        signal.detach(victim);
        let after_first = signal.handlers();
        signal.detach(victim).detach(&stranger);

        prop_assert_eq!(signal.handlers(), after_first);
        prop_assert_eq!(signal.len(), count - 1);
        prop_assert_eq!(foreign.len(), 1);
    }

    #[test]
    fn rejecting_filter_consumes_nothing(
        onces in proptest::collection::vec(any::<bool>(), 1..16),
        rounds in 1usize..5,
    ) {
        let signal: Signal = Signal::new();
        let calls = Rc::new(RefCell::new(0usize));
        for &once in &onces {
            let c = Rc::clone(&calls);
            let handler = move |_: &()| *c.borrow_mut() += 1;
            if once { signal.once(handler); } else { signal.add(handler); }
        }
        signal.filter(|_| false);

        for _ in 0..rounds {
            prop_assert!(!signal.dispatch(&()));
        }
        prop_assert_eq!(*calls.borrow(), 0);
        prop_assert_eq!(signal.len(), onces.len());
    }

    #[test]
    fn accepting_filter_equals_no_filter(ops in ops_strategy(48)) {
        let mut plain = Harness::new();
        let mut gated = Harness::new();
        gated.signal.filter(|_| true);

        for op in &ops {
            plain.apply(op);
            gated.apply(op);
            prop_assert_eq!(plain.signal.len(), gated.signal.len());
            prop_assert_eq!(&*plain.calls.borrow(), &*gated.calls.borrow());
        }
    }
}
