#![forbid(unsafe_code)]

//! Generation-checked slot storage for binding records.
//!
//! # Design
//!
//! Records live in a flat `Vec` of slots. A slot is addressed by its index,
//! and every handle handed out carries the slot's generation at insertion
//! time. Removing a record bumps the slot generation and pushes the index
//! onto a free list, so a stale [`BindingKey`] can never observe a record
//! that later reuses the same slot.
//!
//! Links between records (the signal's `next`/`prev` chain) are stored as
//! bare indices: a linked record is always live, so its generation never
//! needs re-checking on the hot path.
//!
//! # Performance
//!
//! | Operation    | Complexity     |
//! |--------------|----------------|
//! | `insert()`   | O(1) amortized |
//! | `remove()`   | O(1)           |
//! | `get()`      | O(1)           |

/// Stable, generation-checked handle to a binding slot.
///
/// Two keys are equal only if they name the same slot *and* the same
/// occupancy of that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey {
    index: u32,
    generation: u32,
}

impl BindingKey {
    /// Slot index inside the owning signal.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Occupancy generation of the slot when the key was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena with a free list.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, value: T) -> BindingKey {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);
            return BindingKey {
                index,
                generation: slot.generation,
            };
        }

        debug_assert!(self.slots.len() < u32::MAX as usize);
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        BindingKey {
            index,
            generation: 0,
        }
    }

    /// True if `key` names a currently occupied slot.
    pub(crate) fn contains(&self, key: BindingKey) -> bool {
        self.slots
            .get(key.index as usize)
            .is_some_and(|slot| slot.generation == key.generation && slot.value.is_some())
    }

    /// Key of the record currently occupying `index`, if any.
    pub(crate) fn key_at(&self, index: u32) -> Option<BindingKey> {
        let slot = self.slots.get(index as usize)?;
        slot.value.as_ref().map(|_| BindingKey {
            index,
            generation: slot.generation,
        })
    }

    pub(crate) fn get_at(&self, index: u32) -> Option<&T> {
        self.slots.get(index as usize)?.value.as_ref()
    }

    pub(crate) fn get_at_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize)?.value.as_mut()
    }

    /// Remove whatever occupies `index`, invalidating its key.
    pub(crate) fn remove_at(&mut self, index: u32) -> Option<T> {
        let slot = self.slots.get_mut(index as usize)?;
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        Some(value)
    }
}
