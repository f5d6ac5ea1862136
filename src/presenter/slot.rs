//! Single-occupancy slot with an opening guard.
//!
//! The slot is `Idle`, `Opening` (a permit is outstanding), or `Occupied`.
//! [`OccupancySlot::try_acquire`] only succeeds from `Idle`, so a second
//! acquirer during opening or while occupied gets `None` and must drop its
//! work. A permit that is dropped without being filled returns the slot to
//! `Idle`.

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
enum SlotState<T> {
    Idle,
    Opening,
    Occupied(T),
}

/// Holds at most one value, guarded by an acquire/fill/release protocol.
#[derive(Debug)]
pub struct OccupancySlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> Default for OccupancySlot<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState::Idle),
        }
    }
}

impl<T> OccupancySlot<T> {
    /// An idle slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `Idle → Opening`; `None` if opening or occupied.
    #[must_use]
    pub fn try_acquire(&self) -> Option<SlotPermit<'_, T>> {
        let mut state = self.lock();
        if !matches!(*state, SlotState::Idle) {
            return None;
        }
        *state = SlotState::Opening;
        Some(SlotPermit {
            slot: self,
            filled: false,
        })
    }

    /// Move `Occupied → Idle`, returning the value.
    ///
    /// Idle or opening slots are left untouched and yield `None`.
    pub fn release(&self) -> Option<T> {
        let mut state = self.lock();
        if !matches!(*state, SlotState::Occupied(_)) {
            return None;
        }
        match std::mem::replace(&mut *state, SlotState::Idle) {
            SlotState::Occupied(value) => Some(value),
            SlotState::Idle | SlotState::Opening => None,
        }
    }

    /// Whether no value is held and no permit is outstanding.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(*self.lock(), SlotState::Idle)
    }

    fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> OccupancySlot<T> {
    /// Clone of the held value, if occupied.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        match &*self.lock() {
            SlotState::Occupied(value) => Some(value.clone()),
            SlotState::Idle | SlotState::Opening => None,
        }
    }
}

/// Exclusive right to fill an [`OccupancySlot`].
#[derive(Debug)]
pub struct SlotPermit<'a, T> {
    slot: &'a OccupancySlot<T>,
    filled: bool,
}

impl<T> SlotPermit<'_, T> {
    /// Move `Opening → Occupied(value)`.
    pub fn fill(mut self, value: T) {
        *self.slot.lock() = SlotState::Occupied(value);
        self.filled = true;
    }
}

impl<T> Drop for SlotPermit<'_, T> {
    fn drop(&mut self) {
        if !self.filled {
            *self.slot.lock() = SlotState::Idle;
        }
    }
}
