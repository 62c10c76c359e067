//! Write-once slot for the long-lived registry client

use parking_lot::Mutex;
use std::sync::Arc;

enum SlotState<T> {
    Empty,
    Holding(Arc<T>),
    Released,
}

/// Single-assignment cell with an explicit release step.
///
/// `Empty -> Holding -> Released`, or `Empty -> Released` when nothing was
/// ever assigned. Only the first `fill` from `Empty` succeeds and only the
/// first `drain` hands the value back.
pub struct ResourceSlot<T> {
    state: Mutex<SlotState<T>>,
}

impl<T> ResourceSlot<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Empty),
        }
    }

    /// Assign the value. A slot that was already filled or released rejects
    /// the write and returns the value to the caller.
    pub fn fill(&self, value: Arc<T>) -> Result<(), Arc<T>> {
        let mut state = self.state.lock();
        match *state {
            SlotState::Empty => {
                *state = SlotState::Holding(value);
                Ok(())
            }
            SlotState::Holding(_) | SlotState::Released => Err(value),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.state.lock() {
            SlotState::Holding(value) => Some(value.clone()),
            SlotState::Empty | SlotState::Released => None,
        }
    }

    /// Mark the slot released, handing back the held value the first time
    pub fn drain(&self) -> Option<Arc<T>> {
        match std::mem::replace(&mut *self.state.lock(), SlotState::Released) {
            SlotState::Holding(value) => Some(value),
            SlotState::Empty | SlotState::Released => None,
        }
    }

    #[must_use]
    pub fn is_holding(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Holding(_))
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        matches!(*self.state.lock(), SlotState::Released)
    }
}

impl<T> Default for ResourceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_once() {
        let slot = ResourceSlot::new();
        assert!(slot.get().is_none());

        let first = Arc::new("first");
        slot.fill(first.clone()).unwrap();

        let rejected = slot.fill(Arc::new("second")).unwrap_err();
        assert_eq!(*rejected, "second");

        let held = slot.get().unwrap();
        assert!(Arc::ptr_eq(&held, &first));
        assert!(slot.is_holding());
    }

    #[test]
    fn test_drain_hands_back_once() {
        let slot = ResourceSlot::new();
        let value = Arc::new(7);
        slot.fill(value.clone()).unwrap();

        let drained = slot.drain().unwrap();
        assert!(Arc::ptr_eq(&drained, &value));
        assert!(slot.drain().is_none());
        assert!(slot.get().is_none());
        assert!(slot.is_released());
    }

    #[test]
    fn test_drain_empty_slot() {
        let slot: ResourceSlot<u8> = ResourceSlot::new();
        assert!(slot.drain().is_none());
        assert!(slot.is_released());
        assert!(slot.drain().is_none());
    }

    #[test]
    fn test_released_slot_rejects_fill() {
        let slot = ResourceSlot::new();
        slot.drain();
        assert!(slot.fill(Arc::new(1)).is_err());
        assert!(slot.get().is_none());
    }
}
