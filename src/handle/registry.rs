//! Generational handle registry.
//!
//! Owning handles issued here are opaque `u64` values packing a slot index
//! and a generation counter. Destroying a handle bumps the slot's
//! generation, so stale or forged handles are rejected with a
//! `StaleHandle` error instead of touching freed memory.

use crate::error::{BridgeError, Result};
use crate::{bail, bridge_error, metrics};
use parking_lot::Mutex;
use tracing::debug;

/// Opaque handle value as seen by C callers. `0` is never issued.
pub type RawHandle = u64;

fn pack(index: u32, generation: u32) -> RawHandle {
    (u64::from(generation) << 32) | u64::from(index)
}

fn unpack(handle: RawHandle) -> (u32, u32) {
    ((handle & 0xFFFF_FFFF) as u32, (handle >> 32) as u32)
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

struct Slab<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Slab<T> {
    fn slot(&self, handle: RawHandle) -> Option<&Slot<T>> {
        let (index, generation) = unpack(handle);
        self.slots
            .get(index as usize)
            .filter(|slot| slot.generation == generation && slot.value.is_some())
    }

    fn slot_mut(&mut self, handle: RawHandle) -> Option<&mut Slot<T>> {
        let (index, generation) = unpack(handle);
        self.slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == generation && slot.value.is_some())
    }
}

/// Per-type registry of generational handles
pub struct HandleRegistry<T> {
    name: &'static str,
    capacity: usize,
    slab: Mutex<Slab<T>>,
}

impl<T> HandleRegistry<T> {
    /// Create a registry holding at most `capacity` live handles
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            capacity: capacity.min(u32::MAX as usize),
            slab: Mutex::new(Slab {
                slots: Vec::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Create a registry sized by the installed configuration
    pub fn from_config(name: &'static str) -> Self {
        Self::new(name, crate::config::current().max_tracked_handles)
    }

    /// Registry name used in logs
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Take ownership of `value` and issue a handle for it
    pub fn insert(&self, value: T) -> Result<RawHandle> {
        let mut slab = self.slab.lock();
        if slab.live >= self.capacity {
            bail!(BridgeError::ResourceLimit(format!(
                "{} registry holds {} live handles",
                self.name, slab.live
            )));
        }

        let handle = match slab.free.pop() {
            Some(index) => {
                let slot = &mut slab.slots[index as usize];
                slot.value = Some(value);
                pack(index, slot.generation)
            }
            None => {
                let index = slab.slots.len() as u32;
                slab.slots.push(Slot {
                    generation: 1,
                    value: Some(value),
                });
                pack(index, 1)
            }
        };
        slab.live += 1;
        metrics::global().record_handle_created();

        debug!(registry = self.name, handle, "Issued handle");
        Ok(handle)
    }

    /// Run `f` with a shared reference to the object behind `handle`
    pub fn with<R>(&self, handle: RawHandle, f: impl FnOnce(&T) -> R) -> Result<R> {
        let slab = self.slab.lock();
        match slab.slot(handle).and_then(|slot| slot.value.as_ref()) {
            Some(value) => Ok(f(value)),
            None => Err(bridge_error!(BridgeError::StaleHandle(handle))),
        }
    }

    /// Run `f` with a mutable reference to the object behind `handle`
    pub fn with_mut<R>(&self, handle: RawHandle, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut slab = self.slab.lock();
        match slab.slot_mut(handle).and_then(|slot| slot.value.as_mut()) {
            Some(value) => Ok(f(value)),
            None => Err(bridge_error!(BridgeError::StaleHandle(handle))),
        }
    }

    /// Invalidate `handle` and return the object it owned
    pub fn remove(&self, handle: RawHandle) -> Result<T> {
        let mut slab = self.slab.lock();
        let value = match slab.slot_mut(handle) {
            Some(slot) => {
                let value = slot.value.take();
                slot.generation = match slot.generation.wrapping_add(1) {
                    0 => 1,
                    next => next,
                };
                value
            }
            None => None,
        };
        let Some(value) = value else {
            bail!(BridgeError::StaleHandle(handle));
        };

        let (index, _) = unpack(handle);
        slab.free.push(index);
        slab.live -= 1;
        metrics::global().record_handle_destroyed();

        debug!(registry = self.name, handle, "Released handle");
        Ok(value)
    }

    /// Number of live handles
    pub fn len(&self) -> usize {
        self.slab.lock().live
    }

    /// True when no handle is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
