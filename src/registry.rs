//! Process-wide PIO/state-machine registry.
//!
//! Two PIO blocks, four state machines each: eight slots total, each held by
//! at most one [`Target`](crate::Target) at a time. Registration happens on
//! connect-time resource acquisition, release on `Target` destruction (via
//! `Drop`). The table itself is the only state shared across target handles
//! (§5 of the design notes), so it is guarded by a `critical-section` token
//! rather than relying on any particular RTOS/executor's mutex.

use crate::error::Error;
use core::cell::Cell;

/// One of the two PIO blocks on an RP2350.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PioBlockId {
    Pio0,
    Pio1,
}

/// A state machine index within a PIO block, 0..=3.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StateMachineId(u8);

impl StateMachineId {
    /// Construct a state machine index, rejecting anything outside 0..=3.
    pub const fn new(idx: u8) -> Result<Self, Error> {
        if idx <= 3 {
            Ok(Self(idx))
        } else {
            Err(Error::InvalidConfiguration)
        }
    }

    pub const fn index(self) -> u8 {
        self.0
    }
}

/// A concrete (PIO block, state machine) slot, as opposed to the `auto`
/// selection accepted by [`crate::Config`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Slot {
    pub block: PioBlockId,
    pub sm: StateMachineId,
}

const BLOCKS: usize = 2;
const SMS_PER_BLOCK: usize = 4;
const SLOTS: usize = BLOCKS * SMS_PER_BLOCK;

fn slot_index(slot: Slot) -> usize {
    let block = match slot.block {
        PioBlockId::Pio0 => 0,
        PioBlockId::Pio1 => 1,
    };
    block * SMS_PER_BLOCK + slot.sm.index() as usize
}

/// Table of eight owner flags; `true` means the slot is currently reserved.
///
/// This never stores *which* target owns a slot — only whether it is free —
/// since the only cross-target operation the design calls for is "is this
/// slot free", never "who owns it". `Cell<bool>` plus a `critical-section`
/// guard around every access keeps this sound without requiring an atomics
/// backend, matching how single-core RP-class firmware typically guards
/// shared statics.
struct Registry {
    reserved: [Cell<bool>; SLOTS],
}

// SAFETY: all access to `REGISTRY` goes through `critical_section::with`,
// so the interior `Cell`s are never touched concurrently.
unsafe impl Sync for Registry {}

static REGISTRY: Registry = Registry {
    reserved: [
        Cell::new(false),
        Cell::new(false),
        Cell::new(false),
        Cell::new(false),
        Cell::new(false),
        Cell::new(false),
        Cell::new(false),
        Cell::new(false),
    ],
};

/// Reserve a specific slot. Fails with [`Error::ResourceBusy`] if occupied.
pub fn reserve(slot: Slot) -> Result<(), Error> {
    critical_section::with(|_| {
        let cell = &REGISTRY.reserved[slot_index(slot)];
        if cell.get() {
            Err(Error::ResourceBusy)
        } else {
            cell.set(true);
            log::trace!("registry: reserved {slot:?}");
            Ok(())
        }
    })
}

/// Reserve the first free slot, block-major then state-machine-minor order.
pub fn reserve_any() -> Result<Slot, Error> {
    critical_section::with(|_| {
        for (i, cell) in REGISTRY.reserved.iter().enumerate() {
            if !cell.get() {
                cell.set(true);
                let slot = Slot {
                    block: if i < SMS_PER_BLOCK {
                        PioBlockId::Pio0
                    } else {
                        PioBlockId::Pio1
                    },
                    sm: StateMachineId::new((i % SMS_PER_BLOCK) as u8).unwrap(),
                };
                log::trace!("registry: auto-reserved {slot:?}");
                return Ok(slot);
            }
        }
        Err(Error::ResourceBusy)
    })
}

/// Release a previously reserved slot. Releasing an already-free slot is a
/// no-op: `Target::disconnect` keeps the reservation while `Target::drop`
/// releases it unconditionally, and a double-release must never panic.
pub fn release(slot: Slot) {
    critical_section::with(|_| {
        REGISTRY.reserved[slot_index(slot)].set(false);
    });
    log::trace!("registry: released {slot:?}");
}

/// True if the given slot is currently reserved by some target.
pub fn is_reserved(slot: Slot) -> bool {
    critical_section::with(|_| REGISTRY.reserved[slot_index(slot)].get())
}
