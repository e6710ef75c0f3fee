//! Software model of an SWD target, used by every unit test in this crate
//! that only needs line/DAP-level behavior, plus just enough Debug Module
//! awareness (DMCONTROL -> DMSTATUS) for the `dm` module's own unit tests to
//! exercise the halt/resume/reset state machine without a second mock.
//! Scenario tests in `tests/` layer a fuller abstract-command/SBA model on
//! top of the same `SwdLineIo` seam. Not part of the public API.

#![cfg(test)]

use super::{Ack, SwdLineIo};
use crate::error::Error;

/// DMI register numbers for DMCONTROL/DMSTATUS, duplicated from
/// `dm::regs` (rather than depending on it from the line layer) since this
/// mock only ever needs to recognize these two addresses.
const DMI_DATA0: u32 = 0x04;
const DMI_DMCONTROL: u32 = 0x10;
const DMI_DMSTATUS: u32 = 0x11;
const DMI_COMMAND: u32 = 0x17;
const DMI_SBCS: u32 = 0x38;
const DMI_SBADDRESS0: u32 = 0x39;
const DMI_SBDATA0: u32 = 0x3c;
const DM_BASE: u32 = 0x0000_0000;

/// Low 28 bits match the RP2350's JEP106-derived IDCODE per §8 scenario S1;
/// the top nibble (DP version/designer high bits) is deliberately
/// target-accurate but not asserted on by any test beyond the low 28 bits.
pub const RP2350_IDCODE: u32 = 0x0BC1_2927;

const DP_IDCODE_OR_ABORT: u8 = 0b00;
const DP_CTRL_STAT: u8 = 0b01;
const DP_SELECT: u8 = 0b10;
const DP_RDBUFF: u8 = 0b11;

#[derive(Clone, Copy)]
struct ApEntry {
    ap_sel: u8,
    addr: u8,
    value: u32,
}

const CSW: u8 = 0x00;
const TAR: u8 = 0x04;
const DRW: u8 = 0x0C;

pub struct MockTarget {
    ctrl_stat: u32,
    /// CSW/TAR register contents, per `(ap_sel, addr)`.
    ap_regs: heapless::Vec<ApEntry, 16>,
    /// The addressable word store every DRW access actually targets,
    /// indexed by the full 32-bit address last latched into TAR. Models a
    /// real MEM-AP: DRW never carries an address of its own.
    memory: heapless::FnvIndexMap<u32, u32, 64>,
    posted: u32,
    last_ap_sel: u8,
    havereset_sticky: bool,
    sbreadonaddr: bool,
    sbaddress: u32,
    /// Separate from `memory`: this is the target's bus-addressed memory,
    /// reached only through SBADDRESS0/SBDATA0, as opposed to `memory`
    /// which backs DMI-register-addressed DRW accesses.
    sba_memory: heapless::FnvIndexMap<u32, u32, 32>,
    /// Abstract-command-addressed register file (GPRs and CSRs), keyed by
    /// `(hartsel, regno)` exactly as DMCONTROL.hartsel and the COMMAND
    /// register together address it. Separate from `memory` for the same
    /// reason `sba_memory` is: DATA0/COMMAND are one fixed DMI address each,
    /// but they address an entire per-hart register file, and two harts
    /// must never alias each other's GPRs/CSRs.
    abstract_regs: heapless::FnvIndexMap<(u8, u16), u32, 64>,
    /// `DMCONTROL.hartsel` as last written, used to key `abstract_regs`.
    hartsel: u8,

    pub wait_count: u32,
    pub fault_once: bool,
    pub waits_seen: u32,
    pub select_writes: u32,
    pub sticky_cleared: bool,
}

impl MockTarget {
    pub fn new() -> Self {
        Self {
            ctrl_stat: 0,
            ap_regs: heapless::Vec::new(),
            memory: heapless::FnvIndexMap::new(),
            posted: 0,
            last_ap_sel: 0,
            havereset_sticky: false,
            sbreadonaddr: false,
            sbaddress: 0,
            sba_memory: heapless::FnvIndexMap::new(),
            abstract_regs: heapless::FnvIndexMap::new(),
            hartsel: 0,
            wait_count: 0,
            fault_once: false,
            waits_seen: 0,
            select_writes: 0,
            sticky_cleared: false,
        }
    }

    fn reg_read(&self, ap_sel: u8, addr: u8) -> u32 {
        self.ap_regs
            .iter()
            .find(|e| e.ap_sel == ap_sel && e.addr == addr)
            .map(|e| e.value)
            .unwrap_or(0)
    }

    fn reg_write(&mut self, ap_sel: u8, addr: u8, value: u32) {
        if let Some(e) = self
            .ap_regs
            .iter_mut()
            .find(|e| e.ap_sel == ap_sel && e.addr == addr)
        {
            e.value = value;
        } else {
            let _ = self.ap_regs.push(ApEntry { ap_sel, addr, value });
        }
    }

    fn ap_read(&self, ap_sel: u8, addr: u8) -> u32 {
        match addr {
            CSW | TAR => self.reg_read(ap_sel, addr),
            DRW => {
                let tar = self.reg_read(ap_sel, TAR);
                self.memory.get(&tar).copied().unwrap_or(0)
            }
            _ => 0,
        }
    }

    fn ap_write(&mut self, ap_sel: u8, addr: u8, value: u32) {
        match addr {
            CSW | TAR => self.reg_write(ap_sel, addr, value),
            DRW => {
                let tar = self.reg_read(ap_sel, TAR);
                if tar == DM_BASE + DMI_DMCONTROL * 4 {
                    self.sync_dmstatus_from_dmcontrol(value);
                } else if tar == DM_BASE + DMI_SBCS * 4 {
                    self.sbreadonaddr = (value >> 20) & 1 != 0;
                } else if tar == DM_BASE + DMI_SBADDRESS0 * 4 {
                    self.sbaddress = value;
                    if self.sbreadonaddr {
                        let data = self.sba_memory.get(&value).copied().unwrap_or(0);
                        let _ = self.memory.insert(DM_BASE + DMI_SBDATA0 * 4, data);
                    }
                } else if tar == DM_BASE + DMI_SBDATA0 * 4 {
                    let _ = self.sba_memory.insert(self.sbaddress, value);
                } else if tar == DM_BASE + DMI_COMMAND * 4 {
                    self.dispatch_abstract_command(value);
                }
                let _ = self.memory.insert(tar, value);
            }
            _ => {}
        }
    }

    /// Derive DMSTATUS purely from the DMCONTROL bits just written, plus the
    /// sticky `havereset` flag a hartreset pulse sets until acknowledged.
    /// Good enough to drive the halt/resume/reset poll loops in `dm`'s own
    /// unit tests; it is not a simulation of actual hart execution.
    fn sync_dmstatus_from_dmcontrol(&mut self, dmcontrol: u32) {
        let haltreq = (dmcontrol >> 31) & 1 != 0;
        let resumereq = (dmcontrol >> 30) & 1 != 0;
        let hartreset = (dmcontrol >> 29) & 1 != 0;
        let ackhavereset = (dmcontrol >> 28) & 1 != 0;
        self.hartsel = ((dmcontrol >> 16) & 0xFF) as u8;

        if hartreset {
            self.havereset_sticky = true;
        }
        if ackhavereset {
            self.havereset_sticky = false;
        }

        let mut status = 0u32;
        if haltreq {
            status |= (1 << 9) | (1 << 8); // allhalted / anyhalted
        }
        if resumereq {
            status |= (1 << 17) | (1 << 16); // allresumeack / anyresumeack
        }
        if self.havereset_sticky {
            status |= (1 << 19) | (1 << 18); // allhavereset / anyhavereset
        }
        let _ = self.memory.insert(DM_BASE + DMI_DMSTATUS * 4, status);
    }

    /// Carry out the "access register" abstract command exactly like real
    /// hardware would: a write moves DATA0 into the addressed register, a
    /// read moves the addressed register's value into DATA0 so the
    /// subsequent DATA0 read sees it.
    fn dispatch_abstract_command(&mut self, command: u32) {
        let transfer = (command >> 17) & 1 != 0;
        if !transfer {
            return;
        }
        let write = (command >> 16) & 1 != 0;
        let regno = (command & 0xFFFF) as u16;
        let key = (self.hartsel, regno);
        if write {
            let data0 = self.memory.get(&(DM_BASE + DMI_DATA0 * 4)).copied().unwrap_or(0);
            let _ = self.abstract_regs.insert(key, data0);
        } else {
            let v = self.abstract_regs.get(&key).copied().unwrap_or(0);
            let _ = self.memory.insert(DM_BASE + DMI_DATA0 * 4, v);
        }
    }

    /// Directly poke the word-addressed memory backing DRW accesses, so
    /// DM-aware tests can pre-seed or inspect a register without going
    /// through a full TAR/DRW sequence.
    pub fn mem_slot(&self, address: u32) -> u32 {
        self.memory.get(&address).copied().unwrap_or(0)
    }

    pub fn set_mem_slot(&mut self, address: u32, value: u32) {
        let _ = self.memory.insert(address, value);
    }
}

impl Default for MockTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl SwdLineIo for MockTarget {
    fn shift_out(&mut self, _data: u32, _nbits: u8) {}

    fn packet(&mut self, request: u8, data_in_out: &mut u32, is_write: bool) -> Result<Ack, Error> {
        if self.fault_once {
            self.fault_once = false;
            self.ctrl_stat |= 0b10_0010_0010; // stickyerr/stickyorun/stickycmp-ish bits
            return Ok(Ack::Fault);
        }
        if self.wait_count > 0 {
            self.wait_count -= 1;
            self.waits_seen += 1;
            return Ok(Ack::Wait);
        }

        let apndp = (request >> 1) & 1;
        let addr2_3 = (request >> 3) & 0b11;
        let is_dp = apndp == 0;

        if is_dp {
            match addr2_3 {
                DP_IDCODE_OR_ABORT => {
                    if !is_write {
                        *data_in_out = RP2350_IDCODE;
                    }
                }
                DP_CTRL_STAT => {
                    if is_write {
                        let had_sticky = self.ctrl_stat & 0b10_0010_0010 != 0;
                        let clears = *data_in_out & 0b10_0010_0010;
                        if clears != 0 && had_sticky {
                            self.sticky_cleared = true;
                        }
                        self.ctrl_stat &= !clears;
                        self.ctrl_stat |= *data_in_out & 0xF000_0000; // preserve power bits
                        self.ctrl_stat |= 0xC000_0000; // power-up always acked immediately in the mock
                    } else {
                        *data_in_out = self.ctrl_stat;
                    }
                }
                DP_SELECT => {
                    if is_write {
                        self.select_writes += 1;
                        self.last_ap_sel = ((*data_in_out >> 24) & 0xFF) as u8;
                    }
                }
                DP_RDBUFF => {
                    if !is_write {
                        *data_in_out = self.posted;
                    }
                }
                _ => unreachable!(),
            }
        } else if is_write {
            self.ap_write(self.last_ap_sel, addr2_3 << 2, *data_in_out);
        } else {
            let fresh = self.ap_read(self.last_ap_sel, addr2_3 << 2);
            *data_in_out = self.posted;
            self.posted = fresh;
        }

        Ok(Ack::Ok)
    }

    fn set_frequency_khz(&mut self, khz: u32) -> Result<(), Error> {
        super::validate_frequency_khz(khz)
    }

    fn frequency_khz(&self) -> u32 {
        1000
    }
}
