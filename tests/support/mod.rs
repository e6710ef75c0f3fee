//! Standalone fake SWD target for the scenario tests in this directory.
//!
//! Integration tests compile as a separate crate from `rp2350-rvdebug` and
//! can only see its public API, so they cannot reuse the crate-private
//! `line::mock::MockTarget` used by the library's own unit tests. This is a
//! second, independent implementation of the same `SwdLineIo` seam, built
//! directly against `DapTransactor`/`DebugModule` (the scenarios in §8 never
//! touch `Target`/`PioStateMachine`, so there is no need to fake a PIO
//! block too). Unlike the in-crate mock, this one actually interprets a
//! small RV32I subset so that resuming or single-stepping a hart has a real
//! effect on its registers, which the execute/trace scenarios depend on.

#![allow(dead_code)]

use rp2350_rvdebug::dm::regs::{CSR_DPC, GPR_BASE, RP2350_DM_BASE};
use rp2350_rvdebug::line::{Ack, SwdLineIo};
use rp2350_rvdebug::Error;

const CSW: u8 = 0x00;
const TAR: u8 = 0x04;
const DRW: u8 = 0x0C;

const DMI_DATA0: u32 = 0x04;
const DMI_DMCONTROL: u32 = 0x10;
const DMI_DMSTATUS: u32 = 0x11;
const DMI_COMMAND: u32 = 0x17;
const DMI_SBADDRESS0: u32 = 0x39;
const DMI_SBDATA0: u32 = 0x3c;

/// `dcsr`'s CSR number and its `step` bit (RISC-V External Debug Support
/// v0.13.2 §4.9), not part of this crate's public API since only the DM
/// driver itself needs to know it.
const CSR_DCSR: u16 = 0x7b0;
const DCSR_STEP_BIT: u32 = 1 << 2;

const DP_IDCODE_OR_ABORT: u8 = 0b00;
const DP_CTRL_STAT: u8 = 0b01;
const DP_SELECT: u8 = 0b10;
const DP_RDBUFF: u8 = 0b11;

pub const FAKE_IDCODE: u32 = 0x0BC1_2927;

/// Upper bound on instructions a free-running resume executes before giving
/// up looking for a self-referential `jal` to park on. Generous relative to
/// the handful of instructions any scenario program actually contains.
const FREE_RUN_BUDGET: u32 = 10_000;

#[derive(Clone, Copy, Default)]
struct HartModel {
    pc: u32,
    gprs: [u32; 32],
    dcsr: u32,
    halted: bool,
    resumeack: bool,
    havereset: bool,
}

pub struct FakeTarget {
    ctrl_stat: u32,
    csw: u32,
    tar: u32,
    posted: u32,
    last_ap_sel: u8,
    hartsel: u8,
    harts: [HartModel; 2],
    /// Generic DM registers (DMCONTROL/DMSTATUS/ABSTRACTCS/COMMAND/DATA0/
    /// SBCS/SBADDRESS0), addressed by the full TAR value exactly as real
    /// DRW accesses are.
    dm_regs: std::collections::HashMap<u32, u32>,
    sbaddress: u32,
    /// The target's actual bus memory: program words and data, reached both
    /// through SBA (SBADDRESS0/SBDATA0) and by the instruction interpreter
    /// fetching/storing at a hart's `pc`.
    bus_memory: std::collections::HashMap<u32, u32>,
    pub waits_seen: u32,
    pub wait_count: u32,
}

impl FakeTarget {
    pub fn new() -> Self {
        Self {
            ctrl_stat: 0,
            csw: 0,
            tar: 0,
            posted: 0,
            last_ap_sel: 0,
            hartsel: 0,
            harts: [HartModel::default(); 2],
            dm_regs: std::collections::HashMap::new(),
            sbaddress: 0,
            bus_memory: std::collections::HashMap::new(),
            waits_seen: 0,
            wait_count: 0,
        }
    }

    /// Pre-load `words` into bus memory starting at `base`, as if a loader
    /// had already written the program before `connect()`.
    pub fn load_program(&mut self, base: u32, words: &[u32]) {
        for (i, w) in words.iter().enumerate() {
            self.bus_memory.insert(base + (i as u32) * 4, *w);
        }
    }

    fn dmi_addr(reg: u32) -> u32 {
        RP2350_DM_BASE + reg * 4
    }

    fn ap_read(&mut self, addr: u8) -> u32 {
        match addr {
            CSW => self.csw,
            TAR => self.tar,
            DRW => self.dm_regs.get(&self.tar).copied().unwrap_or(0),
            _ => 0,
        }
    }

    fn ap_write(&mut self, addr: u8, value: u32) {
        match addr {
            CSW => self.csw = value,
            TAR => self.tar = value,
            DRW => {
                self.dm_regs.insert(self.tar, value);
                self.handle_drw_write(self.tar, value);
            }
            _ => {}
        }
    }

    fn handle_drw_write(&mut self, tar: u32, value: u32) {
        if tar == Self::dmi_addr(DMI_DMCONTROL) {
            self.handle_dmcontrol(value);
        } else if tar == Self::dmi_addr(DMI_SBADDRESS0) {
            self.sbaddress = value;
            let data = self.bus_memory.get(&value).copied().unwrap_or(0);
            self.dm_regs.insert(Self::dmi_addr(DMI_SBDATA0), data);
        } else if tar == Self::dmi_addr(DMI_SBDATA0) {
            self.bus_memory.insert(self.sbaddress, value);
        } else if tar == Self::dmi_addr(DMI_COMMAND) {
            self.handle_abstract_command(value);
        }
    }

    fn handle_dmcontrol(&mut self, dmcontrol: u32) {
        let haltreq = (dmcontrol >> 31) & 1 != 0;
        let resumereq = (dmcontrol >> 30) & 1 != 0;
        let hartreset = (dmcontrol >> 29) & 1 != 0;
        let ackhavereset = (dmcontrol >> 28) & 1 != 0;
        self.hartsel = ((dmcontrol >> 16) & 0xFF) as u8;
        let sel = self.hartsel as usize;

        if hartreset {
            let havereset = true;
            self.harts[sel] = HartModel { havereset, ..HartModel::default() };
        }
        if ackhavereset {
            self.harts[sel].havereset = false;
        }
        if haltreq {
            self.harts[sel].halted = true;
        }
        if resumereq {
            let single_step = self.harts[sel].dcsr & DCSR_STEP_BIT != 0;
            self.run_hart(sel, single_step);
            self.harts[sel].resumeack = true;
        }

        let h = &self.harts[sel];
        let mut status = 0u32;
        if h.halted {
            status |= (1 << 9) | (1 << 8); // allhalted / anyhalted
        }
        if h.resumeack {
            status |= (1 << 17) | (1 << 16); // allresumeack / anyresumeack
        }
        if h.havereset {
            status |= (1 << 19) | (1 << 18); // allhavereset / anyhavereset
        }
        self.dm_regs.insert(Self::dmi_addr(DMI_DMSTATUS), status);
    }

    /// Run hart `sel` either for exactly one retired instruction
    /// (`single_step`) or freely until it parks on a self-referential
    /// `jal` (the scenario programs' way of modeling "the rest of the
    /// program doesn't matter"), whichever comes first.
    fn run_hart(&mut self, sel: usize, single_step: bool) {
        let budget = if single_step { 1 } else { FREE_RUN_BUDGET };
        for _ in 0..budget {
            let pc = self.harts[sel].pc;
            let instr = self.bus_memory.get(&pc).copied().unwrap_or(0);
            let next_pc = execute_rv32i(instr, pc, &mut self.harts[sel].gprs);
            let parked = next_pc == pc;
            self.harts[sel].pc = next_pc;
            if single_step || parked {
                break;
            }
        }
        self.harts[sel].halted = single_step;
    }

    fn handle_abstract_command(&mut self, command: u32) {
        let transfer = (command >> 17) & 1 != 0;
        if !transfer {
            return;
        }
        let write = (command >> 16) & 1 != 0;
        let regno = (command & 0xFFFF) as u16;
        let sel = self.hartsel as usize;
        let data0_addr = Self::dmi_addr(DMI_DATA0);

        if write {
            let value = self.dm_regs.get(&data0_addr).copied().unwrap_or(0);
            self.write_regno(sel, regno, value);
        } else {
            let value = self.read_regno(sel, regno);
            self.dm_regs.insert(data0_addr, value);
        }
    }

    fn write_regno(&mut self, sel: usize, regno: u16, value: u32) {
        if regno == CSR_DPC {
            self.harts[sel].pc = value;
        } else if regno == CSR_DCSR {
            self.harts[sel].dcsr = value;
        } else if (GPR_BASE..GPR_BASE + 32).contains(&regno) {
            let i = (regno - GPR_BASE) as usize;
            if i != 0 {
                self.harts[sel].gprs[i] = value;
            }
        }
    }

    fn read_regno(&mut self, sel: usize, regno: u16) -> u32 {
        if regno == CSR_DPC {
            self.harts[sel].pc
        } else if regno == CSR_DCSR {
            self.harts[sel].dcsr
        } else if (GPR_BASE..GPR_BASE + 32).contains(&regno) {
            let i = (regno - GPR_BASE) as usize;
            self.harts[sel].gprs[i]
        } else {
            0
        }
    }
}

impl Default for FakeTarget {
    fn default() -> Self {
        Self::new()
    }
}

/// Execute one RV32I instruction against `gprs`, returning the next PC.
/// Only `addi` and `jal` are decoded, the only two opcodes the scenario
/// programs in this file use; anything else is treated as a four-byte nop
/// so an unrecognized fetch can't hang the interpreter.
fn execute_rv32i(instr: u32, pc: u32, gprs: &mut [u32; 32]) -> u32 {
    let opcode = instr & 0x7f;
    match opcode {
        0x13 => {
            let rd = ((instr >> 7) & 0x1f) as usize;
            let rs1 = ((instr >> 15) & 0x1f) as usize;
            let imm = (instr as i32) >> 20;
            let rs1_val = if rs1 == 0 { 0 } else { gprs[rs1] };
            let result = rs1_val.wrapping_add(imm as u32);
            if rd != 0 {
                gprs[rd] = result;
            }
            pc.wrapping_add(4)
        }
        0x6f => {
            let rd = ((instr >> 7) & 0x1f) as usize;
            let imm20 = (instr >> 31) & 1;
            let imm10_1 = (instr >> 21) & 0x3ff;
            let imm11 = (instr >> 20) & 1;
            let imm19_12 = (instr >> 12) & 0xff;
            let mut imm = (imm20 << 20) | (imm19_12 << 12) | (imm11 << 11) | (imm10_1 << 1);
            if imm20 != 0 {
                imm |= 0xFFF0_0000;
            }
            if rd != 0 {
                gprs[rd] = pc.wrapping_add(4);
            }
            pc.wrapping_add(imm)
        }
        _ => pc.wrapping_add(4),
    }
}

/// `addi rd, rs1, imm` (imm: -2048..=2047).
pub fn encode_addi(rd: u8, rs1: u8, imm: i32) -> u32 {
    let imm12 = (imm as u32) & 0xFFF;
    (imm12 << 20) | ((rs1 as u32) << 15) | ((rd as u32) << 7) | 0x13
}

/// `jal rd, offset` (offset: even, within ±1 MiB).
pub fn encode_jal(rd: u8, offset: i32) -> u32 {
    let off = offset as u32;
    let imm20 = (off >> 20) & 1;
    let imm19_12 = (off >> 12) & 0xff;
    let imm11 = (off >> 11) & 1;
    let imm10_1 = (off >> 1) & 0x3ff;
    (imm20 << 31) | (imm10_1 << 21) | (imm11 << 20) | (imm19_12 << 12) | ((rd as u32) << 7) | 0x6f
}

impl SwdLineIo for FakeTarget {
    fn shift_out(&mut self, _data: u32, _nbits: u8) {}

    fn packet(&mut self, request: u8, data_in_out: &mut u32, is_write: bool) -> Result<Ack, Error> {
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
                        *data_in_out = FAKE_IDCODE;
                    }
                }
                DP_CTRL_STAT => {
                    if is_write {
                        let clears = *data_in_out & 0b10_0010_0010;
                        self.ctrl_stat &= !clears;
                        self.ctrl_stat |= *data_in_out & 0xF000_0000;
                        self.ctrl_stat |= 0xC000_0000;
                    } else {
                        *data_in_out = self.ctrl_stat;
                    }
                }
                DP_SELECT => {
                    if is_write {
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
            self.ap_write(addr2_3 << 2, *data_in_out);
        } else {
            let fresh = self.ap_read(addr2_3 << 2);
            *data_in_out = self.posted;
            self.posted = fresh;
        }

        Ok(Ack::Ok)
    }

    fn set_frequency_khz(&mut self, khz: u32) -> Result<(), Error> {
        rp2350_rvdebug::line::validate_frequency_khz(khz)
    }

    fn frequency_khz(&self) -> u32 {
        1000
    }
}
