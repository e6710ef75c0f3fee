//! Per-hart control state machine and register cache (§4.3.3/§4.3.4).
//!
//! The RP2350 Debug Module exposes both harts through one `hartsel` field;
//! [`DebugModule::select_hart`] elides the DMCONTROL write when the target
//! hart is already selected. Each hart additionally carries a small
//! register cache so that repeated reads of an unchanged GPR/PC after a
//! halt do not re-issue an abstract command (mirrors the SELECT-caching
//! trick already used by the DAP transactor).

use super::regs::{self, Dmcontrol, CSR_DPC, DMI_DMCONTROL, DMI_DMSTATUS, GPR_BASE};
use super::DebugModule;
use crate::error::Error;
use crate::line::SwdLineIo;

/// CSR number for `dcsr`, used internally to drive single-step (§4.3.4).
const CSR_DCSR: u16 = 0x7b0;
/// `dcsr.step`, bit 2: when set, the hart halts again after retiring
/// exactly one instruction instead of running free.
const DCSR_STEP_BIT: u32 = 1 << 2;

/// One of the RP2350's two RISC-V harts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Hart {
    Hart0,
    Hart1,
}

impl Hart {
    pub fn from_index(index: u8) -> Result<Self, Error> {
        match index {
            0 => Ok(Hart::Hart0),
            1 => Ok(Hart::Hart1),
            _ => Err(Error::InvalidParameter),
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Hart::Hart0 => 0,
            Hart::Hart1 => 1,
        }
    }
}

/// Cached run/halt status for a hart, invalidated whenever an operation
/// changes (or might have changed) the hart's execution state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HaltState {
    /// Not yet observed since `connect()`/`init()`.
    Unknown,
    Running,
    Halted,
}

/// Cached GPRs and PC; `None` means "not known, re-fetch on next read".
#[derive(Copy, Clone, Debug)]
pub struct RegCache {
    pub gprs: [Option<u32>; 32],
    pub pc: Option<u32>,
}

impl RegCache {
    fn empty() -> Self {
        Self {
            gprs: [None; 32],
            pc: None,
        }
    }

    fn invalidate(&mut self) {
        *self = Self::empty();
    }
}

pub(super) struct HartState {
    halt_state: HaltState,
    cache: RegCache,
}

impl HartState {
    pub(super) fn new() -> Self {
        Self {
            halt_state: HaltState::Unknown,
            cache: RegCache::empty(),
        }
    }

    pub(super) fn halt_state(&self) -> HaltState {
        self.halt_state
    }
}

impl<IO: SwdLineIo> DebugModule<IO> {
    fn poll_dmstatus(&mut self, want: impl Fn(regs::Dmstatus) -> bool) -> Result<(), Error> {
        for _ in 0..self.polls.dm_handshake {
            let status = self.dmstatus()?;
            if want(status) {
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }

    fn write_dmcontrol(&mut self, f: impl FnOnce(&mut Dmcontrol)) -> Result<(), Error> {
        let mut dmcontrol: Dmcontrol = self.dmcontrol_shadow.into();
        f(&mut dmcontrol);
        self.write_dm(DMI_DMCONTROL, dmcontrol.into())?;
        self.dmcontrol_shadow = dmcontrol.into();
        Ok(())
    }

    /// Request a halt and block until DMSTATUS reflects it (§4.3.4).
    pub fn halt(&mut self, hart: Hart) -> Result<(), Error> {
        self.require_initialized()?;
        if self.hart_state(hart).halt_state == HaltState::Halted {
            return Err(Error::AlreadyHalted);
        }
        self.select_hart(hart)?;
        self.write_dmcontrol(|c| c.set_haltreq(true))?;
        self.poll_dmstatus(|s| s.anyhalted())?;
        self.write_dmcontrol(|c| c.set_haltreq(false))?;

        let state = self.hart_state_mut(hart);
        state.halt_state = HaltState::Halted;
        state.cache.invalidate();
        log::debug!("dm: hart {} halted", hart.index());
        Ok(())
    }

    /// Resume a halted hart (§4.3.4).
    pub fn resume(&mut self, hart: Hart) -> Result<(), Error> {
        self.require_initialized()?;
        if self.hart_state(hart).halt_state != HaltState::Halted {
            return Err(Error::NotHalted);
        }
        self.select_hart(hart)?;
        self.write_dmcontrol(|c| c.set_resumereq(true))?;
        self.poll_dmstatus(|s| s.anyresumeack())?;
        self.write_dmcontrol(|c| c.set_resumereq(false))?;

        let state = self.hart_state_mut(hart);
        state.halt_state = HaltState::Running;
        state.cache.invalidate();
        log::debug!("dm: hart {} resumed", hart.index());
        Ok(())
    }

    /// Retire exactly one instruction on a halted hart, via `dcsr.step`
    /// (§4.3.4), and leave it halted again.
    pub fn step(&mut self, hart: Hart) -> Result<(), Error> {
        self.require_initialized()?;
        if self.hart_state(hart).halt_state != HaltState::Halted {
            return Err(Error::NotHalted);
        }
        self.select_hart(hart)?;

        let dcsr = self.access_register(CSR_DCSR, None)?;
        self.access_register(CSR_DCSR, Some(dcsr | DCSR_STEP_BIT))?;

        self.write_dmcontrol(|c| c.set_resumereq(true))?;
        self.poll_dmstatus(|s| s.anyresumeack())?;
        self.write_dmcontrol(|c| c.set_resumereq(false))?;
        self.poll_dmstatus(|s| s.anyhalted())?;

        self.select_hart(hart)?;
        let dcsr = self.access_register(CSR_DCSR, None)?;
        self.access_register(CSR_DCSR, Some(dcsr & !DCSR_STEP_BIT))?;

        self.hart_state_mut(hart).cache.invalidate();
        Ok(())
    }

    /// Pulse the per-hart reset, optionally halting the hart the instant it
    /// comes out of reset instead of letting it run free (§4.3.4).
    pub fn reset(&mut self, hart: Hart, halt_after: bool) -> Result<(), Error> {
        self.require_initialized()?;
        self.select_hart(hart)?;

        self.write_dmcontrol(|c| {
            c.set_hartreset(true);
            c.set_haltreq(halt_after);
        })?;
        self.write_dmcontrol(|c| c.set_hartreset(false))?;

        self.poll_dmstatus(|s| s.anyhavereset())?;
        self.write_dmcontrol(|c| c.set_ackhavereset(true))?;
        self.write_dmcontrol(|c| c.set_ackhavereset(false))?;

        if halt_after {
            self.poll_dmstatus(|s| s.anyhalted())?;
            self.write_dmcontrol(|c| c.set_haltreq(false))?;
        }

        let state = self.hart_state_mut(hart);
        state.halt_state = if halt_after { HaltState::Halted } else { HaltState::Running };
        state.cache.invalidate();
        log::debug!("dm: hart {} reset (halt_after={halt_after})", hart.index());
        Ok(())
    }

    fn require_halted(&self, hart: Hart) -> Result<(), Error> {
        if self.hart_state(hart).halt_state == HaltState::Halted {
            Ok(())
        } else {
            Err(Error::NotHalted)
        }
    }

    pub fn read_pc(&mut self, hart: Hart) -> Result<u32, Error> {
        self.require_halted(hart)?;
        if let Some(pc) = self.hart_state(hart).cache.pc {
            if self.caching_enabled {
                return Ok(pc);
            }
        }
        self.select_hart(hart)?;
        let pc = self.access_register(CSR_DPC, None)?;
        self.hart_state_mut(hart).cache.pc = Some(pc);
        Ok(pc)
    }

    pub fn write_pc(&mut self, hart: Hart, value: u32) -> Result<(), Error> {
        self.require_halted(hart)?;
        self.select_hart(hart)?;
        self.access_register(CSR_DPC, Some(value))?;
        self.hart_state_mut(hart).cache.pc = Some(value);
        Ok(())
    }

    fn gpr_index(index: u8) -> Result<u16, Error> {
        if index < 32 {
            Ok(GPR_BASE + index as u16)
        } else {
            Err(Error::InvalidParameter)
        }
    }

    pub fn read_reg(&mut self, hart: Hart, index: u8) -> Result<u32, Error> {
        self.require_halted(hart)?;
        if index == 0 {
            return Ok(0);
        }
        let regno = Self::gpr_index(index)?;
        if self.caching_enabled {
            if let Some(v) = self.hart_state(hart).cache.gprs[index as usize] {
                return Ok(v);
            }
        }
        self.select_hart(hart)?;
        let v = self.access_register(regno, None)?;
        self.hart_state_mut(hart).cache.gprs[index as usize] = Some(v);
        Ok(v)
    }

    /// x0 is hardwired to zero; a write to it is a no-op (§8 invariant #4).
    pub fn write_reg(&mut self, hart: Hart, index: u8, value: u32) -> Result<(), Error> {
        self.require_halted(hart)?;
        if index == 0 {
            return Ok(());
        }
        let regno = Self::gpr_index(index)?;
        self.select_hart(hart)?;
        self.access_register(regno, Some(value))?;
        self.hart_state_mut(hart).cache.gprs[index as usize] = Some(value);
        Ok(())
    }

    /// Read all 32 GPRs, issuing one abstract command per register (§4.3.2:
    /// there is no batched "read all" abstract command).
    pub fn read_all_regs(&mut self, hart: Hart) -> Result<[u32; 32], Error> {
        self.require_halted(hart)?;
        self.select_hart(hart)?;
        let mut out = [0u32; 32];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.read_reg(hart, i as u8)?;
        }
        Ok(out)
    }

    pub fn read_csr(&mut self, hart: Hart, csr: u16) -> Result<u32, Error> {
        self.require_halted(hart)?;
        if csr > 0x0FFF {
            return Err(Error::InvalidParameter);
        }
        self.select_hart(hart)?;
        self.access_register(csr, None)
    }

    pub fn write_csr(&mut self, hart: Hart, csr: u16, value: u32) -> Result<(), Error> {
        self.require_halted(hart)?;
        if csr > 0x0FFF {
            return Err(Error::InvalidParameter);
        }
        self.select_hart(hart)?;
        self.access_register(csr, Some(value))?;
        Ok(())
    }
}
