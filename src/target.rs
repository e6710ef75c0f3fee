//! The [`Target`] handle (§3, §6): the single entry point applications use
//! to bring up a link to the RP2350, drive its Debug Module, and tear the
//! link back down.

use crate::config::{Config, PioBlock, StateMachine};
use crate::dap::{decode_idcode, DapTransactor};
use crate::dm::{DebugModule, Hart, HaltState, TraceCallback, TraceOptions, TraceRecord};
use crate::error::{Detail, Error};
use crate::line::pio::{PioStateMachine, PioSwd};
use crate::line::validate_frequency_khz;
use crate::registry::{self, PioBlockId, StateMachineId, Slot};

/// Decoded IDCODE fields plus the raw word, returned by
/// [`Target::get_target_info`].
#[derive(Copy, Clone, Debug)]
pub struct TargetInfo {
    pub idcode: u32,
    pub revision: u8,
    pub part_no: u16,
    pub designer: u16,
}

/// Which PIO slot (if any) a [`Target`] currently holds.
#[derive(Copy, Clone, Debug, Default)]
pub struct ResourceUsage {
    pub pio_block: Option<PioBlockId>,
    pub state_machine: Option<StateMachineId>,
}

/// Owns the link to one RP2350-class target: the PIO/state-machine
/// reservation, the DAP transactor, and (once connected) the Debug Module
/// driver for both harts.
pub struct Target<SM: PioStateMachine> {
    config: Config,
    slot: Option<Slot>,
    dm: Option<DebugModule<PioSwd<SM>>>,
    connected: bool,
    idcode: Option<u32>,
    last_error: Option<Error>,
    last_error_detail: Detail,
}

impl<SM: PioStateMachine> Target<SM> {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            slot: None,
            dm: None,
            connected: false,
            idcode: None,
            last_error: None,
            last_error_detail: Detail::new(),
        }
    }

    fn resolve_slot(&self) -> Result<Slot, Error> {
        match (self.config.pio_block, self.config.state_machine) {
            (PioBlock::Auto, StateMachine::Auto) => registry::reserve_any(),
            (PioBlock::Specific(block), StateMachine::Specific(sm)) => {
                let slot = Slot { block, sm };
                registry::reserve(slot)?;
                Ok(slot)
            }
            // A partially-specified resource (one side pinned, the other
            // `Auto`) isn't a combination the registry can resolve: `reserve_any`
            // has no notion of "any state machine, but only within this block".
            _ => Err(Error::InvalidConfiguration),
        }
    }

    /// Bring the link up: claim a PIO slot, drive the ADIv5.2 wakeup and
    /// line reset, confirm IDCODE, then activate the Debug Module (§4.3.1).
    /// `sm` is the board's concrete PIO state machine handle, consumed for
    /// the lifetime of the connection.
    pub fn connect(&mut self, sm: SM) -> Result<(), Error> {
        if self.connected {
            return self.fail(Error::InvalidState);
        }
        if let Err(e) = validate_frequency_khz(self.config.freq_khz) {
            return self.fail(e);
        }
        let slot = match self.resolve_slot() {
            Ok(slot) => slot,
            Err(e) => return self.fail(e),
        };
        let result = self.connect_with_slot(sm, slot);
        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                registry::release(slot);
                self.fail(e)
            }
        }
    }

    fn connect_with_slot(&mut self, sm: SM, slot: Slot) -> Result<(), Error> {
        let io = PioSwd::new(sm, self.config.swclk_pin, self.config.swdio_pin, self.config.freq_khz);
        let mut dap = DapTransactor::new(io, self.config.retry_count);
        dap.wake_and_reset();
        let idcode = dap.read_idcode()?;
        log::info!("target: connected, idcode {idcode:#010x}");

        let mut dm = DebugModule::new(dap, self.config.dm_ap_sel, self.config.enable_caching, self.config.polls);
        dm.init()?;

        self.slot = Some(slot);
        self.dm = Some(dm);
        self.idcode = Some(idcode);
        self.connected = true;
        Ok(())
    }

    /// Tear down the DAP/DM state and stop the PIO state machine, but keep
    /// the PIO slot reserved: only dropping the handle releases it, so a
    /// disconnected-but-still-owned `Target` can't have its pins stolen by
    /// a second `Target::connect` elsewhere (§5).
    pub fn disconnect(&mut self) {
        if let Some(mut dm) = self.dm.take() {
            dm.dap_mut().io_mut().stop();
        }
        self.idcode = None;
        self.connected = false;
        log::debug!("target: disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn read_idcode(&mut self) -> Result<u32, Error> {
        self.with_dm(|dm| dm.dap_mut().read_idcode())
    }

    pub fn get_target_info(&mut self) -> Result<TargetInfo, Error> {
        let idcode = self.idcode.ok_or(Error::NotConnected)?;
        let decoded = decode_idcode(idcode);
        Ok(TargetInfo {
            idcode,
            revision: decoded.revision(),
            part_no: decoded.part_no(),
            designer: decoded.designer(),
        })
    }

    pub fn get_last_error_detail(&self) -> &str {
        &self.last_error_detail
    }

    pub fn last_error(&self) -> Option<Error> {
        self.last_error
    }

    pub fn set_frequency_khz(&mut self, khz: u32) -> Result<(), Error> {
        validate_frequency_khz(khz)?;
        self.with_dm(|dm| dm.dap_mut().set_frequency_khz(khz))
    }

    pub fn frequency_khz(&self) -> Result<u32, Error> {
        self.dm.as_ref().map(|dm| dm.dap().frequency_khz()).ok_or(Error::NotConnected)
    }

    pub fn query_resource_usage(&self) -> ResourceUsage {
        match self.slot {
            Some(slot) => ResourceUsage {
                pio_block: Some(slot.block),
                state_machine: Some(slot.sm),
            },
            None => ResourceUsage::default(),
        }
    }

    pub fn halt_state(&self, hart: Hart) -> Result<HaltState, Error> {
        self.dm.as_ref().map(|dm| dm.halt_state(hart)).ok_or(Error::NotConnected)
    }

    pub fn halt(&mut self, hart: Hart) -> Result<(), Error> {
        self.with_dm(|dm| dm.halt(hart))
    }

    pub fn resume(&mut self, hart: Hart) -> Result<(), Error> {
        self.with_dm(|dm| dm.resume(hart))
    }

    pub fn step(&mut self, hart: Hart) -> Result<(), Error> {
        self.with_dm(|dm| dm.step(hart))
    }

    pub fn reset(&mut self, hart: Hart, halt_after: bool) -> Result<(), Error> {
        self.with_dm(|dm| dm.reset(hart, halt_after))
    }

    pub fn read_pc(&mut self, hart: Hart) -> Result<u32, Error> {
        self.with_dm(|dm| dm.read_pc(hart))
    }

    pub fn write_pc(&mut self, hart: Hart, value: u32) -> Result<(), Error> {
        self.with_dm(|dm| dm.write_pc(hart, value))
    }

    pub fn read_reg(&mut self, hart: Hart, index: u8) -> Result<u32, Error> {
        self.with_dm(|dm| dm.read_reg(hart, index))
    }

    pub fn write_reg(&mut self, hart: Hart, index: u8, value: u32) -> Result<(), Error> {
        self.with_dm(|dm| dm.write_reg(hart, index, value))
    }

    pub fn read_all_regs(&mut self, hart: Hart) -> Result<[u32; 32], Error> {
        self.with_dm(|dm| dm.read_all_regs(hart))
    }

    pub fn read_csr(&mut self, hart: Hart, csr: u16) -> Result<u32, Error> {
        self.with_dm(|dm| dm.read_csr(hart, csr))
    }

    pub fn write_csr(&mut self, hart: Hart, csr: u16, value: u32) -> Result<(), Error> {
        self.with_dm(|dm| dm.write_csr(hart, csr, value))
    }

    pub fn read_mem32(&mut self, address: u32) -> Result<u32, Error> {
        self.with_dm(|dm| dm.read_mem32(address))
    }

    pub fn write_mem32(&mut self, address: u32, value: u32) -> Result<(), Error> {
        self.with_dm(|dm| dm.write_mem32(address, value))
    }

    pub fn trace(
        &mut self,
        hart: Hart,
        opts: TraceOptions,
        callback: &mut TraceCallback,
    ) -> Result<u32, Error> {
        self.with_dm(|dm| dm.trace(hart, opts, callback))
    }

    fn with_dm<T>(&mut self, f: impl FnOnce(&mut DebugModule<PioSwd<SM>>) -> Result<T, Error>) -> Result<T, Error> {
        let result = match self.dm.as_mut() {
            Some(dm) => f(dm),
            None => Err(Error::NotConnected),
        };
        match result {
            Ok(v) => Ok(v),
            Err(e) => self.fail(e),
        }
    }

    fn fail<T>(&mut self, e: Error) -> Result<T, Error> {
        let mut detail = Detail::new();
        let _ = detail.push_str(e.name());
        self.last_error = Some(e);
        self.last_error_detail = detail;
        Err(e)
    }
}

impl<SM: PioStateMachine> Drop for Target<SM> {
    fn drop(&mut self) {
        self.disconnect();
        if let Some(slot) = self.slot.take() {
            registry::release(slot);
        }
    }
}
