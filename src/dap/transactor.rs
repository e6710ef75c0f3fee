//! The DAP transactor engine itself (§4.2): header composition, WAIT retry,
//! sticky-error clearing on FAULT, SELECT caching, and posted AP reads.

use super::dp::{CtrlStat, DpRegister, Idcode, Select};
use super::select::SelectState;
use crate::error::{detail, Error};
use crate::line::{sequences, Ack, SwdLineIo};

/// Idle clocks inserted between WAIT retries, short enough to not matter for
/// throughput but long enough to give the target time to leave its WAIT
/// state (chosen well within the 8-cycle post-packet idle budget already
/// mandated by §4.1).
const WAIT_RETRY_IDLE_CYCLES: u32 = 2;

/// Fields needed to compute a full AP register access (§4.2).
#[derive(Copy, Clone, Debug)]
pub struct ApField {
    pub ap_sel: u8,
    /// Full AP register address; only bits [7:2] matter. Bits [7:4] select
    /// the SELECT.APBANKSEL bank, bits [3:2] are carried in the request
    /// header's A\[3:2\] field.
    pub addr: u8,
}

/// Owns one [`crate::line::SwdLineIo`] backend and implements the DAP
/// transaction model above it.
pub struct DapTransactor<IO> {
    io: IO,
    select: SelectState,
    retry_count: u32,
    powered: bool,
    needs_line_reset: bool,
}

impl<IO: SwdLineIo> DapTransactor<IO> {
    pub fn new(io: IO, retry_count: u32) -> Self {
        Self {
            io,
            select: SelectState::new(),
            retry_count,
            powered: false,
            needs_line_reset: false,
        }
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    pub fn set_frequency_khz(&mut self, khz: u32) -> Result<(), Error> {
        self.io.set_frequency_khz(khz)
    }

    pub fn frequency_khz(&self) -> u32 {
        self.io.frequency_khz()
    }

    /// Whether the last operation left the line in a state that requires a
    /// caller-driven reset (set on `Protocol` errors, per §4.2).
    pub fn needs_line_reset(&self) -> bool {
        self.needs_line_reset
    }

    /// Drive the ADIv5.2 dormant-to-SWD wakeup, then line-reset into a known
    /// protocol state and forget any cached SELECT value (§4.1, §4.2).
    pub fn wake_and_reset(&mut self) {
        sequences::dormant_to_swd(&mut self.io);
        self.select.invalidate();
        self.needs_line_reset = false;
    }

    /// Drive a bare line reset, e.g. to recover from a `Protocol` error
    /// mid-session without repeating the full dormant wakeup.
    pub fn line_reset(&mut self) {
        sequences::line_reset(&mut self.io);
        self.select.invalidate();
        self.needs_line_reset = false;
    }

    pub fn read_idcode(&mut self) -> Result<u32, Error> {
        self.read_dp(DpRegister::IdcodeOrAbort)
    }

    /// Read a DP register, banking SELECT.DPBANKSEL first if the register
    /// requires a non-default bank. IDCODE, SELECT, and RDBUFF are
    /// bank-independent (always readable regardless of SELECT); only
    /// CTRL/STAT's extended banks would require banking, and this crate
    /// only ever targets bank 0, so no DP bank write is ever issued here
    /// (see DESIGN.md: DPBANKSEL is tracked in `Select` but never driven
    /// away from 0 by this crate).
    pub fn read_dp(&mut self, reg: DpRegister) -> Result<u32, Error> {
        self.transact(true, false, reg as u8, 0)
    }

    pub fn write_dp(&mut self, reg: DpRegister, value: u32) -> Result<(), Error> {
        self.transact(true, true, reg as u8, value).map(|_| ())
    }

    /// Posted AP read: issue the AP read (which returns the *previous*
    /// transaction's result per ADIv5.2), then read DP.RDBUFF to retrieve
    /// the value just requested (§4.2 "Read posting").
    pub fn read_ap(&mut self, field: ApField) -> Result<u32, Error> {
        self.ensure_select(field)?;
        let addr2_3 = (field.addr >> 2) & 0b11;
        self.transact(false, false, addr2_3, 0)?;
        self.read_dp(DpRegister::RdBuff)
    }

    /// AP writes are not posted in this design: the write completes before
    /// the next request is issued (§4.2).
    pub fn write_ap(&mut self, field: ApField, value: u32) -> Result<(), Error> {
        self.ensure_select(field)?;
        let addr2_3 = (field.addr >> 2) & 0b11;
        self.transact(false, true, addr2_3, value).map(|_| ())
    }

    /// Request CDBGPWRUPREQ/CSYSPWRUPREQ and block until both ACK bits are
    /// set or `max_polls` is exceeded (§4.3.1).
    pub fn power_up(&mut self, max_polls: u32) -> Result<(), Error> {
        let ctrl: CtrlStat = self.read_dp(DpRegister::CtrlStat)?.into();
        if ctrl.has_sticky_error() {
            self.write_dp(DpRegister::CtrlStat, ctrl.clear_sticky().into())?;
        }

        let mut want = CtrlStat(0);
        want.set_cdbgpwrupreq(true);
        want.set_csyspwrupreq(true);
        self.write_dp(DpRegister::CtrlStat, want.into())?;

        for _ in 0..max_polls {
            let ctrl: CtrlStat = self.read_dp(DpRegister::CtrlStat)?.into();
            if ctrl.cdbgpwrupack() && ctrl.csyspwrupack() {
                self.powered = true;
                log::debug!("dap: debug/system power-up acknowledged");
                return Ok(());
            }
            sequences::idle(&mut self.io, WAIT_RETRY_IDLE_CYCLES);
        }
        Err(Error::Timeout)
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn power_down(&mut self) -> Result<(), Error> {
        self.write_dp(DpRegister::CtrlStat, 0)?;
        self.powered = false;
        Ok(())
    }

    fn ensure_select(&mut self, field: ApField) -> Result<(), Error> {
        let mut required = self.select.current();
        required.set_ap_sel(field.ap_sel);
        required.set_ap_bank_sel((field.addr >> 4) & 0xF);
        if let Some(word) = self.select.needs_write(required) {
            self.write_dp(DpRegister::Select, word.into())?;
            self.select.record_write(word);
        }
        Ok(())
    }

    /// Core transaction with WAIT retry and FAULT sticky-clear (§4.2).
    fn transact(&mut self, is_dp: bool, is_write: bool, addr2_3: u8, value: u32) -> Result<u32, Error> {
        let header = Self::make_header(is_dp, is_write, addr2_3);

        for attempt in 0..=self.retry_count {
            let mut data = value;
            match self.io.packet(header, &mut data, is_write) {
                Ok(Ack::Ok) => {
                    sequences::idle(&mut self.io, crate::line::POST_PACKET_IDLE_CYCLES);
                    return Ok(data);
                }
                Ok(Ack::Wait) => {
                    log::trace!("dap: WAIT ack, retry {attempt}/{}", self.retry_count);
                    sequences::idle(&mut self.io, WAIT_RETRY_IDLE_CYCLES);
                    continue;
                }
                Ok(Ack::Fault) => {
                    sequences::idle(&mut self.io, crate::line::POST_PACKET_IDLE_CYCLES);
                    self.clear_fault()?;
                    return Err(Error::TargetFault);
                }
                Err(Error::Parity) => {
                    sequences::idle(&mut self.io, crate::line::POST_PACKET_IDLE_CYCLES);
                    return Err(Error::Parity);
                }
                Err(_) => {
                    self.needs_line_reset = true;
                    self.select.invalidate();
                    return Err(Error::Protocol);
                }
            }
        }
        log::debug!(
            "{}",
            detail!("WAIT retries exhausted after {} attempts", self.retry_count)
        );
        Err(Error::Wait)
    }

    fn clear_fault(&mut self) -> Result<(), Error> {
        let ctrl: CtrlStat = self.read_dp(DpRegister::CtrlStat)?.into();
        if ctrl.has_sticky_error() {
            self.write_dp(DpRegister::CtrlStat, ctrl.clear_sticky().into())?;
        }
        Ok(())
    }

    fn make_header(is_dp: bool, is_write: bool, addr2_3: u8) -> u8 {
        let apndp = u8::from(!is_dp);
        let rnw = u8::from(!is_write);
        let a = addr2_3 & 0b11;
        let mut req = 1u8; // start
        req |= apndp << 1;
        req |= rnw << 2;
        req |= a << 3;
        let parity = (req.count_ones() % 2) as u8;
        req |= parity << 5;
        req |= 1 << 7; // park
        req
    }
}

/// Decode IDCODE for callers that want the structured fields rather than
/// the raw word (used by `Target::get_target_info`).
pub fn decode_idcode(raw: u32) -> Idcode {
    Idcode::from(raw)
}
