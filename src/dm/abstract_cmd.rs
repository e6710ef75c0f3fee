//! Abstract-command engine (§4.3.2): the single primitive every GPR, CSR,
//! and PC access is built on. Every call goes through [`DebugModule::access_register`],
//! which polls ABSTRACTCS.busy, clears a stale `cmderr` before issuing a new
//! command, writes DATA0 for a write, issues the COMMAND word, and polls busy
//! again before reading back `cmderr`/DATA0.

use super::regs::{
    self, AccessRegisterCommand, CmdErr, AARSIZE_32, DMI_ABSTRACTCS, DMI_COMMAND, DMI_DATA0,
};
use super::DebugModule;
use crate::error::{detail, Error};
use crate::line::SwdLineIo;

impl<IO: SwdLineIo> DebugModule<IO> {
    /// Block until `ABSTRACTCS.busy` clears, or fail with [`Error::Timeout`].
    fn wait_not_busy(&mut self) -> Result<regs::Abstractcs, Error> {
        for _ in 0..self.polls.abstract_cmd_busy {
            let cs = self.abstractcs()?;
            if !cs.busy() {
                return Ok(cs);
            }
        }
        Err(Error::Timeout)
    }

    /// Clear a stale `cmderr` left over from a previous command, per §4.3.2:
    /// ABSTRACTCS.cmderr is write-1-to-clear.
    fn clear_cmderr(&mut self) -> Result<(), Error> {
        let mut clear = regs::Abstractcs(0);
        clear.set_cmderr(0b111);
        self.write_dm(DMI_ABSTRACTCS, clear.into())
    }

    /// Execute one "access register" abstract command against `regno`
    /// (§4.3.2). `write` is `None` for a read, `Some(value)` for a write;
    /// the return value is always the post-command contents of DATA0 (the
    /// read result, or the value just written, echoed back for symmetry).
    pub(crate) fn access_register(&mut self, regno: u16, write: Option<u32>) -> Result<u32, Error> {
        self.require_initialized()?;

        let cs = self.wait_not_busy()?;
        if CmdErr::decode(cs.cmderr()) != CmdErr::None {
            log::warn!(
                "{}",
                detail!("stale abstract-command cmderr={} before regno {:#06x}", cs.cmderr(), regno)
            );
            self.clear_cmderr()?;
        }

        if let Some(value) = write {
            self.write_dm(DMI_DATA0, value)?;
        }

        let mut cmd = AccessRegisterCommand(0);
        cmd.set_cmdtype(0);
        cmd.set_aarsize(AARSIZE_32);
        cmd.set_transfer(true);
        cmd.set_write(write.is_some());
        cmd.set_regno(regno);
        self.write_dm(DMI_COMMAND, cmd.into())?;

        let cs = self.wait_not_busy()?;
        let err = CmdErr::decode(cs.cmderr());
        if err != CmdErr::None {
            self.clear_cmderr()?;
            log::debug!(
                "{}",
                detail!("abstract command on regno {:#06x} failed: cmderr={:?}", regno, err)
            );
            return Err(Error::AbstractCommand);
        }

        match write {
            Some(value) => Ok(value),
            None => self.read_dm(DMI_DATA0),
        }
    }
}
