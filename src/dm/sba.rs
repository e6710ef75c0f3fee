//! System-Bus-Access memory engine (§4.3.5): word-aligned 32-bit reads and
//! writes driven through SBCS/SBADDRESS0/SBDATA0, independent of any hart's
//! halt state. This is the path `Target::read_mem32`/`write_mem32` use; it
//! does not go through the abstract-command engine at all.

use super::regs::{DMI_SBADDRESS0, DMI_SBCS, DMI_SBDATA0, SBACCESS_32};
use super::DebugModule;
use crate::error::{detail, Error};
use crate::line::SwdLineIo;

impl<IO: SwdLineIo> DebugModule<IO> {
    fn sba_wait_not_busy(&mut self) -> Result<super::regs::Sbcs, Error> {
        for _ in 0..self.polls.sba_busy {
            let sbcs: super::regs::Sbcs = self.read_dm(DMI_SBCS)?.into();
            if !sbcs.sbbusy() {
                return Ok(sbcs);
            }
        }
        Err(Error::Timeout)
    }

    fn sba_clear_error(&mut self) -> Result<(), Error> {
        let mut clear = super::regs::Sbcs(0);
        clear.set_sberror(0b111);
        clear.set_sbbusyerror(true);
        self.write_dm(DMI_SBCS, clear.into())
    }

    fn sba_configure(&mut self, read_on_addr: bool) -> Result<(), Error> {
        let mut sbcs = super::regs::Sbcs(0);
        sbcs.set_sbaccess(SBACCESS_32);
        sbcs.set_sbreadonaddr(read_on_addr);
        sbcs.set_sbautoincrement(false);
        sbcs.set_sbreadondata(false);
        self.write_dm(DMI_SBCS, sbcs.into())
    }

    fn check_sberror(&mut self, address: u32) -> Result<(), Error> {
        let sbcs = self.sba_wait_not_busy()?;
        if sbcs.sberror() != 0 {
            log::debug!(
                "{}",
                detail!("sba access to {:#010x} failed: sberror={}", address, sbcs.sberror())
            );
            self.sba_clear_error()?;
            return Err(Error::Bus);
        }
        Ok(())
    }

    fn require_word_aligned(address: u32) -> Result<(), Error> {
        if address % 4 == 0 {
            Ok(())
        } else {
            Err(Error::Alignment)
        }
    }

    pub fn read_mem32(&mut self, address: u32) -> Result<u32, Error> {
        self.require_initialized()?;
        Self::require_word_aligned(address)?;
        self.ensure_sba()?;

        self.sba_wait_not_busy()?;
        self.sba_configure(true)?;
        self.write_dm(DMI_SBADDRESS0, address)?;
        self.check_sberror(address)?;
        self.read_dm(DMI_SBDATA0)
    }

    pub fn write_mem32(&mut self, address: u32, value: u32) -> Result<(), Error> {
        self.require_initialized()?;
        Self::require_word_aligned(address)?;
        self.ensure_sba()?;

        self.sba_wait_not_busy()?;
        self.sba_configure(false)?;
        self.write_dm(DMI_SBADDRESS0, address)?;
        self.write_dm(DMI_SBDATA0, value)?;
        self.check_sberror(address)
    }
}
