//! The MEM-AP used as the Debug Module's transport (§4.3.1): every DM
//! register access becomes a TAR write followed by a DRW read/write through
//! the DAP transactor. CSW/TAR/DRW addresses follow the standard ADIv5
//! MEM-AP register bank (bank 0: CSW at 0x00, TAR at 0x04, DRW at 0x0C).

use crate::dap::{ApField, DapTransactor};
use crate::error::Error;
use crate::line::SwdLineIo;

const CSW: u8 = 0x00;
const TAR: u8 = 0x04;
const DRW: u8 = 0x0C;

/// CSW value selecting word-sized, non-incrementing transfers: the only
/// mode this crate ever needs, since every DM register access is a single
/// 32-bit word (§4.3).
const CSW_WORD_FIXED: u32 = 0x0000_0002;

pub struct MemAp {
    ap_sel: u8,
    csw_programmed: bool,
}

impl MemAp {
    pub const fn new(ap_sel: u8) -> Self {
        Self {
            ap_sel,
            csw_programmed: false,
        }
    }

    fn field(&self, addr: u8) -> ApField {
        ApField {
            ap_sel: self.ap_sel,
            addr,
        }
    }

    fn ensure_csw<IO: SwdLineIo>(&mut self, dap: &mut DapTransactor<IO>) -> Result<(), Error> {
        if !self.csw_programmed {
            dap.write_ap(self.field(CSW), CSW_WORD_FIXED)?;
            self.csw_programmed = true;
        }
        Ok(())
    }

    pub fn read_word<IO: SwdLineIo>(
        &mut self,
        dap: &mut DapTransactor<IO>,
        address: u32,
    ) -> Result<u32, Error> {
        self.ensure_csw(dap)?;
        dap.write_ap(self.field(TAR), address)?;
        dap.read_ap(self.field(DRW))
    }

    pub fn write_word<IO: SwdLineIo>(
        &mut self,
        dap: &mut DapTransactor<IO>,
        address: u32,
        value: u32,
    ) -> Result<(), Error> {
        self.ensure_csw(dap)?;
        dap.write_ap(self.field(TAR), address)?;
        dap.write_ap(self.field(DRW), value)
    }
}
