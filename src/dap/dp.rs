//! ADIv5.2 Debug Port register layout, restricted to the fields this crate
//! actually drives: IDCODE, CTRL/STAT (including the sticky-error bits),
//! and SELECT. Bitfield layout follows `probe-rs`'s `architecture::arm::dp`
//! module directly.

use bitfield::bitfield;

/// The four DP register addresses, as carried in the A\[3:2\] header field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DpRegister {
    /// Bank 0x0: IDCODE on read, ABORT on write.
    IdcodeOrAbort = 0b00,
    /// Banked: CTRL/STAT (DP bank 0), or one of the banked extension
    /// registers selected via SELECT.CTRLSEL/DPBANKSEL.
    CtrlStat = 0b01,
    /// Banked via SELECT.
    Select = 0b10,
    /// RDBUFF: the result of the previous posted AP read.
    RdBuff = 0b11,
}

bitfield! {
    /// CTRL/STAT, DP bank 0. Field names follow `probe-rs`'s `Ctrl`.
    #[derive(Clone, Copy)]
    pub struct CtrlStat(u32);
    impl Debug;
    pub csyspwrupack, _: 31;
    pub csyspwrupreq, set_csyspwrupreq: 30;
    pub cdbgpwrupack, _: 29;
    pub cdbgpwrupreq, set_cdbgpwrupreq: 28;
    pub wdataerr, set_wdataerr: 7;
    pub stickyerr, set_stickyerr: 5;
    pub stickycmp, set_stickycmp: 4;
    pub stickyorun, set_stickyorun: 1;
}

impl CtrlStat {
    /// True if any of the four sticky-error bits this crate cares about are set.
    pub fn has_sticky_error(&self) -> bool {
        self.stickyerr() || self.stickycmp() || self.stickyorun() || self.wdataerr()
    }

    /// A CTRL/STAT value with exactly the sticky-error bits set-to-clear
    /// (they are write-1-to-clear per ADIv5.2), powerup request bits
    /// preserved from `self` so the write-back doesn't also drop power.
    pub fn clear_sticky(&self) -> CtrlStat {
        let mut clear = CtrlStat(0);
        clear.set_csyspwrupreq(self.csyspwrupreq());
        clear.set_cdbgpwrupreq(self.cdbgpwrupreq());
        clear.set_stickyerr(true);
        clear.set_stickycmp(true);
        clear.set_stickyorun(true);
        clear.set_wdataerr(true);
        clear
    }
}

impl From<u32> for CtrlStat {
    fn from(raw: u32) -> Self {
        CtrlStat(raw)
    }
}

impl From<CtrlStat> for u32 {
    fn from(v: CtrlStat) -> Self {
        v.0
    }
}

bitfield! {
    /// SELECT, banked across every DP/AP access. Field names follow
    /// `probe-rs`'s `Select`, plus `ctrlsel` for the DPv2 CTRL/STAT bank
    /// extension bit this crate's single-DP-version design still tracks
    /// (kept at 0 in practice, see DESIGN.md).
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Select(u32);
    impl Debug;
    pub u8, ap_sel, set_ap_sel: 31, 24;
    pub u8, ap_bank_sel, set_ap_bank_sel: 7, 4;
    pub ctrlsel, set_ctrlsel: 1;
    pub u8, dp_bank_sel, set_dp_bank_sel: 3, 0;
}

impl From<u32> for Select {
    fn from(raw: u32) -> Self {
        Select(raw)
    }
}

impl From<Select> for u32 {
    fn from(v: Select) -> Self {
        v.0
    }
}

bitfield! {
    /// IDCODE, the only register a target sends on DP read without any
    /// other setup. Layout: [31:28] revision, [27:12] part number,
    /// [11:1] JEP-106 designer code, [0] fixed 1.
    #[derive(Clone, Copy)]
    pub struct Idcode(u32);
    impl Debug;
    pub u8, revision, _: 31, 28;
    pub u16, part_no, _: 27, 12;
    pub u16, designer, _: 11, 1;
}

impl From<u32> for Idcode {
    fn from(raw: u32) -> Self {
        Idcode(raw)
    }
}
