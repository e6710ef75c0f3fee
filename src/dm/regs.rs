//! RP2350 Debug Module register map (§4.3): DMCONTROL, DMSTATUS,
//! ABSTRACTCS, the abstract-command COMMAND register, and the System-Bus-
//! Access block. Layout follows the RISC-V External Debug Support
//! specification v0.13.2, with bitfield style mirroring `probe-rs`'s own
//! `architecture::riscv::communication_interface` register definitions
//! (`Dmcontrol`, `Sbcs`, `AccessRegisterCommand`, ...).
//!
//! DM registers are accessed as 32-bit words through the MEM-AP used as the
//! DM transport (§4.3.1); [`super::memap`] turns a DMI register number into
//! the TAR/DRW sequence. The numbers below are DMI register numbers, i.e.
//! they still need `* 4` to become a byte offset from the DM's base address.

use bitfield::bitfield;

pub const DMI_DATA0: u8 = 0x04;
pub const DMI_DATA1: u8 = 0x05;
pub const DMI_DMCONTROL: u8 = 0x10;
pub const DMI_DMSTATUS: u8 = 0x11;
pub const DMI_ABSTRACTCS: u8 = 0x16;
pub const DMI_COMMAND: u8 = 0x17;
pub const DMI_SBCS: u8 = 0x38;
pub const DMI_SBADDRESS0: u8 = 0x39;
pub const DMI_SBDATA0: u8 = 0x3c;

/// Base address, on the MEM-AP selected as the DM transport, of DM register
/// 0. RP2350 maps its Debug Module starting at the base of that AP's
/// address space; a board integrating a different AP layout would override
/// this via `Config` (see DESIGN.md for the Open Question this resolves).
pub const RP2350_DM_BASE: u32 = 0x0000_0000;

/// CSR number for the Debug PC, used to read/write PC while halted (§4.3.2:
/// "PC is accessed via CSR dpc while halted").
pub const CSR_DPC: u16 = 0x7b1;

/// First GPR abstract-command regno (x0); GPR `i` is `GPR_BASE + i`.
pub const GPR_BASE: u16 = 0x1000;

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Dmcontrol(u32);
    impl Debug;
    pub haltreq, set_haltreq: 31;
    pub resumereq, set_resumereq: 30;
    pub hartreset, set_hartreset: 29;
    pub ackhavereset, set_ackhavereset: 28;
    pub hasel, set_hasel: 26;
    pub u16, hartsello, set_hartsello: 25, 16;
    pub ndmreset, set_ndmreset: 1;
    pub dmactive, set_dmactive: 0;
}

impl From<u32> for Dmcontrol {
    fn from(v: u32) -> Self {
        Dmcontrol(v)
    }
}
impl From<Dmcontrol> for u32 {
    fn from(v: Dmcontrol) -> Self {
        v.0
    }
}

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Dmstatus(u32);
    impl Debug;
    pub impebreak, _: 22;
    pub allhavereset, _: 19;
    pub anyhavereset, _: 18;
    pub allresumeack, _: 17;
    pub anyresumeack, _: 16;
    pub allnonexistent, _: 15;
    pub anynonexistent, _: 14;
    pub allunavail, _: 13;
    pub anyunavail, _: 12;
    pub allrunning, _: 11;
    pub anyrunning, _: 10;
    pub allhalted, _: 9;
    pub anyhalted, _: 8;
    pub authenticated, _: 7;
    pub authbusy, _: 6;
    pub hasresethaltreq, _: 5;
    pub confstrptrvalid, _: 4;
    pub u8, version, _: 3, 0;
}

impl From<u32> for Dmstatus {
    fn from(v: u32) -> Self {
        Dmstatus(v)
    }
}

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Abstractcs(u32);
    impl Debug;
    pub u8, progbufsize, _: 28, 24;
    pub busy, _: 12;
    pub u8, cmderr, set_cmderr: 10, 8;
    pub u8, datacount, _: 3, 0;
}

impl From<u32> for Abstractcs {
    fn from(v: u32) -> Self {
        Abstractcs(v)
    }
}
impl From<Abstractcs> for u32 {
    fn from(v: Abstractcs) -> Self {
        v.0
    }
}

/// `cmderr` codes from ABSTRACTCS (§4.3.2).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CmdErr {
    None,
    Busy,
    NotSupported,
    Exception,
    HaltResume,
    Bus,
    Other(u8),
}

impl CmdErr {
    pub fn decode(bits: u8) -> Self {
        match bits {
            0 => CmdErr::None,
            1 => CmdErr::Busy,
            2 => CmdErr::NotSupported,
            3 => CmdErr::Exception,
            4 => CmdErr::HaltResume,
            5 => CmdErr::Bus,
            other => CmdErr::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            CmdErr::None => 0,
            CmdErr::Busy => 1,
            CmdErr::NotSupported => 2,
            CmdErr::Exception => 3,
            CmdErr::HaltResume => 4,
            CmdErr::Bus => 5,
            CmdErr::Other(b) => b,
        }
    }
}

bitfield! {
    /// Abstract "access register" command, written to COMMAND (§4.3.2).
    #[derive(Clone, Copy)]
    pub struct AccessRegisterCommand(u32);
    impl Debug;
    pub u8, cmdtype, set_cmdtype: 31, 24;
    pub u8, aarsize, set_aarsize: 22, 20;
    pub aarpostincrement, set_aarpostincrement: 19;
    pub postexec, set_postexec: 18;
    pub transfer, set_transfer: 17;
    pub write, set_write: 16;
    pub u16, regno, set_regno: 15, 0;
}

impl From<AccessRegisterCommand> for u32 {
    fn from(v: AccessRegisterCommand) -> Self {
        v.0
    }
}

/// `aarsize` value for a 32-bit access.
pub const AARSIZE_32: u8 = 2;

bitfield! {
    #[derive(Clone, Copy)]
    pub struct Sbcs(u32);
    impl Debug;
    pub sbbusyerror, set_sbbusyerror: 22;
    pub sbbusy, _: 21;
    pub sbreadonaddr, set_sbreadonaddr: 20;
    pub u8, sbaccess, set_sbaccess: 19, 17;
    pub sbautoincrement, set_sbautoincrement: 16;
    pub sbreadondata, set_sbreadondata: 15;
    pub u8, sberror, set_sberror: 14, 12;
    pub u8, sbasize, _: 11, 5;
}

impl From<u32> for Sbcs {
    fn from(v: u32) -> Self {
        Sbcs(v)
    }
}
impl From<Sbcs> for u32 {
    fn from(v: Sbcs) -> Self {
        v.0
    }
}

/// `sbaccess` value for a 32-bit bus access (§4.3.5).
pub const SBACCESS_32: u8 = 2;
