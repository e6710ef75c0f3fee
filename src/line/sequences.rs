//! Bit-for-bit wakeup and reset sequences from ADIv5.2, built on top of
//! [`super::SwdLineIo::shift_out`]. Constants and bit order follow the
//! ADIv5.2 selection-alert sequence as exercised by the closest on-device
//! SWD probe firmware in the reference pack (`airfrog`'s `protocol.rs`):
//! the raw sequence is defined MSB-first in the spec text and then
//! transmitted LSB-first, which is why the 16-bit JTAG-to-SWD/SWD-to-Dormant
//! constants below are bit-reversed from their "documented" form.

use super::SwdLineIo;

/// JTAG-to-SWD select sequence, as actually shifted out LSB-first
/// (`0b0111100111100111` reversed).
const JTAG_TO_SWD_SEQUENCE: u16 = 0xE79E;

/// SWD-to-Dormant select sequence, LSB-first.
const SWD_TO_DORMANT_SEQUENCE: u16 = 0xE3BC;

/// 128-bit selection alert sequence used to exit Dormant state, as four
/// 32-bit little-endian words transmitted LSB-first word by word.
const SELECTION_ALERT_SEQUENCE: [u32; 4] = [0x6209_F392, 0x8685_2D95, 0xE3DD_AFE9, 0x19BC_0EA2];

/// Activation code appended after the selection alert sequence to select
/// the SWD protocol specifically (as opposed to JTAG) when exiting Dormant.
const SWD_ACTIVATION_CODE: u8 = 0x1a;

/// Drive a line reset: at least 50 SCK cycles with SWDIO high, followed by
/// at least 2 idle clocks (§4.1).
pub fn line_reset(io: &mut dyn SwdLineIo) {
    let mut remaining = super::LINE_RESET_HIGH_CYCLES;
    while remaining > 0 {
        let n = remaining.min(32);
        io.shift_out(0xFFFF_FFFF, n as u8);
        remaining -= n;
    }
    io.shift_out(0, super::LINE_RESET_TRAILING_IDLE_CYCLES as u8);
}

/// Drive `n` SWCLK idle cycles with SWDIO low.
pub fn idle(io: &mut dyn SwdLineIo, cycles: u32) {
    let mut remaining = cycles;
    while remaining > 0 {
        let n = remaining.min(32);
        io.shift_out(0, n as u8);
        remaining -= n;
    }
}

/// Classic two-wire JTAG-to-SWD switch sequence: line reset, the 16-bit
/// select sequence, then another line reset and a byte of zero idle to
/// settle into SWD (§4.1).
pub fn jtag_to_swd(io: &mut dyn SwdLineIo) {
    line_reset(io);
    io.shift_out(JTAG_TO_SWD_SEQUENCE as u32, 16);
    line_reset(io);
    io.shift_out(0, 8);
}

/// Exit Dormant state into SWD: the 8-cycle wakeup preamble, the 128-bit
/// selection alert sequence, 4 cycles low, the SWD activation code, and a
/// trailing line reset to reach a known protocol state (§4.1).
pub fn dormant_to_swd(io: &mut dyn SwdLineIo) {
    io.shift_out(0xFF, 8);
    for word in SELECTION_ALERT_SEQUENCE {
        io.shift_out(word, 32);
    }
    io.shift_out(0, 4);
    io.shift_out(SWD_ACTIVATION_CODE as u32, 8);
    line_reset(io);
}

/// Put an SWD-connected target into Dormant state (used before re-entering
/// via `dormant_to_swd` to force a clean protocol state on a target that
/// may be wedged mid-transaction).
pub fn swd_to_dormant(io: &mut dyn SwdLineIo) {
    line_reset(io);
    io.shift_out(SWD_TO_DORMANT_SEQUENCE as u32, 16);
}
