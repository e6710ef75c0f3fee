//! Line driver: owns the two GPIO lines and the PIO state machine, and
//! exposes the single synchronous "clock one SWD packet" primitive plus
//! line reset, wakeup, and frequency-change primitives (§4.1).
//!
//! The driver logic here is hardware-agnostic; it is expressed against the
//! [`SwdLineIo`] trait so that the PIO-backed implementation
//! ([`pio::PioSwd`]) and, behind the `bitbang` feature, a pure
//! `embedded-hal` GPIO implementation ([`bitbang::BitBangSwd`]) share one
//! code path for sequence generation. This is the pluggable-backend split
//! called for by the "PIO assembly program" design note.

pub mod pio;
pub mod sequences;

#[cfg(feature = "bitbang")]
pub mod bitbang;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::Error;

/// Result of the 3-bit ACK phase of an SWD packet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Wait,
    Fault,
}

impl Ack {
    /// Decode the 3-bit (LSB-first-received, but passed here already
    /// assembled LSB = bit 0) ACK field. Any pattern other than the three
    /// legal codes is a protocol error (§4.1).
    pub(crate) fn decode(bits: u8) -> Result<Ack, Error> {
        match bits & 0b111 {
            0b001 => Ok(Ack::Ok),
            0b010 => Ok(Ack::Wait),
            0b100 => Ok(Ack::Fault),
            _ => Err(Error::Protocol),
        }
    }
}

/// Minimum and maximum legal SWCLK frequency, in kHz (§4.1, §6).
pub const MIN_FREQ_KHZ: u32 = 100;
pub const MAX_FREQ_KHZ: u32 = 2000;

/// Number of idle SWCLK cycles driven after every transaction (§4.1 step 5).
pub const POST_PACKET_IDLE_CYCLES: u32 = 8;

/// Minimum SWCLK cycles with SWDIO high for a line reset (§4.1).
pub const LINE_RESET_HIGH_CYCLES: u32 = 50;
/// Minimum idle SWCLK cycles following a line reset (§4.1).
pub const LINE_RESET_TRAILING_IDLE_CYCLES: u32 = 2;

/// The hardware-agnostic seam the DAP transactor is built on. A `SwdLineIo`
/// implementation is responsible for the bit-exact timing of one SWD
/// transaction; everything above this trait deals only in request/ack/data,
/// never in raw SWCLK edges.
pub trait SwdLineIo {
    /// Shift out `nbits` (1..=32) bits of `data`, LSB first, driving SWDIO
    /// for the whole sequence. Used for line-reset runs, the JTAG-to-Dormant
    /// and Dormant-to-SWD wakeup sequences, and the trailing idle clocks —
    /// anything that is not itself a full request/ack/data packet.
    fn shift_out(&mut self, data: u32, nbits: u8);

    /// Drive exactly one SWD packet per §4.1:
    /// 8-bit request header, turnaround, 3-bit ACK, then (depending on
    /// `is_write` and whether the ACK was OK) a 32-bit data phase with
    /// parity and the matching turnaround, followed by the caller-driven
    /// idle clocks (the idle clocks are issued separately via
    /// [`SwdLineIo::shift_out`] by the transactor, not by this call).
    ///
    /// On a write, `*data_in_out` is the value to send. On a read, the
    /// decoded value is written back into `*data_in_out`; its prior contents
    /// are ignored. A parity mismatch on read, or a non-OK/WAIT/FAULT ACK
    /// pattern, is surfaced as an `Err` with the data phase already drained
    /// off the wire so the line is left byte-aligned for the next packet.
    fn packet(&mut self, request: u8, data_in_out: &mut u32, is_write: bool) -> Result<Ack, Error>;

    /// Recompute the PIO clock divider (or bit-bang delay constant) so that
    /// SCK runs at approximately `khz`. Out-of-range values are rejected by
    /// the caller before this is invoked; implementations may still perform
    /// their own bounds check as a second line of defense.
    fn set_frequency_khz(&mut self, khz: u32) -> Result<(), Error>;

    /// Currently configured SWCLK frequency, in kHz.
    fn frequency_khz(&self) -> u32;
}

/// Validate a requested frequency against the legal range (§4.1, §8
/// boundary test: 100 kHz and 2 MHz succeed, 99 kHz and 2001 kHz fail).
pub fn validate_frequency_khz(khz: u32) -> Result<(), Error> {
    if (MIN_FREQ_KHZ..=MAX_FREQ_KHZ).contains(&khz) {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration)
    }
}
