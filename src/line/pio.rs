//! PIO-backed [`SwdLineIo`]. This is the primary line driver: it programs a
//! PIO state machine to shift SWCLK/SWDIO in hardware, so a "packet" is one
//! blocking FIFO round trip rather than N individually-timed GPIO writes.
//!
//! The concrete PIO peripheral is abstracted behind [`PioStateMachine`] so
//! this module has no dependency on a specific HAL crate; a board support
//! crate implements `PioStateMachine` against its real `PIO0`/`PIO1`
//! peripheral and state machine registers (the register and FIFO naming
//! below — `TXF`, `RXF`, `CLKDIV_INT`/`CLKDIV_FRAC` — follows the RP2040/
//! RP2350 PIO block as exercised in the reference pack's Tock RP2040 PIO
//! driver). This is the "alternative back-ends could be plugged in" split
//! called for by the design notes.

use super::{Ack, SwdLineIo, MAX_FREQ_KHZ, MIN_FREQ_KHZ};
use crate::error::Error;

/// Hardware seam for one PIO state machine wired to SWCLK/SWDIO.
///
/// The SWD PIO program is expected to implement the protocol's bit timing
/// directly: each `push_blocking` of a 32-bit "instruction word" (packed
/// request header, bit count, and optional payload) produces exactly one
/// clocked packet on the wire, and `pull_blocking` returns the captured ACK
/// and (for reads) data bits. The exact instruction encoding is a private
/// contract between this module and the PIO program driving it; it does not
/// appear in the public API.
pub trait PioStateMachine {
    /// Load (or confirm already loaded) the SWD PIO program into this
    /// block's shared program memory, and start the state machine. Program
    /// memory is shared across all four state machines of a block and is
    /// refcounted by the implementer so repeated calls across state
    /// machines on the same block are cheap (§5, "Shared resources").
    fn start(&mut self, swclk_pin: u8, swdio_pin: u8);

    /// Stop the state machine, e.g. on disconnect, releasing its claim on
    /// the shared program (but not the pin assignment, which is reapplied
    /// on the next `start`).
    fn stop(&mut self);

    /// Set `CLKDIV_INT`/`CLKDIV_FRAC` so that two PIO cycles produce one SCK
    /// edge-pair at the system clock frequency this implementer was built
    /// against. `divider_x256` is a 16.8 fixed-point divider value.
    fn set_clkdiv_x256(&mut self, divider_x256: u32);

    /// Push one 32-bit word to the TX FIFO, blocking until there is room.
    fn push_blocking(&mut self, word: u32);

    /// Pull one 32-bit word from the RX FIFO, blocking until data arrives.
    fn pull_blocking(&mut self) -> u32;
}

/// System clock, in kHz, that `set_clkdiv_x256` divider values are computed
/// against. RP2350's default `clk_sys` is 150 MHz; callers targeting a
/// different `clk_sys` should scale `khz` before calling
/// [`PioSwd::set_frequency_khz`], since this module has no way to observe
/// the board's actual clock tree.
const CLK_SYS_KHZ: u32 = 150_000;

/// PIO cycles consumed per SCK edge-pair by the SWD PIO program (§4.1: "two
/// PIO cycles produce one SCK edge-pair").
const PIO_CYCLES_PER_EDGE_PAIR: u32 = 2;

/// [`SwdLineIo`] implementation driving a PIO state machine.
pub struct PioSwd<SM: PioStateMachine> {
    sm: SM,
    freq_khz: u32,
}

impl<SM: PioStateMachine> PioSwd<SM> {
    /// Start the state machine on the given pins at `freq_khz` (already
    /// validated by the caller against [`super::validate_frequency_khz`]).
    pub fn new(mut sm: SM, swclk_pin: u8, swdio_pin: u8, freq_khz: u32) -> Self {
        sm.start(swclk_pin, swdio_pin);
        let mut driver = Self { sm, freq_khz: 0 };
        // infallible: freq_khz is validated by the caller (Target::connect)
        let _ = driver.set_frequency_khz(freq_khz);
        driver
    }

    pub fn stop(&mut self) {
        self.sm.stop();
    }

    fn divider_x256(khz: u32) -> u32 {
        let denom = khz.saturating_mul(PIO_CYCLES_PER_EDGE_PAIR);
        ((CLK_SYS_KHZ as u64 * 256) / denom as u64) as u32
    }
}

impl<SM: PioStateMachine> SwdLineIo for PioSwd<SM> {
    fn shift_out(&mut self, data: u32, nbits: u8) {
        debug_assert!(nbits > 0 && nbits <= 32);
        // Instruction word: bit 31 set marks a raw-shift instruction (as
        // opposed to a packet instruction), bits [28:24] carry the bit
        // count minus one, and the low bits carry the data to shift.
        let word = 0x8000_0000 | (((nbits - 1) as u32) << 24) | (data & bit_mask(nbits));
        self.sm.push_blocking(word);
        let _ = self.sm.pull_blocking();
    }

    fn packet(&mut self, request: u8, data_in_out: &mut u32, is_write: bool) -> Result<Ack, Error> {
        let word = if is_write {
            0x4000_0000 | (u32::from(request) << 16) | 0x0000_0001
        } else {
            0x4000_0000 | (u32::from(request) << 16)
        };
        self.sm.push_blocking(word);
        if is_write {
            self.sm.push_blocking(*data_in_out);
        }

        let status = self.sm.pull_blocking();
        let ack_bits = (status & 0b111) as u8;
        let ack = Ack::decode(ack_bits)?;

        if ack == Ack::Ok {
            if is_write {
                // the write was already posted with its data word above
            } else {
                let payload = self.sm.pull_blocking();
                let data = payload & 0xFFFF_FFFF;
                let parity_bit = (status >> 3) & 1;
                if parity_bit != (data.count_ones() & 1) {
                    return Err(Error::Parity);
                }
                *data_in_out = data;
            }
        }
        Ok(ack)
    }

    fn set_frequency_khz(&mut self, khz: u32) -> Result<(), Error> {
        super::validate_frequency_khz(khz)?;
        self.sm.set_clkdiv_x256(Self::divider_x256(khz));
        self.freq_khz = khz;
        log::debug!("line: SWCLK set to {khz} kHz");
        Ok(())
    }

    fn frequency_khz(&self) -> u32 {
        self.freq_khz
    }
}

const fn bit_mask(nbits: u8) -> u32 {
    if nbits >= 32 {
        u32::MAX
    } else {
        (1u32 << nbits) - 1
    }
}
