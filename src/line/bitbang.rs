//! Reference `SwdLineIo` backend that bit-bangs SWCLK/SWDIO directly over
//! `embedded-hal` GPIO pins, for boards with no PIO block to spare. Not the
//! primary backend (the PIO-driven one in [`super::pio`] is), but a
//! concrete example of the "alternative back-ends" the design notes call
//! for, and a useful one for host-side testing against real silicon without
//! a PIO peripheral. The bit timing here follows the closest example of
//! this exact technique in the reference pack, `airfrog`'s `SwdProtocol`.

use super::{Ack, SwdLineIo};
use crate::error::Error;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// An SWDIO pin that can switch between driving and floating, as SWD's
/// turnaround requires. Implemented by any type providing both directions;
/// board support crates typically wrap a single GPIO configured as
/// open-drain or a `Flex`/dynamic-direction pin.
pub trait SwdioPin: InputPin + OutputPin {
    fn set_as_output(&mut self);
    fn set_as_input(&mut self);
}

/// Busy-wait for approximately `cycles` loop iterations. Board support
/// crates should replace the default no-op-loop with a cycle-accurate delay
/// (e.g. `cortex_m::asm::delay` or `riscv::asm::delay`) for real timing;
/// this default only prevents the loop from being optimized away entirely.
pub trait Delay {
    fn delay_cycles(&mut self, cycles: u32);
}

pub struct BitBangSwd<CLK, DIO, D> {
    swclk: CLK,
    swdio: DIO,
    delay: D,
    half_period_cycles: u32,
    freq_khz: u32,
}

impl<CLK, DIO, D> BitBangSwd<CLK, DIO, D>
where
    CLK: OutputPin,
    DIO: SwdioPin,
    D: Delay,
{
    pub fn new(swclk: CLK, swdio: DIO, delay: D, freq_khz: u32) -> Result<Self, Error> {
        super::validate_frequency_khz(freq_khz)?;
        let mut driver = Self {
            swclk,
            swdio,
            delay,
            half_period_cycles: 0,
            freq_khz: 0,
        };
        driver.recompute_delay(freq_khz);
        Ok(driver)
    }

    fn recompute_delay(&mut self, khz: u32) {
        // Placeholder scaling; a real board support crate calibrates this
        // against its own core clock. Monotonic in `khz` is all that's
        // required for the boundary behavior tested in this crate.
        self.half_period_cycles = (2_000_000 / khz.max(1)).clamp(1, 20_000);
        self.freq_khz = khz;
    }

    fn clock_bit(&mut self) {
        let _ = self.swclk.set_low();
        self.delay.delay_cycles(self.half_period_cycles);
        let _ = self.swclk.set_high();
        self.delay.delay_cycles(self.half_period_cycles);
    }

    fn write_bit(&mut self, bit: bool) {
        let _ = self
            .swdio
            .set_state(if bit { PinState::High } else { PinState::Low });
        self.clock_bit();
    }

    fn read_bit(&mut self) -> bool {
        let _ = self.swclk.set_low();
        self.delay.delay_cycles(self.half_period_cycles);
        let bit = self.swdio.is_high().unwrap_or(false);
        let _ = self.swclk.set_high();
        self.delay.delay_cycles(self.half_period_cycles);
        bit
    }
}

impl<CLK, DIO, D> SwdLineIo for BitBangSwd<CLK, DIO, D>
where
    CLK: OutputPin,
    DIO: SwdioPin,
    D: Delay,
{
    fn shift_out(&mut self, data: u32, nbits: u8) {
        self.swdio.set_as_output();
        let mut data = data;
        for _ in 0..nbits {
            self.write_bit(data & 1 == 1);
            data >>= 1;
        }
    }

    fn packet(&mut self, request: u8, data_in_out: &mut u32, is_write: bool) -> Result<Ack, Error> {
        self.swdio.set_as_output();
        for i in 0..8 {
            self.write_bit((request >> i) & 1 == 1);
        }

        self.swdio.set_as_input();
        self.clock_bit(); // turnaround

        let mut ack_bits = 0u8;
        for i in 0..3 {
            if self.read_bit() {
                ack_bits |= 1 << i;
            }
        }
        let ack = match Ack::decode(ack_bits) {
            Ok(ack) => ack,
            Err(e) => {
                self.swdio.set_as_output();
                self.clock_bit();
                return Err(e);
            }
        };

        if ack != Ack::Ok {
            self.swdio.set_as_output();
            self.clock_bit();
            return Ok(ack);
        }

        if is_write {
            self.clock_bit(); // turnaround before the host drives data
            self.swdio.set_as_output();
            let parity = data_in_out.count_ones() & 1;
            let mut data = *data_in_out;
            for _ in 0..32 {
                self.write_bit(data & 1 == 1);
                data >>= 1;
            }
            self.write_bit(parity == 1);
        } else {
            let mut data = 0u32;
            for i in 0..32 {
                if self.read_bit() {
                    data |= 1 << i;
                }
            }
            let parity = self.read_bit();
            self.swdio.set_as_output();
            self.clock_bit(); // turnaround
            if parity != (data.count_ones() & 1 == 1) {
                return Err(Error::Parity);
            }
            *data_in_out = data;
        }

        Ok(ack)
    }

    fn set_frequency_khz(&mut self, khz: u32) -> Result<(), Error> {
        super::validate_frequency_khz(khz)?;
        self.recompute_delay(khz);
        Ok(())
    }

    fn frequency_khz(&self) -> u32 {
        self.freq_khz
    }
}
