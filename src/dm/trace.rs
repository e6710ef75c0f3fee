//! Instruction-trace primitive (§4.3.6): repeatedly single-step a halted
//! hart, reading back PC and the retired instruction word after each step,
//! handing each record to a caller-supplied callback that decides whether
//! tracing continues.

use super::hart::Hart;
use super::DebugModule;
use crate::error::Error;
use crate::line::SwdLineIo;

/// `mstatus` CSR number and its `MIE` (machine interrupt enable) bit.
const CSR_MSTATUS: u16 = 0x300;
const MSTATUS_MIE_BIT: u32 = 1 << 3;

/// One traced instruction.
#[derive(Clone, Debug)]
pub struct TraceRecord {
    pub pc: u32,
    pub instruction: u32,
    /// Present only when the trace was started with `capture_regs: true`.
    /// Compressed (16-bit) instructions are not distinguished from 32-bit
    /// ones here; callers inspect `instruction`'s low two bits themselves
    /// (`11` selects a 32-bit encoding) per the RISC-V C extension.
    pub gprs: Option<[u32; 32]>,
}

/// Decides, after each traced step, whether tracing should continue.
pub type TraceCallback<'a> = dyn FnMut(&TraceRecord) -> bool + 'a;

/// Tuning knobs for a trace run (§4.3.6, Open Question: whether to touch
/// `mstatus.MIE` while single-stepping). The default leaves interrupts
/// exactly as the hart had them; a caller tracing through an ISR-sensitive
/// region can opt into suppressing interrupts for the run's duration.
#[derive(Copy, Clone, Debug)]
pub struct TraceOptions {
    pub max_steps: u32,
    pub capture_regs: bool,
    pub disable_interrupts: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            max_steps: 1,
            capture_regs: false,
            disable_interrupts: false,
        }
    }
}

impl<IO: SwdLineIo> DebugModule<IO> {
    /// Single-step `hart` up to `opts.max_steps` times, invoking `callback`
    /// with each retired instruction's record. Returns the number of steps
    /// actually taken, which is less than `max_steps` if the callback
    /// returns `false` to stop early (§8 scenario "trace early-stop").
    pub fn trace(
        &mut self,
        hart: Hart,
        opts: TraceOptions,
        callback: &mut TraceCallback,
    ) -> Result<u32, Error> {
        if self.halt_state(hart) != super::HaltState::Halted {
            return Err(Error::NotHalted);
        }

        let saved_mstatus = if opts.disable_interrupts {
            let v = self.read_csr(hart, CSR_MSTATUS)?;
            self.write_csr(hart, CSR_MSTATUS, v & !MSTATUS_MIE_BIT)?;
            Some(v)
        } else {
            None
        };

        let result = self.trace_loop(hart, opts, callback);

        if let Some(v) = saved_mstatus {
            self.write_csr(hart, CSR_MSTATUS, v)?;
        }
        result
    }

    fn trace_loop(
        &mut self,
        hart: Hart,
        opts: TraceOptions,
        callback: &mut TraceCallback,
    ) -> Result<u32, Error> {
        let mut steps = 0;
        for _ in 0..opts.max_steps {
            let pc = self.read_pc(hart)?;
            let instruction = self.read_mem32(pc)?;
            let gprs = if opts.capture_regs {
                Some(self.read_all_regs(hart)?)
            } else {
                None
            };

            let record = TraceRecord { pc, instruction, gprs };
            if !callback(&record) {
                break;
            }

            self.step(hart)?;
            steps += 1;
        }
        Ok(steps)
    }
}
