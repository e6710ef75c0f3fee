//! Configuration accepted by [`crate::Target::new`] (§6).

use crate::dm::PollBudget;
use crate::registry::{PioBlockId, StateMachineId};

/// Which PIO block to claim, or let the registry pick the first free one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PioBlock {
    Auto,
    Specific(PioBlockId),
}

/// Which state machine within the chosen block to claim, or let the
/// registry pick. Only meaningful paired with `PioBlock::Specific`; see
/// [`Config`] for the combinations [`crate::Target::connect`] accepts.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StateMachine {
    Auto,
    Specific(StateMachineId),
}

/// Everything [`crate::Target::connect`] needs to bring a link up: pin
/// assignment, initial clock rate, retry budget, which PIO resource to
/// claim, and which AP on the target carries the Debug Module.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// GPIO number driving SWCLK.
    pub swclk_pin: u8,
    /// GPIO number driving SWDIO.
    pub swdio_pin: u8,
    /// Initial SWCLK frequency, kHz (§4.1, §6 default: 1000).
    pub freq_khz: u32,
    /// Cache DAP SELECT writes and DM per-hart register reads (§6 default: true).
    pub enable_caching: bool,
    /// WAIT-ACK retries before a transaction gives up (§6 default: 5).
    pub retry_count: u32,
    pub pio_block: PioBlock,
    pub state_machine: StateMachine,
    /// AP index the target's MEM-AP-backed Debug Module lives behind.
    pub dm_ap_sel: u8,
    pub polls: PollBudget,
}

impl Default for Config {
    /// `swclk_pin`/`swdio_pin` default to 0/1 as placeholders only — every
    /// board wires its debug pins differently, so a caller is expected to
    /// override them; every other field matches §6's stated defaults.
    fn default() -> Self {
        Self {
            swclk_pin: 0,
            swdio_pin: 1,
            freq_khz: 1000,
            enable_caching: true,
            retry_count: 5,
            pio_block: PioBlock::Auto,
            state_machine: StateMachine::Auto,
            dm_ap_sel: 0,
            polls: PollBudget::default(),
        }
    }
}
