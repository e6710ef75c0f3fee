//! On-device SWD host library: lets an RP2350-class MCU act as its own
//! debug probe, driving the SWD line protocol, the ADIv5.2 DAP transactor,
//! and the RISC-V Debug Module of a second RP2350-class target over its
//! two harts.
//!
//! [`Target`] is the entry point: construct one from a [`Config`], hand it
//! a board-specific PIO state machine via [`Target::connect`], and drive
//! the target's harts through halt/resume/step/reset, register and memory
//! access, and instruction trace.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod dap;
pub mod dm;
pub mod error;
pub mod line;
pub mod registry;
pub mod target;

pub use config::Config;
pub use dm::{Hart, HaltState, TraceCallback, TraceOptions, TraceRecord};
pub use error::Error;
pub use target::{ResourceUsage, Target, TargetInfo};
