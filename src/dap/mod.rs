//! DAP transactor (§4.2): builds request headers, performs WAIT-ACK retry,
//! maintains the cached SELECT register, clears sticky errors on FAULT, and
//! exposes read/write for DP and AP registers.

pub mod dp;
mod select;
mod transactor;

pub use select::SelectState;
pub use transactor::{decode_idcode, ApField, DapTransactor};
