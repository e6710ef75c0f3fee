//! Stable error codes and the bounded diagnostic detail carried alongside them.
//!
//! Every fallible operation on [`crate::Target`] returns an [`Error`]. The
//! handle additionally stashes the most recent `Error` and a short detail
//! string for out-of-band inspection via
//! [`Target::last_error_detail`](crate::Target::last_error_detail); see
//! §7 of the design notes for the three-tier taxonomy these codes fall into.

use core::fmt;

/// Maximum length, in bytes, of a stored error detail string.
pub const DETAIL_CAPACITY: usize = 128;

/// Bounded, stack-allocated detail string attached to the last error.
pub type Detail = heapless::String<DETAIL_CAPACITY>;

/// Stable error codes returned by every fallible operation in this crate.
///
/// Grouped here by the three tiers from the design notes; the grouping is
/// informative only; all variants share one flat enum so callers can match
/// on exactly the code they care about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    // --- line-level: recoverable with line reset + sticky-clear + retry ---
    /// A poll loop exceeded its deadline.
    Timeout,
    /// The DP/AP transaction ACK was `FAULT`; sticky error bits were cleared.
    TargetFault,
    /// The SWD ACK phase returned a value other than OK/WAIT/FAULT.
    Protocol,
    /// A parity bit did not match the transferred word.
    Parity,
    /// WAIT-ACK retries were exhausted.
    Wait,

    // --- protocol-level: precondition violations ---
    /// The target handle has not completed `connect()`.
    NotConnected,
    /// The Debug Module has not been initialized.
    NotInitialized,
    /// The operation requires the hart to be halted, but it is running.
    NotHalted,
    /// `halt()` was called on a hart that is already halted.
    AlreadyHalted,
    /// The handle or a substate is not in a state that admits this operation.
    InvalidState,

    // --- semantic: report and abandon, handle remains usable ---
    /// A Debug Module abstract command completed with a non-zero `cmderr`.
    AbstractCommand,
    /// A System Bus Access completed with a non-zero `sberror`.
    Bus,
    /// A memory address was not aligned to the access width.
    Alignment,
    /// A read-back value did not match what was written.
    Verify,
    /// A caller-supplied parameter (hart index, register index, ...) is out of range.
    InvalidParameter,
    /// A `Config` value is out of its legal range.
    InvalidConfiguration,
    /// The process-wide PIO/state-machine registry has no free slot.
    ResourceBusy,
    /// An allocation-free fixed buffer was too small for the request.
    NoMemory,
}

impl Error {
    /// Short, stable, machine-referenceable name for this error code.
    pub const fn name(self) -> &'static str {
        match self {
            Error::Timeout => "timeout",
            Error::TargetFault => "target-fault",
            Error::Protocol => "protocol",
            Error::Parity => "parity",
            Error::Wait => "wait",
            Error::NotConnected => "not-connected",
            Error::NotInitialized => "not-initialized",
            Error::NotHalted => "not-halted",
            Error::AlreadyHalted => "already-halted",
            Error::InvalidState => "invalid-state",
            Error::AbstractCommand => "abstract-command",
            Error::Bus => "bus",
            Error::Alignment => "alignment",
            Error::Verify => "verify",
            Error::InvalidParameter => "invalid-parameter",
            Error::InvalidConfiguration => "invalid-configuration",
            Error::ResourceBusy => "resource-busy",
            Error::NoMemory => "no-memory",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl core::error::Error for Error {}

/// Build a bounded detail string from a `core::fmt::Arguments`, truncating
/// silently if the formatted text would overflow [`DETAIL_CAPACITY`].
///
/// Mirrors `write!` but never panics or propagates a capacity error: the
/// detail slot is diagnostic-only, so a truncated message is preferable to
/// losing the underlying `Error` code over a formatting failure.
pub(crate) fn build_detail(args: fmt::Arguments<'_>) -> Detail {
    use core::fmt::Write;
    let mut s = Detail::new();
    // `heapless::String::write_fmt` stops (without panicking) once capacity
    // is reached; the `Err` it may return here is exactly that truncation.
    let _ = s.write_fmt(args);
    s
}

/// Convenience macro mirroring `format!`, producing a bounded [`Detail`].
macro_rules! detail {
    ($($arg:tt)*) => {
        $crate::error::build_detail(core::format_args!($($arg)*))
    };
}

pub(crate) use detail;

/// A result carrying both an [`Error`] and the detail string that explains it,
/// for call sites that want to propagate context without going through the
/// handle's `last_error` slot (e.g. within the DM driver before a `Target`
/// exists to store it on).
pub(crate) type DetailedResult<T> = Result<T, (Error, Detail)>;
