use thiserror::Error;

use crate::stats::SimMetrics;
use crate::timeq::Cycle;

/// Rejected configurations.  No simulator is constructed when any of these
/// fire; the caller gets told exactly which knob is wrong.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("line_bytes must be a nonzero power of two, got {0}")]
    LineBytesNotPowerOfTwo(u64),

    #[error("{tier} capacity must be positive")]
    ZeroCapacity { tier: &'static str },

    #[error("{tier} bank count {banks} must be positive and divide {lines} total lines")]
    BadBankCount {
        tier: &'static str,
        banks: usize,
        lines: u64,
    },

    #[error("{field} must be positive")]
    ZeroParameter { field: &'static str },
}

/// Run-time failures.  The simulator recovers nothing locally: its value is
/// deterministic accounting, so every anomaly surfaces to the caller.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("byte address {addr:#x} exceeds the {bits}-bit line key range")]
    AddressOverflow { addr: u64, bits: u32 },

    #[error("tier-2 miss on line {line_key:#x}: working set exceeds tier-2 capacity")]
    Tier2Miss { line_key: u64 },

    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("cycle budget {budget} exceeded at cycle {cycle}")]
    BudgetExceeded {
        budget: Cycle,
        cycle: Cycle,
        metrics: Box<SimMetrics>,
    },
}
