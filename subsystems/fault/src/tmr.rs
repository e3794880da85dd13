//! # Triple Modular Redundancy Voting
//!
//! Majority vote across three redundant computations of the same value.

/// Sentinel returned when all three voters disagree.
///
/// The sentinel collides with a legitimate majority of `0xFF`; callers
/// whose value space includes small integers must track the no-majority
/// condition out of band (for example by checking the three inputs
/// themselves) rather than comparing against the sentinel.
pub const TMR_NO_MAJORITY: u32 = 0xFF;

/// Majority-vote three redundant results.
///
/// Returns the value at least two voters agree on, or
/// [`TMR_NO_MAJORITY`] when all three differ (logged as an error).
pub fn tmr_vote(a: u32, b: u32, c: u32) -> u32 {
    if a == b || a == c {
        a
    } else if b == c {
        b
    } else {
        log::error!("[fault] TMR_NO_MAJORITY: {:#x} / {:#x} / {:#x}", a, b, c);
        TMR_NO_MAJORITY
    }
}

// =============================================================================
// Tests
// =============================================================================
