//! `TigerStyle` Constants
//!
//! All limits use big-endian naming: `CATEGORY_SPECIFICS_UNIT_LIMIT`
//! Example: `DST_TIME_ADVANCE_MS_MAX` (not `MAX_TIME_ADVANCE`)

// =============================================================================
// DST (Deterministic Simulation Testing) Limits
// =============================================================================

/// Maximum number of simulation steps
pub const DST_SIMULATION_STEPS_MAX: u64 = 1_000_000;

/// Maximum probability for fault injection (1.0 = 100%)
pub const DST_FAULT_PROBABILITY_MAX: f64 = 1.0;

/// Maximum time advance per step in milliseconds
pub const DST_TIME_ADVANCE_MS_MAX: u64 = 86_400_000; // 24 hours

/// Maximum number of bytes `DeterministicRng::next_bytes` will produce
pub const DST_RNG_BYTES_MAX: usize = 1_000_000;

// =============================================================================
// Time Constants
// =============================================================================

/// Milliseconds per second
pub const TIME_MS_PER_SEC: u64 = 1000;

/// Milliseconds per minute
pub const TIME_MS_PER_MIN: u64 = 60 * TIME_MS_PER_SEC;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dst_limits_valid() {
        assert!(DST_FAULT_PROBABILITY_MAX <= 1.0);
        assert!(DST_TIME_ADVANCE_MS_MAX >= TIME_MS_PER_MIN);
    }

    #[test]
    fn test_time_constants_consistent() {
        assert_eq!(TIME_MS_PER_MIN, 60_000);
    }
}
