//! DST - Deterministic Simulation Testing
//!
//! Primitives for driving vector backends through reproducible failure
//! scenarios.
//!
//! # Usage
//!
//! ```rust
//! use vecbridge_core::dst::{SimClock, SimConfig, DeterministicRng};
//!
//! let config = SimConfig::with_seed(42);
//! let mut rng = DeterministicRng::new(config.seed());
//! let clock = SimClock::new();
//!
//! let jitter = rng.next_float();
//! clock.advance_ms(1000 + (jitter * 1000.0) as u64);
//! assert!(clock.now_ms() >= 1000);
//! ```
//!
//! Run with explicit seed for reproducibility:
//! ```bash
//! DST_SEED=12345 cargo test
//! ```

mod clock;
mod config;
mod fault;
mod rng;

pub use clock::SimClock;
pub use config::SimConfig;
pub use fault::{FaultConfig, FaultInjector, FaultInjectorBuilder, FaultType};
pub use rng::DeterministicRng;
