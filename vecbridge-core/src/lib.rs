//! vecbridge Core - Deterministic Simulation Toolkit
//!
//! `TigerStyle` simulation-first primitives shared by the `vecbridge` crate.
//!
//! # Philosophy
//!
//! > "If you're not testing with fault injection, you're not testing."
//!
//! Every vector backend in `vecbridge` can be driven under simulation:
//! 1. Randomness flows through a seeded [`DeterministicRng`]
//! 2. Time flows through a [`SimClock`] (backoff sleeps advance it instantly)
//! 3. Backend faults (rate limits, timeouts, rejected writes) come from a [`FaultInjector`]
//! 4. Seeds are logged for reproducibility
//!
//! # Usage
//!
//! ```rust
//! use vecbridge_core::dst::{DeterministicRng, FaultConfig, FaultInjectorBuilder, FaultType};
//!
//! let injector = FaultInjectorBuilder::new(DeterministicRng::new(42))
//!     .with_fault(FaultConfig::new(FaultType::WriteRateLimit, 1.0).with_max_injections(2))
//!     .build();
//!
//! assert_eq!(injector.should_inject("upsert"), Some(FaultType::WriteRateLimit));
//! assert_eq!(injector.should_inject("upsert"), Some(FaultType::WriteRateLimit));
//! assert_eq!(injector.should_inject("upsert"), None);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod constants;
pub mod dst;

// Re-export common types
pub use constants::*;
pub use dst::{
    DeterministicRng, FaultConfig, FaultInjector, FaultInjectorBuilder, FaultType, SimClock,
    SimConfig,
};
