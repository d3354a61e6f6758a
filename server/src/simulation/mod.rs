//! Deterministic Simulation Testing (DST) infrastructure.
//!
//! This module provides tools for testing the store with:
//! - Controlled time (no real system time)
//! - Reproducible random workload generation
//! - Invariant checking after each operation
//!
//! # Design Principles
//!
//! 1. All randomness is seeded for reproducibility
//! 2. Time is controlled, not real: replication and client delays advance
//!    the virtual clock instead of blocking
//! 3. Given the same seed, execution is identical
//!
//! # Usage
//!
//! ```
//! use lagstore::simulation::{Simulator, SimulatorConfig};
//!
//! let config = SimulatorConfig::new(12345) // seed
//!     .with_topology(2, 3)
//!     .with_malformed_rate(0.1);
//!
//! let mut sim = Simulator::new(config);
//! let result = sim.run(500);
//!
//! assert!(result.invariant_violations.is_empty());
//! ```

mod invariants;
mod simulator;
mod time;
mod workload;

pub use invariants::{InvariantChecker, InvariantViolation};
pub use simulator::{SimulationResult, Simulator, SimulatorConfig};
pub use time::SimulatedTimeSource;
pub use workload::{Malformation, WorkloadConfig, WorkloadGenerator};
