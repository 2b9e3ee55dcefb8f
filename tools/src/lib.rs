//! Inspection and simulation tools for ghostwire.
//!
//! - Load level files and show what the construction pipeline built
//! - Run a host and observers over a lossy, reordering transport and check
//!   that every observer converges to host state
//!
//! # Design Principles
//!
//! - **Deterministic** - A simulation is fully described by its config and seed.
//! - **Human-readable output** - Pretty text for people, JSON for scripts.

mod inspect;
mod sim;

pub use inspect::{
    collect_level_paths, format_level_pretty, inspect_level, LevelReport, ObjectSummary,
};
pub use sim::{simulate, ObserverReport, Rng, SimConfig, SimReport, Simulation};
