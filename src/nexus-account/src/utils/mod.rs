//! Shared utilities for the engine.
//!
//! These helpers are small and deterministic; none of them touch the network.

pub mod bytes;
pub mod crypto;
pub mod flz;
