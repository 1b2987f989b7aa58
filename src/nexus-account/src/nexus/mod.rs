//! Nexus (ERC-4337 v0.7 / ERC-7579) protocol surface.
//!
//! Keeps every contract constant and ABI shape in one place so the encoders elsewhere never
//! hand-roll selectors.

pub mod constants;
pub mod interfaces;
