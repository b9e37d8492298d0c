#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Shared utilities for esbridge.
//!
//! Pure helper functions with no logging/tracing dependencies.
//! Logging is handled by the CLI crate and the core crate's `tracing` calls.

pub mod fs;
pub mod hash;
