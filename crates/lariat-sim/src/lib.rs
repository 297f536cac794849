//! # Lariat Sim
//!
//! Headless driver for the rope core.
//!
//! This crate wires the gameplay crate into a runnable session:
//! - Sim configuration loaded from TOML
//! - Demo scenes built from static boxes
//! - Scripted scenario timelines loaded from JSON
//! - A fixed-rate runner that reports rope phase changes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod scenario;
pub mod world;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::scenario::*;
    pub use crate::world::*;
}

pub use prelude::*;
