//! # Lariat Gameplay
//!
//! Rope traversal for a player-controlled character.
//!
//! This crate provides the rope core and the collaborators it talks to:
//! - Rope state machine (aim, throw, hang, swing, climb, ledge assist, recall)
//! - Tuning configuration loaded from TOML
//! - Collision query and movement adapter traits
//! - A static box scene and a kinematic character for headless use
//! - Serializable rope commands
//! - Diagnostics events and debug shapes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod command;
pub mod config;
pub mod diagnostics;
pub mod geometry;
pub mod kinematic;
pub mod math;
pub mod movement;
pub mod state;
pub mod traversal;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::command::*;
    pub use crate::config::*;
    pub use crate::diagnostics::*;
    pub use crate::geometry::*;
    pub use crate::kinematic::*;
    pub use crate::movement::*;
    pub use crate::state::*;
    pub use crate::traversal::*;
}

pub use prelude::*;
