//! Serializable rope commands and jump routing.
//!
//! [`RopeCommand`] mirrors the command surface of [`RopeTraversal`] so that
//! input layers and scripted scenarios can drive a rope from data.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::traversal::RopeTraversal;

/// A single rope command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RopeCommand {
    /// Enter aim mode
    StartAim,
    /// Leave aim mode
    StopAim,
    /// Throw at the current preview target
    Throw,
    /// Grab a nearby rope, or release and recall a held one
    ToggleHold,
    /// Start retracting the rope
    BeginRecall,
    /// Stop retracting the rope
    CancelRecall,
    /// Swing axis for the next hang tick
    Swing {
        /// Right axis
        right: f32,
        /// Forward axis
        forward: f32,
    },
    /// Reel in toward the anchor
    ClimbUp,
    /// Pay out rope
    ClimbDown,
    /// Stop climbing
    StopClimb,
    /// Analog climb axis
    ClimbAxis {
        /// Positive climbs up, negative climbs down
        value: f32,
    },
    /// Let go of the rope
    Release {
        /// Launch along the swing
        #[serde(default)]
        jump: bool,
    },
    /// Jump button pressed
    Jump,
    /// Clear everything
    ForceReset,
}

/// How the rope handled a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The rope processed the command
    Applied,
    /// The rope used the input; the host must not act on it
    Consumed,
    /// The rope did not use the input; the host should handle it normally
    Passed,
}

impl RopeCommand {
    /// Dispatches the command to `rope`.
    pub fn apply(self, rope: &mut RopeTraversal) -> CommandOutcome {
        match self {
            Self::StartAim => rope.start_aim(),
            Self::StopAim => rope.stop_aim(),
            Self::Throw => rope.throw_rope(),
            Self::ToggleHold => rope.toggle_hold(),
            Self::BeginRecall => rope.begin_recall(),
            Self::CancelRecall => rope.cancel_recall(),
            Self::Swing { right, forward } => rope.apply_swing_input(Vec2::new(right, forward)),
            Self::ClimbUp => rope.begin_climb_up(),
            Self::ClimbDown => rope.begin_climb_down(),
            Self::StopClimb => rope.stop_climb(),
            Self::ClimbAxis { value } => rope.apply_climb_axis(value),
            Self::Release { jump } => rope.release_rope(jump),
            Self::Jump => return rope.handle_jump(),
            Self::ForceReset => rope.force_reset(),
        }
        CommandOutcome::Applied
    }
}

impl RopeTraversal {
    /// Routes a jump press. A successful ledge climb consumes the jump, and
    /// so does hanging; otherwise the host should jump normally.
    pub fn handle_jump(&mut self) -> CommandOutcome {
        if self.request_ledge_climb_from_jump() || self.is_hanging() {
            CommandOutcome::Consumed
        } else {
            CommandOutcome::Passed
        }
    }
}
