//! Rope state.
//!
//! [`RopeState`] is the single source of truth for the rope mode. Each
//! variant carries only the data that is meaningful in that mode, so
//! combinations such as "hanging but not attached" cannot be represented.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// World point and surface normal the rope is fixed to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Anchor point in world space
    pub location: Vec3,
    /// Outward surface normal at the anchor
    pub normal: Vec3,
}

/// A rope fixed to an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rope {
    /// Where the rope is fixed
    pub anchor: Anchor,
    /// Current simulated length
    pub length: f32,
}

/// A rope travelling toward its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    /// Thrower location when the rope left
    pub start: Vec3,
    /// Target anchor point
    pub target: Vec3,
    /// Surface normal at the target
    pub normal: Vec3,
    /// Straight-line distance from start to target
    pub distance: f32,
    /// Seconds since the throw
    pub elapsed: f32,
    /// Total flight time in seconds
    pub duration: f32,
}

impl Flight {
    /// Normalized flight progress in `[0, 1]`.
    #[must_use]
    pub fn alpha(&self) -> f32 {
        if self.duration > crate::math::KINDA_SMALL {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        } else {
            1.0
        }
    }
}

/// Result of the aim probe.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Preview {
    /// Whether the probe hit anything
    pub has_hit: bool,
    /// Whether the hit lies within rope reach of the character
    pub within_range: bool,
    /// Impact point
    pub point: Vec3,
    /// Impact normal
    pub normal: Vec3,
}

impl Preview {
    /// A preview with no hit.
    pub const NONE: Self = Self {
        has_hit: false,
        within_range: false,
        point: Vec3::ZERO,
        normal: Vec3::ZERO,
    };
}

/// Discrete climb input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClimbSign {
    /// Pay out rope
    Down,
    /// No climb input
    #[default]
    None,
    /// Reel in toward the anchor
    Up,
}

impl ClimbSign {
    /// Sign as a scalar (-1, 0 or +1).
    #[must_use]
    pub fn value(self) -> f32 {
        match self {
            Self::Down => -1.0,
            Self::None => 0.0,
            Self::Up => 1.0,
        }
    }
}

/// Field-less rope mode, used for logging and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RopePhase {
    /// No rope in the world
    #[default]
    Idle,
    /// Probing for a target
    Aiming,
    /// Rope in flight
    Airborne,
    /// Rope anchored; player may be holding it on foot
    Attached,
    /// Player swinging from the rope
    Hanging,
    /// Rope retracting
    Recalling,
}

impl std::fmt::Display for RopePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Aiming => "aiming",
            Self::Airborne => "airborne",
            Self::Attached => "attached",
            Self::Hanging => "hanging",
            Self::Recalling => "recalling",
        };
        f.write_str(name)
    }
}

/// Authoritative rope mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RopeState {
    /// No rope in the world
    #[default]
    Idle,
    /// Probing for a target
    Aiming,
    /// Rope in flight toward its target
    Airborne {
        /// Flight parameters
        flight: Flight,
        /// Current position of the rope end
        marker: Vec3,
    },
    /// Rope anchored
    Attached {
        /// The anchored rope
        rope: Rope,
        /// Whether the player is holding the rope on foot
        holding: bool,
    },
    /// Player swinging from the rope
    Hanging {
        /// The anchored rope
        rope: Rope,
        /// Gravity scale to restore on exit
        saved_gravity_scale: f32,
    },
    /// Rope retracting
    Recalling {
        /// The anchored rope
        rope: Rope,
        /// Seconds since recall began
        elapsed: f32,
    },
}

impl RopeState {
    /// Field-less phase of this state.
    #[must_use]
    pub fn phase(&self) -> RopePhase {
        match self {
            Self::Idle => RopePhase::Idle,
            Self::Aiming => RopePhase::Aiming,
            Self::Airborne { .. } => RopePhase::Airborne,
            Self::Attached { .. } => RopePhase::Attached,
            Self::Hanging { .. } => RopePhase::Hanging,
            Self::Recalling { .. } => RopePhase::Recalling,
        }
    }

    /// The anchored rope, if any.
    #[must_use]
    pub fn rope(&self) -> Option<&Rope> {
        match self {
            Self::Attached { rope, .. } | Self::Hanging { rope, .. } | Self::Recalling { rope, .. } => {
                Some(rope)
            },
            _ => None,
        }
    }

    /// Mutable access to the anchored rope, if any.
    pub fn rope_mut(&mut self) -> Option<&mut Rope> {
        match self {
            Self::Attached { rope, .. } | Self::Hanging { rope, .. } | Self::Recalling { rope, .. } => {
                Some(rope)
            },
            _ => None,
        }
    }

    /// Whether the rope is fixed to the world.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.rope().is_some()
    }

    /// Whether the player is holding the rope.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        matches!(
            self,
            Self::Attached { holding: true, .. } | Self::Hanging { .. }
        )
    }

    /// Whether the player is hanging from the rope.
    #[must_use]
    pub fn is_hanging(&self) -> bool {
        matches!(self, Self::Hanging { .. })
    }

    /// Anchor point for visualization: the rope end while in flight,
    /// the anchor once attached.
    #[must_use]
    pub fn anchor_location(&self) -> Option<Vec3> {
        match self {
            Self::Airborne { marker, .. } => Some(*marker),
            _ => self.rope().map(|rope| rope.anchor.location),
        }
    }
}

/// Swing input slot consumed once per hang tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SwingInput(Vec2);

impl SwingInput {
    /// Stores the axis for the next hang tick.
    pub fn set(&mut self, axis: Vec2) {
        self.0 = axis;
    }

    /// Reads the pending axis without consuming it.
    #[must_use]
    pub fn peek(&self) -> Vec2 {
        self.0
    }

    /// Takes the pending axis, leaving zero behind.
    pub fn take(&mut self) -> Vec2 {
        std::mem::take(&mut self.0)
    }

    /// Drops any pending axis.
    pub fn clear(&mut self) {
        self.0 = Vec2::ZERO;
    }
}
