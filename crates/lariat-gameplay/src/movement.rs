//! Collaborator surface between the rope core and the character it drives.
//!
//! The rope reads and writes the character's movement through
//! [`MovementAdapter`] and reaches the character itself through a
//! non-owning [`OwnerHandle`]. Either collaborator may be missing at any
//! time; the core checks for both before every use.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

/// Movement mode of the external movement simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// Grounded locomotion
    #[default]
    Walking,
    /// Ballistic motion under gravity
    Falling,
}

/// Floor currently under the character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorContact {
    /// Surface normal of the floor
    pub normal: Vec3,
    /// Clearance between the character's feet and the floor
    pub distance: f32,
}

impl FloorContact {
    /// Checks whether the floor faces up steeply enough to stand on.
    #[must_use]
    pub fn is_standable(&self, min_normal_z: f32) -> bool {
        self.normal.z >= min_normal_z
    }
}

/// Outcome of a collision-aware move.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveOutcome {
    /// Whether geometry blocked the move
    pub blocked: bool,
    /// Fraction of the move completed before the block (1.0 when unblocked)
    pub time: f32,
}

impl MoveOutcome {
    /// An unblocked move.
    pub const CLEAR: Self = Self {
        blocked: false,
        time: 1.0,
    };
}

/// How a character placement treats overlapping geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementMode {
    /// Teleport-style placement that fails if the destination is blocked
    Checked,
    /// Unconditional placement
    Unchecked,
}

/// Point and direction the player is aiming from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPoint {
    /// Aim origin
    pub origin: Vec3,
    /// Unit aim direction
    pub direction: Vec3,
}

/// Movement simulation driving the character between rope updates.
pub trait MovementAdapter {
    /// Current linear velocity.
    fn velocity(&self) -> Vec3;

    /// Overwrites the linear velocity.
    fn set_velocity(&mut self, velocity: Vec3);

    /// Current movement mode.
    fn mode(&self) -> MovementMode;

    /// Switches the movement mode.
    fn set_mode(&mut self, mode: MovementMode);

    /// Gravity multiplier applied by the movement simulation.
    fn gravity_scale(&self) -> f32;

    /// Overwrites the gravity multiplier.
    fn set_gravity_scale(&mut self, scale: f32);

    /// World gravity along Z (negative pulls down).
    fn gravity_z(&self) -> f32;

    /// Floor under the character, if any blocking floor was found.
    fn floor(&self) -> Option<FloorContact>;

    /// Whether the character is walking on the ground.
    fn is_moving_on_ground(&self) -> bool;

    /// Moves by `delta`, sliding along blocking geometry.
    fn safe_move(&mut self, delta: Vec3) -> MoveOutcome;
}

/// The character that owns a rope.
pub trait RopeCharacter {
    /// World location of the character's centre.
    fn location(&self) -> Vec3;

    /// Places the character at `target`. Returns whether it was placed.
    fn place(&mut self, target: Vec3, mode: PlacementMode) -> bool;

    /// Unit facing direction.
    fn forward(&self) -> Vec3;

    /// Unit right direction.
    fn right(&self) -> Vec3;

    /// Where the player is aiming from.
    fn view_point(&self) -> ViewPoint {
        ViewPoint {
            origin: self.location(),
            direction: self.forward(),
        }
    }

    /// Half height of the character's collision capsule.
    fn half_height(&self) -> f32;

    /// Starts a regular jump.
    fn jump(&mut self);

    /// Launches the character, optionally replacing velocity components.
    fn launch(&mut self, velocity: Vec3, override_xy: bool, override_z: bool);

    /// Movement simulation, if the character has one.
    fn movement(&self) -> Option<&dyn MovementAdapter>;

    /// Mutable movement simulation, if the character has one.
    fn movement_mut(&mut self) -> Option<&mut dyn MovementAdapter>;
}

/// Shared owner type the rope core points at.
pub type SharedCharacter = Rc<RefCell<dyn RopeCharacter>>;

/// Non-owning handle from the rope to its character.
#[derive(Clone, Default)]
pub struct OwnerHandle {
    owner: Option<Weak<RefCell<dyn RopeCharacter>>>,
}

impl OwnerHandle {
    /// Handle with no owner.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Handle to `owner` that does not keep it alive.
    #[must_use]
    pub fn new(owner: &SharedCharacter) -> Self {
        Self {
            owner: Some(Rc::downgrade(owner)),
        }
    }

    /// Checks that the owner is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.owner.as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Upgrades to a strong reference if the owner is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<SharedCharacter> {
        self.owner.as_ref().and_then(Weak::upgrade)
    }
}

impl std::fmt::Debug for OwnerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Mutably borrows a live owner, treating a re-entrant borrow as absent.
pub(crate) fn borrow_owner(
    owner: &SharedCharacter,
) -> Option<RefMut<'_, dyn RopeCharacter + 'static>> {
    owner.try_borrow_mut().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematic::KinematicCharacter;

    #[test]
    fn test_floor_standable() {
        let flat = FloorContact {
            normal: Vec3::Z,
            distance: 0.0,
        };
        let slope = FloorContact {
            normal: Vec3::new(0.8, 0.0, 0.6),
            distance: 0.0,
        };
        assert!(flat.is_standable(0.85));
        assert!(!slope.is_standable(0.85));
    }

    #[test]
    fn test_owner_handle_liveness() {
        let character: SharedCharacter =
            Rc::new(RefCell::new(KinematicCharacter::new(Vec3::ZERO)));
        let handle = OwnerHandle::new(&character);

        assert!(handle.is_alive());
        assert!(handle.upgrade().is_some());

        drop(character);
        assert!(!handle.is_alive());
        assert!(handle.upgrade().is_none());
        assert!(!OwnerHandle::none().is_alive());
    }

    #[test]
    fn test_reentrant_borrow_is_absent() {
        let character: SharedCharacter =
            Rc::new(RefCell::new(KinematicCharacter::new(Vec3::ZERO)));
        let _held = character.borrow_mut();
        assert!(borrow_owner(&character).is_none());
    }
}
