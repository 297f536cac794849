//! Kinematic character used by the headless sim and tests.
//!
//! This is a deliberately small movement simulation: a vertical capsule
//! (approximated by two spheres) that falls under scaled gravity, walks on
//! standable floors and slides along blocking geometry. It implements both
//! [`RopeCharacter`] and [`MovementAdapter`], so the rope core can drive it
//! exactly like a host engine's character.

use glam::Vec3;
use lariat_common::EntityId;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::geometry::GeometryQuery;
use crate::math::{project_out, KINDA_SMALL, UP};
use crate::movement::{
    FloorContact, MoveOutcome, MovementAdapter, MovementMode, PlacementMode, RopeCharacter,
    ViewPoint,
};

/// Clearance under which the character counts as touching its floor.
pub const FLOOR_CONTACT_DISTANCE: f32 = 2.4;

/// Gap kept between the capsule and any surface it is moved against.
const SKIN: f32 = 0.1;

/// Movement tuning for a [`KinematicCharacter`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicConfig {
    /// World gravity along Z
    pub gravity_z: f32,
    /// Walking speed
    pub walk_speed: f32,
    /// Jump velocity
    pub jump_velocity: f32,
    /// Terminal fall speed
    pub terminal_velocity: f32,
    /// Capsule half height
    pub half_height: f32,
    /// Capsule radius
    pub radius: f32,
    /// How far below the feet the floor probe reaches
    pub floor_probe_distance: f32,
    /// Minimum floor normal Z to walk on
    pub walkable_normal_z: f32,
}

impl Default for KinematicConfig {
    fn default() -> Self {
        Self {
            gravity_z: -980.0,
            walk_speed: 500.0,
            jump_velocity: 420.0,
            terminal_velocity: 4000.0,
            half_height: 88.0,
            radius: 34.0,
            floor_probe_distance: 200.0,
            walkable_normal_z: 0.7,
        }
    }
}

/// A capsule character with a minimal movement simulation.
pub struct KinematicCharacter {
    /// Unique entity ID
    entity_id: EntityId,
    /// Capsule centre in world space
    position: Vec3,
    /// Current velocity
    velocity: Vec3,
    /// Unit facing direction
    forward: Vec3,
    /// Current movement mode
    mode: MovementMode,
    /// Gravity multiplier
    gravity_scale: f32,
    /// Configuration
    config: KinematicConfig,
    /// World the character collides with
    scene: Option<Rc<dyn GeometryQuery>>,
    /// Whether the movement simulation is present
    has_movement: bool,
    /// Horizontal walk input (-1..1 per axis)
    walk_input: Vec3,
    /// Explicit aim override
    aim: Option<ViewPoint>,
    /// Fails every collision-aware move without progress
    block_moves: bool,
    /// Fails every checked placement
    block_checked_placement: bool,
    /// Number of jumps performed
    jumps: u32,
    /// Last launch velocity applied
    last_launch: Option<Vec3>,
}

impl std::fmt::Debug for KinematicCharacter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KinematicCharacter")
            .field("entity_id", &self.entity_id)
            .field("position", &self.position)
            .field("velocity", &self.velocity)
            .field("mode", &self.mode)
            .field("gravity_scale", &self.gravity_scale)
            .finish_non_exhaustive()
    }
}

impl KinematicCharacter {
    /// Create a falling character with no world at `position`.
    #[must_use]
    pub fn new(position: Vec3) -> Self {
        Self::with_config(position, KinematicConfig::default())
    }

    /// Create a character with custom configuration.
    #[must_use]
    pub fn with_config(position: Vec3, config: KinematicConfig) -> Self {
        Self {
            entity_id: EntityId::new(),
            position,
            velocity: Vec3::ZERO,
            forward: Vec3::X,
            mode: MovementMode::Falling,
            gravity_scale: 1.0,
            config,
            scene: None,
            has_movement: true,
            walk_input: Vec3::ZERO,
            aim: None,
            block_moves: false,
            block_checked_placement: false,
            jumps: 0,
            last_launch: None,
        }
    }

    /// Attaches the world the character collides with.
    #[must_use]
    pub fn in_scene(mut self, scene: Rc<dyn GeometryQuery>) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Get the character's entity ID.
    #[must_use]
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    /// Get the character's configuration.
    #[must_use]
    pub fn config(&self) -> &KinematicConfig {
        &self.config
    }

    /// Set the position directly.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Set the facing direction (flattened and normalized).
    pub fn set_forward(&mut self, forward: Vec3) {
        let flat = Vec3::new(forward.x, forward.y, 0.0);
        if flat.length_squared() > KINDA_SMALL {
            self.forward = flat.normalize();
        }
    }

    /// Overrides the aim origin and direction.
    pub fn set_aim(&mut self, origin: Vec3, direction: Vec3) {
        self.aim = Some(ViewPoint {
            origin,
            direction: direction.normalize_or_zero(),
        });
    }

    /// Clears the aim override so aiming follows the character.
    pub fn clear_aim(&mut self) {
        self.aim = None;
    }

    /// Sets horizontal walk input.
    pub fn set_walk_input(&mut self, input: Vec3) {
        self.walk_input = Vec3::new(input.x, input.y, 0.0).clamp_length_max(1.0);
    }

    /// Removes or restores the movement simulation.
    pub fn set_has_movement(&mut self, has_movement: bool) {
        self.has_movement = has_movement;
    }

    /// Makes every collision-aware move report a block without progress.
    pub fn set_block_moves(&mut self, block: bool) {
        self.block_moves = block;
    }

    /// Makes every checked placement fail.
    pub fn set_block_checked_placement(&mut self, block: bool) {
        self.block_checked_placement = block;
    }

    /// Number of jumps performed so far.
    #[must_use]
    pub fn jump_count(&self) -> u32 {
        self.jumps
    }

    /// Velocity of the most recent launch.
    #[must_use]
    pub fn last_launch(&self) -> Option<Vec3> {
        self.last_launch
    }

    /// Centres of the capsule's lower and upper spheres.
    fn sphere_centers(&self, at: Vec3) -> [Vec3; 2] {
        let offset = (self.config.half_height - self.config.radius).max(0.0);
        [at - UP * offset, at + UP * offset]
    }

    /// Fraction of `delta` the capsule can travel before touching geometry.
    fn sweep_fraction(&self, from: Vec3, delta: Vec3) -> Option<(f32, Vec3)> {
        let scene = self.scene.as_ref()?;
        self.sphere_centers(from)
            .into_iter()
            .filter_map(|center| scene.sweep_sphere(center, center + delta, self.config.radius))
            .map(|hit| (hit.fraction, hit.normal))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }

    fn overlaps_at(&self, at: Vec3) -> bool {
        let Some(scene) = self.scene.as_ref() else {
            return false;
        };
        let [low, high] = self.sphere_centers(at);
        let radius = self.config.radius;
        scene.overlaps_sphere(low, radius)
            || scene.overlaps_sphere(high, radius)
            || scene.overlaps_sphere(low.lerp(high, 0.5), radius)
    }

    /// Moves along `delta` until blocked, then slides once along the surface.
    fn slide(&mut self, delta: Vec3) -> MoveOutcome {
        let Some((fraction, normal)) = self.sweep_fraction(self.position, delta) else {
            self.position += delta;
            return MoveOutcome::CLEAR;
        };

        let length = delta.length();
        let travel = if length > KINDA_SMALL {
            (fraction * length - SKIN).max(0.0) / length
        } else {
            0.0
        };
        self.position += delta * travel;

        let remaining = project_out(delta * (1.0 - fraction), normal);
        if remaining.length_squared() > KINDA_SMALL {
            match self.sweep_fraction(self.position, remaining) {
                Some((second, _)) => {
                    let rem_len = remaining.length();
                    let step = (second * rem_len - SKIN).max(0.0) / rem_len;
                    self.position += remaining * step;
                },
                None => self.position += remaining,
            }
        }

        MoveOutcome {
            blocked: true,
            time: travel,
        }
    }

    fn touching_floor(&self) -> Option<FloorContact> {
        self.floor()
            .filter(|floor| floor.distance <= FLOOR_CONTACT_DISTANCE)
            .filter(|floor| floor.normal.z >= self.config.walkable_normal_z)
    }

    /// Advances the external movement simulation by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if !self.has_movement || dt <= 0.0 {
            return;
        }

        match self.mode {
            MovementMode::Falling => {
                self.velocity.z += self.config.gravity_z * self.gravity_scale * dt;
                self.velocity.z = self.velocity.z.max(-self.config.terminal_velocity);
                let outcome = self.slide(self.velocity * dt);
                if outcome.blocked {
                    if let Some((_, normal)) = self.sweep_fraction(self.position, self.velocity * dt)
                    {
                        self.velocity = project_out(self.velocity, normal);
                    }
                }

                if self.velocity.z <= 0.0 {
                    if let Some(floor) = self.touching_floor() {
                        self.position.z -= floor.distance;
                        self.velocity.z = 0.0;
                        self.mode = MovementMode::Walking;
                    }
                }
            },
            MovementMode::Walking => {
                let planar = self.walk_input * self.config.walk_speed;
                self.velocity = Vec3::new(planar.x, planar.y, 0.0);
                self.slide(self.velocity * dt);

                match self.touching_floor() {
                    Some(floor) => self.position.z -= floor.distance,
                    None => self.mode = MovementMode::Falling,
                }
            },
        }
    }
}

impl MovementAdapter for KinematicCharacter {
    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn mode(&self) -> MovementMode {
        self.mode
    }

    fn set_mode(&mut self, mode: MovementMode) {
        self.mode = mode;
    }

    fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    fn gravity_z(&self) -> f32 {
        self.config.gravity_z
    }

    fn floor(&self) -> Option<FloorContact> {
        let scene = self.scene.as_ref()?;
        let [low, _] = self.sphere_centers(self.position);
        let reach = self.config.radius + self.config.floor_probe_distance;
        let hit = scene.line_trace(low, low - UP * reach)?;
        Some(FloorContact {
            normal: hit.normal,
            distance: (hit.distance - self.config.radius).max(0.0),
        })
    }

    fn is_moving_on_ground(&self) -> bool {
        self.mode == MovementMode::Walking
    }

    fn safe_move(&mut self, delta: Vec3) -> MoveOutcome {
        if self.block_moves {
            return MoveOutcome {
                blocked: true,
                time: 0.0,
            };
        }
        self.slide(delta)
    }
}

impl RopeCharacter for KinematicCharacter {
    fn location(&self) -> Vec3 {
        self.position
    }

    fn place(&mut self, target: Vec3, mode: PlacementMode) -> bool {
        if mode == PlacementMode::Checked
            && (self.block_checked_placement || self.overlaps_at(target))
        {
            return false;
        }
        self.position = target;
        true
    }

    fn forward(&self) -> Vec3 {
        self.forward
    }

    fn right(&self) -> Vec3 {
        UP.cross(self.forward)
    }

    fn view_point(&self) -> ViewPoint {
        self.aim.unwrap_or(ViewPoint {
            origin: self.position,
            direction: self.forward,
        })
    }

    fn half_height(&self) -> f32 {
        self.config.half_height
    }

    fn jump(&mut self) {
        if self.mode == MovementMode::Walking {
            self.velocity.z = self.config.jump_velocity;
            self.mode = MovementMode::Falling;
        }
        self.jumps += 1;
    }

    fn launch(&mut self, velocity: Vec3, override_xy: bool, override_z: bool) {
        let mut next = self.velocity;
        if override_xy {
            next.x = velocity.x;
            next.y = velocity.y;
        } else {
            next.x += velocity.x;
            next.y += velocity.y;
        }
        next.z = if override_z {
            velocity.z
        } else {
            next.z + velocity.z
        };
        self.velocity = next;
        self.mode = MovementMode::Falling;
        self.last_launch = Some(velocity);
    }

    fn movement(&self) -> Option<&dyn MovementAdapter> {
        if self.has_movement {
            Some(self as &dyn MovementAdapter)
        } else {
            None
        }
    }

    fn movement_mut(&mut self) -> Option<&mut dyn MovementAdapter> {
        if self.has_movement {
            Some(self as &mut dyn MovementAdapter)
        } else {
            None
        }
    }
}
