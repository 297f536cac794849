//! Holding, hanging, swinging and release.

use glam::{Vec2, Vec3};
use tracing::debug;

use super::RopeTraversal;
use crate::math::{project_out, split, KINDA_SMALL};
use crate::movement::{MovementAdapter, MovementMode, PlacementMode, RopeCharacter};
use crate::state::{ClimbSign, RopeState};

impl RopeTraversal {
    /// Stores the swing axis for the next hang tick (`x` right, `y` forward).
    pub fn apply_swing_input(&mut self, axis: Vec2) {
        if self.state.is_hanging() {
            self.swing_input.set(axis);
        }
    }

    /// Lets go of the rope. With `jump_release` a hanging character is
    /// launched along its swing.
    pub fn release_rope(&mut self, jump_release: bool) {
        if self.owner.upgrade().is_none() {
            self.reset_for_missing("release_rope", "owner");
            return;
        }
        if !self.state.is_holding() {
            self.reject("release_rope");
            return;
        }
        self.with_live_owner("release_rope", |this, character| {
            this.release_from(character, jump_release);
        });
    }

    fn release_from(&mut self, character: &mut dyn RopeCharacter, jump_release: bool) {
        if self.state.is_hanging() {
            self.exit_hanging(character);
            if jump_release {
                let swing = character
                    .movement()
                    .map_or(Vec3::ZERO, |movement| movement.velocity().normalize_or_zero());
                let launch = swing * self.config.release_launch_speed
                    + character.forward() * self.config.release_forward_speed;
                debug!(?launch, "jump release");
                character.launch(launch, true, true);
            }
        }

        let next = match self.state.rope() {
            Some(rope) => RopeState::Attached {
                rope: *rope,
                holding: false,
            },
            None => RopeState::Idle,
        };
        self.set_state(next);
    }

    /// Grabs the attached rope, re-measuring its length. A character off the
    /// ground with the rope already taut starts hanging.
    pub(super) fn engage_hold(&mut self, character: &mut dyn RopeCharacter) {
        let Some(mut rope) = self.state.rope().copied() else {
            return;
        };

        let distance = character.location().distance(rope.anchor.location);
        rope.length = distance.clamp(self.config.climb_floor(), self.config.max_length);
        self.set_state(RopeState::Attached {
            rope,
            holding: true,
        });

        let airborne = character
            .movement()
            .is_some_and(|movement| !movement.is_moving_on_ground());
        if airborne && distance >= rope.length - self.config.taut_tolerance {
            self.enter_hanging(character);
        }
    }

    /// Switches to hanging. Returns whether the character is hanging afterwards.
    pub(super) fn enter_hanging(&mut self, character: &mut dyn RopeCharacter) -> bool {
        if self.state.is_hanging() {
            return true;
        }
        let Some(rope) = self.state.rope().copied() else {
            return false;
        };

        let location = character.location();
        let Some(movement) = character.movement_mut() else {
            self.reset_for_missing("hang", "movement");
            return false;
        };

        let saved_gravity_scale = movement.gravity_scale();
        movement.set_mode(MovementMode::Falling);
        movement.set_gravity_scale(saved_gravity_scale);
        if let Some((radial, _)) = split(location - rope.anchor.location) {
            let tangential = project_out(movement.velocity(), radial);
            movement.set_velocity(tangential);
        }

        self.set_state(RopeState::Hanging {
            rope,
            saved_gravity_scale,
        });
        true
    }

    /// Leaves hanging for a held rope on foot, restoring movement settings.
    pub(super) fn exit_hanging(&mut self, character: &mut dyn RopeCharacter) {
        let RopeState::Hanging {
            rope,
            saved_gravity_scale,
        } = self.state
        else {
            return;
        };

        if let Some(movement) = character.movement_mut() {
            movement.set_gravity_scale(saved_gravity_scale);
            let mode = if movement.is_moving_on_ground() {
                MovementMode::Walking
            } else {
                MovementMode::Falling
            };
            movement.set_mode(mode);
        }

        self.climb_sign = ClimbSign::None;
        self.swing_input.clear();
        self.set_state(RopeState::Attached {
            rope,
            holding: true,
        });
    }

    /// Pendulum update for a hanging character.
    pub(super) fn tick_hanging(&mut self, character: &mut dyn RopeCharacter, dt: f32) {
        let Some(rope) = self.state.rope().copied() else {
            return;
        };
        if character.movement().is_none() {
            self.reset_for_missing("hang", "movement");
            return;
        }

        if self.config.ground_exit_before_ledge && self.grounded_while_hanging(character) {
            self.land_from_hang(character);
            return;
        }

        let anchor = rope.anchor.location;
        if split(character.location() - anchor).is_none() {
            return;
        }

        if self.apply_climb(character, dt) {
            return;
        }
        if !self.config.ground_exit_before_ledge && self.grounded_while_hanging(character) {
            self.land_from_hang(character);
            return;
        }

        let location = character.location();
        let Some((rope_dir, _)) = split(location - anchor) else {
            return;
        };
        let length = self.current_length();
        let reeling_up = self.reeling_up(character);

        let input = self.swing_input.peek();
        let steer = character.forward() * input.y + character.right() * input.x;
        let tangential_steer = project_out(steer, rope_dir);

        let Some(movement) = character.movement_mut() else {
            return;
        };
        let gravity = Vec3::new(0.0, 0.0, movement.gravity_z() * movement.gravity_scale());
        let tangential_gravity = project_out(gravity, rope_dir);

        let mut velocity = movement.velocity()
            + (tangential_steer * self.config.swing_acceleration + tangential_gravity) * dt;
        velocity = project_out(velocity, rope_dir);

        let damping = if input.length_squared() <= KINDA_SMALL {
            self.config.swing_damping * self.config.idle_damping_multiplier
        } else {
            self.config.swing_damping
        };
        velocity *= (1.0 - damping * dt).clamp(0.0, 1.0);
        movement.set_velocity(velocity);

        let target = anchor + rope_dir * length;
        movement.safe_move(target - location);

        if !reeling_up && self.touching_standable_floor(movement) {
            self.land_from_hang(character);
            return;
        }

        self.swing_input.clear();
    }

    /// Leash update while holding the rope on foot.
    pub(super) fn tick_tether(&mut self, character: &mut dyn RopeCharacter, dt: f32) {
        if character.movement().is_none() {
            self.reset_for_missing("tether", "movement");
            return;
        }

        let floor = self.config.climb_floor();
        let max = self.config.max_length;
        let Some(rope) = self.state.rope_mut() else {
            return;
        };
        rope.length = rope.length.clamp(floor, max);
        let rope = *rope;

        let location = character.location();
        let Some((rope_dir, distance)) = split(location - rope.anchor.location) else {
            return;
        };

        if distance > rope.length {
            character.place(rope.anchor.location + rope_dir * rope.length, PlacementMode::Unchecked);
            if let Some(movement) = character.movement_mut() {
                let velocity = movement.velocity();
                let outward = velocity.dot(rope_dir).max(0.0);
                let damped = (velocity - rope_dir * outward)
                    * (1.0 - self.config.swing_damping * dt).clamp(0.0, 1.0);
                movement.set_velocity(damped);
            }
        }

        let effective = distance.min(rope.length);
        let taut = effective >= rope.length - self.config.tether_taut_tolerance;
        let airborne = character
            .movement()
            .is_some_and(|movement| !movement.is_moving_on_ground());
        if taut && airborne {
            debug!(length = rope.length, "tether went taut in the air");
            self.enter_hanging(character);
        }
    }

    /// Whether the movement simulation has put a hanging character on a
    /// standable floor.
    fn grounded_while_hanging(&self, character: &dyn RopeCharacter) -> bool {
        if self.reeling_up(character) {
            return false;
        }
        let Some(movement) = character.movement() else {
            return false;
        };
        let Some(floor) = movement.floor() else {
            return false;
        };

        if movement.is_moving_on_ground() && floor.is_standable(self.config.standable_normal_z) {
            return true;
        }
        self.config.ground_exit_proximity > 0.0
            && floor.distance <= self.config.ground_exit_proximity
    }

    fn touching_standable_floor(&self, movement: &dyn MovementAdapter) -> bool {
        movement.floor().is_some_and(|floor| {
            floor.is_standable(self.config.standable_normal_z)
                && floor.distance <= self.config.ground_contact_tolerance
        })
    }

    /// Whether climbing up can still shorten the rope and lift the
    /// character toward an anchor above it.
    fn reeling_up(&self, character: &dyn RopeCharacter) -> bool {
        if self.climb_sign != ClimbSign::Up {
            return false;
        }
        let Some(rope) = self.state.rope() else {
            return false;
        };
        rope.length > self.length_floor() + KINDA_SMALL
            && rope.anchor.location.z > character.location().z + KINDA_SMALL
    }

    /// Ends a hang on the ground, keeping hold of the rope.
    fn land_from_hang(&mut self, character: &mut dyn RopeCharacter) {
        self.exit_hanging(character);
        if let Some(movement) = character.movement_mut() {
            movement.set_mode(MovementMode::Walking);
        }
        debug!("hang ended on the ground");
    }
}
