//! Climbing along the rope and ledge assist.

use glam::Vec3;
use tracing::{debug, info, trace};

use super::RopeTraversal;
use crate::diagnostics::{DebugColor, DebugShape, RopeEvent};
use crate::math::{planar, KINDA_SMALL, UP};
use crate::movement::{MovementMode, PlacementMode, RopeCharacter};
use crate::state::{ClimbSign, RopeState};

impl RopeTraversal {
    /// Starts reeling in toward the anchor. A held rope on foot is first
    /// turned into a hang, hopping off the ground if needed.
    pub fn begin_climb_up(&mut self) {
        self.with_live_owner("begin_climb_up", |this, character| {
            this.begin_climb(character, ClimbSign::Up);
        });
    }

    /// Starts paying out rope.
    pub fn begin_climb_down(&mut self) {
        self.with_live_owner("begin_climb_down", |this, character| {
            this.begin_climb(character, ClimbSign::Down);
        });
    }

    /// Stops climbing.
    pub fn stop_climb(&mut self) {
        self.climb_sign = ClimbSign::None;
    }

    /// Routes an analog climb axis to the climb commands.
    pub fn apply_climb_axis(&mut self, value: f32) {
        if value > KINDA_SMALL {
            self.begin_climb_up();
        } else if value < -KINDA_SMALL {
            self.begin_climb_down();
        } else {
            self.stop_climb();
        }
    }

    /// Attempts a ledge climb in response to a jump press. Returns whether
    /// the character was placed, so the caller can swallow the jump.
    pub fn request_ledge_climb_from_jump(&mut self) -> bool {
        self.with_live_owner("request_ledge_climb_from_jump", |this, character| {
            this.ledge_from_jump(character)
        })
        .unwrap_or(false)
    }

    fn begin_climb(&mut self, character: &mut dyn RopeCharacter, sign: ClimbSign) {
        match self.state {
            RopeState::Attached { holding: true, .. } => {
                if sign == ClimbSign::Up {
                    let grounded = character
                        .movement()
                        .is_some_and(|movement| movement.is_moving_on_ground());
                    if grounded {
                        character.jump();
                        if let Some(movement) = character.movement_mut() {
                            movement.set_mode(MovementMode::Falling);
                        }
                    }
                }
                self.enter_hanging(character);
            },
            RopeState::Hanging { .. } => {},
            _ => {
                self.reject("begin_climb");
                return;
            },
        }

        if self.state.is_hanging() {
            self.climb_sign = sign;
        }
    }

    fn ledge_from_jump(&mut self, character: &mut dyn RopeCharacter) -> bool {
        if !matches!(
            self.state,
            RopeState::Attached { .. } | RopeState::Hanging { .. }
        ) {
            return false;
        }
        if !self.ledge_cooldown_ready() {
            trace!("ledge climb from jump still cooling down");
            return false;
        }
        if !self.near_anchor(character) {
            return false;
        }
        if !self.enter_hanging(character) {
            return false;
        }
        self.try_climb_to_ledge(character)
    }

    /// Applies climb input for one hang tick. Returns true when a ledge
    /// climb ended the hang.
    pub(super) fn apply_climb(&mut self, character: &mut dyn RopeCharacter, dt: f32) -> bool {
        if !self.state.is_holding() || self.climb_sign == ClimbSign::None {
            return false;
        }

        self.apply_climb_length_change(dt);

        self.climb_sign == ClimbSign::Up
            && self.ledge_cooldown_ready()
            && self.near_anchor(character)
            && self.try_climb_to_ledge(character)
    }

    fn apply_climb_length_change(&mut self, dt: f32) {
        let sign = self.climb_sign;
        if sign == ClimbSign::None {
            return;
        }

        let floor = self.length_floor();
        let max = self.config.max_length;
        let stop_at = max - self.config.climb_max_snap;
        let speed = self.config.climb_speed;
        let Some(rope) = self.state.rope_mut() else {
            return;
        };

        let climbing_down = sign == ClimbSign::Down;
        if climbing_down && rope.length >= stop_at {
            rope.length = max;
            self.climb_sign = ClimbSign::None;
            return;
        }

        rope.length = (rope.length - sign.value() * speed * dt).clamp(floor, max);
        if climbing_down && rope.length >= stop_at {
            rope.length = max;
            self.climb_sign = ClimbSign::None;
        }
    }

    fn ledge_cooldown_ready(&self) -> bool {
        let cooldown = f64::from(self.config.ledge_climb_cooldown_seconds);
        self.last_ledge_climb
            .map_or(true, |last| self.clock - last >= cooldown)
    }

    /// Whether the character is inside the anchor-assist band.
    fn near_anchor(&self, character: &dyn RopeCharacter) -> bool {
        let Some(rope) = self.state.rope() else {
            return false;
        };
        let anchor = rope.anchor.location;
        let effective = rope.length.min(character.location().distance(anchor));
        let band = self.config.assist_band();

        self.draw(DebugShape::Sphere {
            center: anchor,
            radius: band,
            color: DebugColor::Cyan,
        });
        self.draw(DebugShape::Sphere {
            center: anchor,
            radius: effective,
            color: DebugColor::Yellow,
        });

        effective <= band
    }

    fn is_ledge_surface(&self, hit_normal: Vec3, anchor_normal: Vec3) -> bool {
        hit_normal.dot(anchor_normal) >= self.config.ledge_normal_dot_threshold
            || hit_normal.z >= self.config.ledge_upward_normal_z
    }

    /// Pushes a ledge target onto the ledge. Uses the anchor normal when it
    /// has a horizontal part, otherwise the character's facing.
    fn ledge_outward(anchor_normal: Vec3, forward: Vec3) -> Vec3 {
        let flat = planar(anchor_normal);
        if flat.length_squared() > KINDA_SMALL {
            flat.normalize()
        } else {
            -planar(forward).normalize_or_zero()
        }
    }

    /// Mounts the surface at the anchor. Returns whether the character was placed.
    pub(super) fn try_climb_to_ledge(&mut self, character: &mut dyn RopeCharacter) -> bool {
        let Some(rope) = self.state.rope().copied() else {
            return false;
        };
        if !self.state.is_holding() || !self.ledge_cooldown_ready() || !self.near_anchor(character)
        {
            return false;
        }
        if !self.enter_hanging(character) {
            return false;
        }

        let anchor = rope.anchor;
        let radius = self.config.ledge_probe_radius;
        let probe_start = anchor.location + anchor.normal * radius + UP * self.config.ledge_probe_lift;
        let probe_end = probe_start - UP * self.config.ledge_probe_depth;
        self.draw(DebugShape::Line {
            start: probe_start,
            end: probe_end,
            color: DebugColor::Orange,
        });

        let half_height = character.half_height();
        let mut target = anchor.location + UP * half_height;
        if let Some(hit) = self.world.sweep_sphere(probe_start, probe_end, radius) {
            self.draw(DebugShape::Arrow {
                start: hit.point,
                end: hit.point + hit.normal * 50.0,
                color: DebugColor::Blue,
            });
            if self.is_ledge_surface(hit.normal, anchor.normal) {
                let outward = Self::ledge_outward(anchor.normal, character.forward());
                target = hit.point + UP * (half_height + self.config.ledge_vertical_offset)
                    - outward * self.config.ledge_stand_off_distance;
            } else {
                self.draw(DebugShape::Sphere {
                    center: hit.point,
                    radius: 10.0,
                    color: DebugColor::Red,
                });
            }
        }

        let location = character.location();
        let target = location.lerp(target, self.config.ledge_assist_strength);
        self.draw(DebugShape::Sphere {
            center: target,
            radius: 12.0,
            color: DebugColor::Green,
        });

        let Some(movement) = character.movement_mut() else {
            return false;
        };
        let outcome = movement.safe_move(target - location);
        let method = if !outcome.blocked {
            "swept"
        } else if character.place(target, PlacementMode::Checked) {
            "teleported"
        } else {
            character.place(target, PlacementMode::Unchecked);
            "placed"
        };
        debug!(method, ?target, "ledge assist moved character");

        self.exit_hanging(character);
        if let Some(movement) = character.movement_mut() {
            movement.set_mode(MovementMode::Walking);
        }

        let landed = character.location();
        let floor = self.config.climb_floor();
        let max = self.config.max_length;
        if let Some(rope) = self.state.rope_mut() {
            rope.length = landed.distance(anchor.location).clamp(floor, max);
        }
        self.last_ledge_climb = Some(self.clock);

        info!(target = ?landed, "ledge climbed");
        self.emit(RopeEvent::LedgeClimbed { target: landed });
        true
    }
}
