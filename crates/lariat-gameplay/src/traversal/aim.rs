//! Aiming, throwing and rope flight.

use glam::Vec3;
use std::f32::consts::PI;
use tracing::{debug, info};

use super::RopeTraversal;
use crate::diagnostics::RopeEvent;
use crate::math::{KINDA_SMALL, UP};
use crate::movement::RopeCharacter;
use crate::state::{Anchor, Flight, Preview, Rope, RopeState};

impl RopeTraversal {
    /// Enters aim mode. While attached, the preview is seeded from the
    /// existing anchor instead of probing the world.
    pub fn start_aim(&mut self) {
        if !self.owner_alive("start_aim") {
            return;
        }
        if let Some(anchor) = self.anchor() {
            self.aim_while_attached = true;
            self.preview = Preview {
                has_hit: true,
                within_range: false,
                point: anchor.location,
                normal: anchor.normal,
            };
            return;
        }

        match self.state {
            RopeState::Idle => {
                self.preview = Preview::NONE;
                self.aim_while_attached = false;
                self.set_state(RopeState::Aiming);
            },
            RopeState::Aiming => {},
            _ => self.reject("start_aim"),
        }
    }

    /// Leaves aim mode. The last preview stays readable.
    pub fn stop_aim(&mut self) {
        self.aim_while_attached = false;
        if self.state == RopeState::Aiming {
            self.set_state(RopeState::Idle);
        }
    }

    /// Throws the rope at the current preview target.
    ///
    /// Does nothing while a rope is attached or already in flight, and
    /// without a preview hit.
    pub fn throw_rope(&mut self) {
        if self.state.is_attached() || self.is_in_flight() {
            self.reject("throw_rope");
            return;
        }
        self.with_live_owner("throw_rope", |this, character| this.throw_from(character));
    }

    fn throw_from(&mut self, character: &mut dyn RopeCharacter) {
        if !self.preview.has_hit {
            self.reject("throw_rope without target");
            return;
        }

        let start = character.location();
        let target = self.preview.point;
        let distance = start.distance(target);
        let duration = if distance > KINDA_SMALL {
            distance / self.config.throw_speed
        } else {
            0.0
        };

        let flight = Flight {
            start,
            target,
            normal: self.preview.normal,
            distance,
            elapsed: 0.0,
            duration,
        };
        self.aim_while_attached = false;

        if duration <= KINDA_SMALL {
            debug!("rope target reached instantly");
            self.complete_flight(character, flight);
            return;
        }

        debug!(distance, duration, "rope thrown");
        self.set_state(RopeState::Airborne {
            flight,
            marker: start,
        });
    }

    /// Re-probes the aim target from the character's view point.
    pub(super) fn update_aim_preview(&mut self, character: &mut dyn RopeCharacter) {
        let view = character.view_point();
        let reach = self.config.max_length;
        let end = view.origin + view.direction * reach;

        match self.world.line_trace(view.origin, end) {
            Some(hit) => {
                self.preview = Preview {
                    has_hit: true,
                    within_range: character.location().distance(hit.point) <= reach,
                    point: hit.point,
                    normal: hit.normal,
                };
            },
            None => {
                self.preview.has_hit = false;
                self.preview.within_range = false;
            },
        }
    }

    pub(super) fn tick_flight(&mut self, character: &mut dyn RopeCharacter, dt: f32) {
        let RopeState::Airborne { mut flight, .. } = self.state else {
            return;
        };

        flight.elapsed += dt;
        let alpha = flight.alpha();
        if alpha >= 1.0 - KINDA_SMALL {
            self.complete_flight(character, flight);
            return;
        }

        let arc = self.config.arc_height(flight.distance);
        let marker = flight.start.lerp(flight.target, alpha) + UP * ((alpha * PI).sin() * arc);
        self.state = RopeState::Airborne { flight, marker };
    }

    fn complete_flight(&mut self, character: &mut dyn RopeCharacter, flight: Flight) {
        let anchor = Anchor {
            location: flight.target,
            normal: flight.normal,
        };
        let distance = character.location().distance(anchor.location);
        let length = distance.clamp(self.config.climb_floor(), self.config.max_length);

        self.set_state(RopeState::Attached {
            rope: Rope { anchor, length },
            holding: false,
        });
        info!(anchor = ?anchor.location, length, "rope attached");
        self.emit(RopeEvent::Attached {
            anchor: anchor.location,
            length,
        });

        if distance <= self.config.max_length {
            self.engage_hold(character);
        }
    }

    /// Rope end position while in flight.
    #[must_use]
    pub fn flight_marker(&self) -> Option<Vec3> {
        match self.state {
            RopeState::Airborne { marker, .. } => Some(marker),
            _ => None,
        }
    }
}
