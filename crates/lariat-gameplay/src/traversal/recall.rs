//! Grabbing, letting go and recall.

use tracing::{debug, info};

use super::RopeTraversal;
use crate::diagnostics::RopeEvent;
use crate::math::KINDA_SMALL;
use crate::movement::RopeCharacter;
use crate::state::{ClimbSign, RopeState};

impl RopeTraversal {
    /// Toggles hold: a held rope is released and recalled, a loose rope is
    /// grabbed if the character is close enough to the anchor.
    pub fn toggle_hold(&mut self) {
        if !self.state.is_attached() {
            self.reject("toggle_hold");
            return;
        }
        if self.state.is_holding() {
            self.release_rope(false);
            self.begin_recall();
            return;
        }
        self.with_live_owner("toggle_hold", |this, character| this.grab(character));
    }

    fn grab(&mut self, character: &mut dyn RopeCharacter) {
        let Some(anchor) = self.anchor() else {
            return;
        };
        let distance = character.location().distance(anchor.location);
        if distance > self.config.grab_distance {
            debug!(distance, "rope out of reach");
            return;
        }
        if let RopeState::Recalling { rope, .. } = self.state {
            self.set_state(RopeState::Attached {
                rope,
                holding: false,
            });
        }
        self.engage_hold(character);
    }

    /// Starts retracting the attached rope.
    pub fn begin_recall(&mut self) {
        let Some(rope) = self.state.rope().copied() else {
            self.reject("begin_recall");
            return;
        };
        if self.is_recalling() {
            return;
        }
        if !self.owner_alive("begin_recall") {
            return;
        }

        if self.state.is_hanging() {
            let exited = self.with_live_owner("begin_recall", |this, character| {
                this.exit_hanging(character);
            });
            if exited.is_none() {
                return;
            }
        }

        self.climb_sign = ClimbSign::None;
        debug!(length = rope.length, "recall started");
        self.set_state(RopeState::Recalling { rope, elapsed: 0.0 });
    }

    /// Stops an in-progress recall, leaving a loose attached rope.
    pub fn cancel_recall(&mut self) {
        let RopeState::Recalling { mut rope, .. } = self.state else {
            self.reject("cancel_recall");
            return;
        };
        if !self.owner_alive("cancel_recall") {
            return;
        }
        rope.length = rope.length.max(self.config.climb_floor());
        self.set_state(RopeState::Attached {
            rope,
            holding: false,
        });
    }

    pub(super) fn tick_recall(&mut self, dt: f32) {
        let RopeState::Recalling { mut rope, elapsed } = self.state else {
            return;
        };

        let elapsed = elapsed + dt;
        rope.length = (rope.length - self.config.recall_retract_speed * dt).max(0.0);

        if elapsed >= self.config.recall_hold_seconds || rope.length <= KINDA_SMALL {
            info!(elapsed, "rope recalled");
            self.emit(RopeEvent::Recalled);
            self.clear_rope();
            return;
        }
        self.state = RopeState::Recalling { rope, elapsed };
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::diagnostics::RopeEvent;
    use crate::movement::MovementAdapter;
    use crate::state::{RopePhase, RopeState};
    use glam::Vec3;

    #[test]
    fn test_recall_retracts_then_clears() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.attach(Vec3::new(0.0, 0.0, 1000.0), Vec3::NEG_Z, 1000.0, false);

        rig.rope.begin_recall();
        assert!(rig.rope.is_recalling());

        rig.rope.tick(0.1);
        assert!((rig.rope.current_length() - 740.0).abs() < 1e-2);
        assert!((rig.rope.recall_progress() - 0.1).abs() < 1e-5);

        rig.rope.tick(0.3);
        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        assert_eq!(rig.rope.current_length(), 1200.0);
        assert_eq!(rig.rope.recall_progress(), 0.0);
    }

    #[test]
    fn test_recall_from_hang_restores_movement() {
        let mut rig = Rig::new(open_air(), Vec3::new(0.0, 0.0, 200.0));
        rig.attach(Vec3::new(0.0, 0.0, 500.0), Vec3::NEG_Z, 300.0, true);
        rig.rope
            .with_live_owner("test", |this, character| this.enter_hanging(character));
        rig.character.borrow_mut().set_gravity_scale(0.2);

        rig.rope.begin_recall();

        assert!(rig.rope.is_recalling());
        assert!(!rig.rope.is_hanging());
        assert!(!rig.rope.is_holding());
        assert_eq!(rig.character.borrow().gravity_scale(), 1.0);
    }

    #[test]
    fn test_cancel_recall_keeps_length() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.attach(Vec3::new(0.0, 0.0, 1000.0), Vec3::NEG_Z, 1000.0, false);
        rig.rope.begin_recall();
        rig.rope.tick(0.1);
        rig.rope.cancel_recall();

        assert_eq!(rig.rope.phase(), RopePhase::Attached);
        assert!((rig.rope.current_length() - 740.0).abs() < 1e-2);
        assert_eq!(rig.rope.recall_progress(), 0.0);
    }

    #[test]
    fn test_cancel_recall_when_idle_is_noop() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.rope.cancel_recall();
        rig.rope.force_reset();
        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        assert_eq!(rig.rope.current_length(), 1200.0);
    }

    #[test]
    fn test_recall_progress_with_zero_hold() {
        let mut config = crate::config::RopeConfig::default();
        config.recall_hold_seconds = 0.0;
        let rig = Rig::with_config(open_air(), Vec3::ZERO, config);
        assert_eq!(rig.rope.recall_progress(), 1.0);
    }

    #[test]
    fn test_toggle_hold_grabs_within_reach() {
        let mut rig = Rig::new(open_air(), Vec3::new(100.0, 0.0, 0.0));
        rig.character.borrow_mut().set_mode(crate::movement::MovementMode::Walking);
        rig.attach(Vec3::ZERO, Vec3::NEG_X, 400.0, false);

        rig.rope.toggle_hold();

        assert!(rig.rope.is_holding());
        assert_eq!(rig.rope.current_length(), 100.0);
    }

    #[test]
    fn test_toggle_hold_out_of_reach() {
        let mut rig = Rig::new(open_air(), Vec3::new(300.0, 0.0, 0.0));
        rig.attach(Vec3::ZERO, Vec3::NEG_X, 400.0, false);

        rig.rope.toggle_hold();

        assert!(!rig.rope.is_holding());
        assert_eq!(rig.rope.current_length(), 400.0);
    }

    #[test]
    fn test_toggle_hold_releases_and_recalls() {
        let mut rig = Rig::new(open_air(), Vec3::new(100.0, 0.0, 0.0));
        rig.attach(Vec3::ZERO, Vec3::NEG_X, 100.0, true);

        rig.rope.toggle_hold();

        assert!(matches!(rig.rope.state(), RopeState::Recalling { .. }));
        assert!(!rig.rope.is_holding());
    }

    #[test]
    fn test_begin_recall_without_rope_is_ignored() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.rope.begin_recall();
        assert_eq!(rig.rope.phase(), RopePhase::Idle);
    }

    #[test]
    fn test_begin_recall_without_owner_resets() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.attach(Vec3::new(0.0, 0.0, 1000.0), Vec3::NEG_Z, 1000.0, false);
        rig.lose_owner();

        rig.rope.begin_recall();

        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        assert_eq!(rig.rope.current_length(), 1200.0);
    }

    #[test]
    fn test_cancel_recall_without_owner_resets() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.attach(Vec3::new(0.0, 0.0, 1000.0), Vec3::NEG_Z, 1000.0, false);
        rig.rope.begin_recall();
        let bus = rig.record_events();
        rig.lose_owner();

        rig.rope.cancel_recall();

        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        assert!(bus.drain().contains(&RopeEvent::Reset));
    }

    #[test]
    fn test_grab_during_recall_reports_attach() {
        let mut rig = Rig::new(open_air(), Vec3::new(100.0, 0.0, 0.0));
        rig.character.borrow_mut().set_mode(crate::movement::MovementMode::Walking);
        rig.attach(Vec3::ZERO, Vec3::NEG_X, 400.0, false);
        rig.rope.begin_recall();
        let bus = rig.record_events();

        rig.rope.toggle_hold();

        assert!(rig.rope.is_holding());
        assert_eq!(
            bus.drain(),
            vec![RopeEvent::PhaseChanged {
                from: RopePhase::Recalling,
                to: RopePhase::Attached
            }]
        );
    }
}
