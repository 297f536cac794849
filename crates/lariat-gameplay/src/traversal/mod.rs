//! Rope traversal state machine.
//!
//! [`RopeTraversal`] owns the rope session for one character: aiming,
//! throwing, hanging and swinging, climbing, ledge assist and recall. The
//! host calls command operations between ticks and [`RopeTraversal::tick`]
//! once per simulation step. Exactly one state-specific update runs per
//! tick, selected by the current [`RopeState`].
//!
//! Commands never fail. A command that does not apply to the current state
//! is ignored, and a missing character or movement simulation resets the
//! rope to [`RopeState::Idle`].

mod aim;
mod climb;
mod recall;
mod swing;

use glam::Vec3;
use std::rc::Rc;
use tracing::{debug, trace, warn};

use crate::config::RopeConfig;
use crate::diagnostics::{DebugShape, DiagnosticsSink, RopeEvent};
use crate::geometry::GeometryQuery;
use crate::movement::{borrow_owner, OwnerHandle, RopeCharacter, SharedCharacter};
use crate::state::{Anchor, ClimbSign, Preview, RopePhase, RopeState, SwingInput};

/// Rope session for a single character.
pub struct RopeTraversal {
    /// Tuning parameters
    config: RopeConfig,
    /// Non-owning handle to the character
    owner: OwnerHandle,
    /// Collision world queried by aim and ledge probes
    world: Rc<dyn GeometryQuery>,
    /// Optional diagnostics output
    sink: Option<Rc<dyn DiagnosticsSink>>,
    /// Authoritative rope mode
    state: RopeState,
    /// Latest aim probe result
    preview: Preview,
    /// Aim was requested while a rope is already attached
    aim_while_attached: bool,
    /// Swing axis for the next hang tick
    swing_input: SwingInput,
    /// Active climb direction
    climb_sign: ClimbSign,
    /// Seconds simulated so far
    clock: f64,
    /// Clock time of the last successful ledge climb
    last_ledge_climb: Option<f64>,
}

impl std::fmt::Debug for RopeTraversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RopeTraversal")
            .field("owner", &self.owner)
            .field("state", &self.state)
            .field("preview", &self.preview)
            .field("climb_sign", &self.climb_sign)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl RopeTraversal {
    /// Creates a session with no owner.
    #[must_use]
    pub fn new(config: RopeConfig, world: Rc<dyn GeometryQuery>) -> Self {
        let mut config = config;
        config.validate();
        Self {
            config,
            owner: OwnerHandle::none(),
            world,
            sink: None,
            state: RopeState::Idle,
            preview: Preview::NONE,
            aim_while_attached: false,
            swing_input: SwingInput::default(),
            climb_sign: ClimbSign::None,
            clock: 0.0,
            last_ledge_climb: None,
        }
    }

    /// Points the session at its owning character.
    #[must_use]
    pub fn with_owner(mut self, owner: &SharedCharacter) -> Self {
        self.owner = OwnerHandle::new(owner);
        self
    }

    /// Injects a diagnostics sink.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Rc<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Replaces the owner handle. The current rope is cleared.
    pub fn set_owner(&mut self, owner: OwnerHandle) {
        self.clear_rope();
        self.owner = owner;
    }

    /// Replaces the tuning parameters, keeping the current rope within the new bounds.
    pub fn set_config(&mut self, mut config: RopeConfig) {
        config.validate();
        self.config = config;
        let floor = self.length_floor();
        let max = self.config.max_length;
        if let Some(rope) = self.state.rope_mut() {
            rope.length = rope.length.clamp(floor, max);
        }
    }

    // === Queries ===

    /// Tuning parameters.
    #[must_use]
    pub fn config(&self) -> &RopeConfig {
        &self.config
    }

    /// Authoritative rope state.
    #[must_use]
    pub fn state(&self) -> &RopeState {
        &self.state
    }

    /// Field-less rope phase.
    #[must_use]
    pub fn phase(&self) -> RopePhase {
        self.state.phase()
    }

    /// Whether the rope is fixed to the world.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.state.is_attached()
    }

    /// Whether the player is holding the rope.
    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.state.is_holding()
    }

    /// Whether the player is hanging from the rope.
    #[must_use]
    pub fn is_hanging(&self) -> bool {
        self.state.is_hanging()
    }

    /// Whether the rope is retracting.
    #[must_use]
    pub fn is_recalling(&self) -> bool {
        matches!(self.state, RopeState::Recalling { .. })
    }

    /// Whether the rope is travelling toward its target.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, RopeState::Airborne { .. })
    }

    /// Current simulated rope length. A cleared rope reports `max_length`.
    #[must_use]
    pub fn current_length(&self) -> f32 {
        self.state
            .rope()
            .map_or(self.config.max_length, |rope| rope.length)
    }

    /// Anchor point, or the rope end while in flight.
    #[must_use]
    pub fn anchor_location(&self) -> Option<Vec3> {
        self.state.anchor_location()
    }

    /// Anchor point and normal once attached.
    #[must_use]
    pub fn anchor(&self) -> Option<Anchor> {
        self.state.rope().map(|rope| rope.anchor)
    }

    /// Whether the aim probe currently has a target.
    #[must_use]
    pub fn has_valid_preview(&self) -> bool {
        self.preview.has_hit
    }

    /// Whether the aim target lies within rope reach.
    #[must_use]
    pub fn preview_within_range(&self) -> bool {
        self.preview.within_range
    }

    /// Last aim impact point.
    #[must_use]
    pub fn preview_location(&self) -> Vec3 {
        self.preview.point
    }

    /// Full aim probe result.
    #[must_use]
    pub fn preview(&self) -> &Preview {
        &self.preview
    }

    /// Whether aim was requested while a rope is attached.
    #[must_use]
    pub fn is_aiming_while_attached(&self) -> bool {
        self.aim_while_attached
    }

    /// Active climb direction.
    #[must_use]
    pub fn climb_sign(&self) -> ClimbSign {
        self.climb_sign
    }

    /// Normalized recall progress in `[0, 1]`.
    #[must_use]
    pub fn recall_progress(&self) -> f32 {
        if self.config.recall_hold_seconds <= 0.0 {
            return 1.0;
        }
        match self.state {
            RopeState::Recalling { elapsed, .. } => {
                (elapsed / self.config.recall_hold_seconds).clamp(0.0, 1.0)
            },
            _ => 0.0,
        }
    }

    /// Seconds simulated so far.
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Lower bound for the rope length in the current state.
    #[must_use]
    pub fn length_floor(&self) -> f32 {
        if self.state.is_holding() {
            self.config.climb_floor()
        } else {
            0.0
        }
    }

    // === Tick ===

    /// Advances the session by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.clock += f64::from(dt);

        match self.state {
            RopeState::Idle => {},
            RopeState::Attached { holding: false, .. } => {
                self.owner_alive("loose rope");
            },
            RopeState::Aiming => {
                self.with_live_owner("aim preview", |this, character| {
                    this.update_aim_preview(character);
                });
            },
            RopeState::Airborne { .. } => {
                self.with_live_owner("rope flight", |this, character| {
                    this.tick_flight(character, dt);
                });
            },
            RopeState::Recalling { .. } => {
                if self.owner_alive("recall") {
                    self.tick_recall(dt);
                }
            },
            RopeState::Hanging { .. } => {
                self.with_live_owner("hang", |this, character| {
                    this.tick_hanging(character, dt);
                });
            },
            RopeState::Attached { holding: true, .. } => {
                self.with_live_owner("tether", |this, character| {
                    this.tick_tether(character, dt);
                });
            },
        }
    }

    /// Clears the rope unconditionally, restoring movement settings if hanging.
    pub fn force_reset(&mut self) {
        if self.state.is_hanging() {
            if let Some(owner) = self.owner.upgrade() {
                if let Some(mut character) = borrow_owner(&owner) {
                    self.exit_hanging(&mut *character);
                }
            }
        }
        if self.state != RopeState::Idle {
            self.emit(RopeEvent::Reset);
        }
        self.clear_rope();
    }

    // === Internals shared by the submodules ===

    /// Runs `f` with the owner borrowed, or resets the rope when it is gone.
    fn with_live_owner<R>(
        &mut self,
        operation: &'static str,
        f: impl FnOnce(&mut Self, &mut dyn RopeCharacter) -> R,
    ) -> Option<R> {
        let Some(owner) = self.owner.upgrade() else {
            self.reset_for_missing(operation, "owner");
            return None;
        };
        let Some(mut character) = borrow_owner(&owner) else {
            self.reset_for_missing(operation, "owner borrow");
            return None;
        };
        Some(f(self, &mut *character))
    }

    /// Checks that the owner can still be borrowed, resetting the rope if not.
    fn owner_alive(&mut self, operation: &'static str) -> bool {
        self.with_live_owner(operation, |_, _| ()).is_some()
    }

    fn reset_for_missing(&mut self, operation: &'static str, collaborator: &'static str) {
        if self.state != RopeState::Idle {
            warn!("{operation}: {collaborator} unavailable, resetting rope");
            self.emit(RopeEvent::Reset);
        }
        self.clear_rope();
    }

    fn set_state(&mut self, next: RopeState) {
        let from = self.state.phase();
        let to = next.phase();
        self.state = next;
        if from != to {
            debug!(%from, %to, "rope phase changed");
            self.emit(RopeEvent::PhaseChanged { from, to });
        }
    }

    fn reject(&self, command: &'static str) {
        trace!(phase = %self.state.phase(), "{command} ignored");
    }

    fn emit(&self, event: RopeEvent) {
        if let Some(sink) = &self.sink {
            sink.record(event);
        }
    }

    fn draw(&self, shape: DebugShape) {
        if self.config.debug_draw {
            self.emit(RopeEvent::Debug(shape));
        }
    }

    /// Resets every runtime field to the idle session.
    fn clear_rope(&mut self) {
        self.set_state(RopeState::Idle);
        self.aim_while_attached = false;
        self.preview = Preview::NONE;
        self.swing_input.clear();
        self.climb_sign = ClimbSign::None;
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::diagnostics::RopeEventBus;
    use crate::geometry::StaticScene;
    use crate::kinematic::KinematicCharacter;
    use crate::movement::MovementAdapter;
    use std::cell::RefCell;

    #[test]
    fn test_new_session_is_idle() {
        let rig = Rig::new(open_air(), Vec3::ZERO);
        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        assert!(!rig.rope.is_attached());
        assert_eq!(rig.rope.current_length(), 1200.0);
        assert_eq!(rig.rope.recall_progress(), 0.0);
        assert!(rig.rope.anchor_location().is_none());
    }

    #[test]
    fn test_dead_owner_resets_on_tick() {
        let world: Rc<dyn GeometryQuery> = Rc::new(StaticScene::new());
        let character: SharedCharacter = Rc::new(RefCell::new(KinematicCharacter::new(Vec3::ZERO)));
        let bus = Rc::new(RopeEventBus::new(16));
        let mut rope = RopeTraversal::new(RopeConfig::default(), world)
            .with_owner(&character)
            .with_diagnostics(bus.clone());

        rope.start_aim();
        assert_eq!(rope.phase(), RopePhase::Aiming);

        drop(character);
        rope.tick(1.0 / 60.0);

        assert_eq!(rope.phase(), RopePhase::Idle);
        let events = bus.drain();
        assert!(events.contains(&RopeEvent::Reset));
    }

    #[test]
    fn test_loose_rope_resets_when_owner_dies() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.attach(Vec3::new(0.0, 0.0, 500.0), Vec3::NEG_Z, 500.0, false);
        let bus = rig.record_events();

        rig.lose_owner();
        rig.rope.tick(1.0 / 60.0);

        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        assert_eq!(rig.rope.current_length(), 1200.0);
        assert!(bus.drain().contains(&RopeEvent::Reset));
    }

    #[test]
    fn test_recall_resets_when_owner_dies() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.attach(Vec3::new(0.0, 0.0, 1000.0), Vec3::NEG_Z, 1000.0, false);
        rig.rope.begin_recall();
        let bus = rig.record_events();

        rig.lose_owner();
        rig.rope.tick(1.0 / 60.0);

        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        let events = bus.drain();
        assert!(events.contains(&RopeEvent::Reset));
        assert!(!events.contains(&RopeEvent::Recalled));
    }

    #[test]
    fn test_force_reset_restores_gravity_and_clears() {
        let mut rig = Rig::new(open_air(), Vec3::new(0.0, 0.0, 200.0));
        rig.character.borrow_mut().set_gravity_scale(0.5);
        rig.attach(Vec3::new(0.0, 0.0, 500.0), Vec3::NEG_Z, 300.0, true);
        rig.rope.with_live_owner("test", |this, character| this.enter_hanging(character));
        assert!(rig.rope.is_hanging());

        rig.character.borrow_mut().set_gravity_scale(3.0);
        rig.rope.force_reset();

        assert_eq!(rig.rope.phase(), RopePhase::Idle);
        assert_eq!(rig.character.borrow().gravity_scale(), 0.5);
        assert_eq!(rig.rope.current_length(), 1200.0);
        assert!(!rig.rope.has_valid_preview());
    }

    #[test]
    fn test_set_config_reclamps_length() {
        let mut rig = Rig::new(open_air(), Vec3::ZERO);
        rig.attach(Vec3::new(0.0, 0.0, 900.0), Vec3::NEG_Z, 900.0, false);

        let mut config = RopeConfig::default();
        config.max_length = 600.0;
        rig.rope.set_config(config);

        assert_eq!(rig.rope.current_length(), 600.0);
    }

    #[test]
    fn test_phase_events_are_emitted_once_per_change() {
        let world: Rc<dyn GeometryQuery> = Rc::new(StaticScene::new());
        let character: SharedCharacter = Rc::new(RefCell::new(KinematicCharacter::new(Vec3::ZERO)));
        let bus = Rc::new(RopeEventBus::new(16));
        let mut rope = RopeTraversal::new(RopeConfig::default(), world)
            .with_owner(&character)
            .with_diagnostics(bus.clone());

        rope.start_aim();
        rope.start_aim();
        rope.stop_aim();

        assert_eq!(
            bus.drain(),
            vec![
                RopeEvent::PhaseChanged {
                    from: RopePhase::Idle,
                    to: RopePhase::Aiming
                },
                RopeEvent::PhaseChanged {
                    from: RopePhase::Aiming,
                    to: RopePhase::Idle
                },
            ]
        );
    }
}
