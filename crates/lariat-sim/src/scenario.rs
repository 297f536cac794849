//! Scripted rope scenarios.
//!
//! A scenario is a JSON timeline of actions, each due at a time in seconds.
//! The [`ScenarioRunner`] owns a kinematic character, a rope and an event
//! queue, feeds due actions between ticks and steps the world at a fixed
//! rate:
//! - rope commands go straight to the rope
//! - aim, walk and teleport steer the character
//! - held swing input is re-sent every tick until it expires

use glam::{Vec2, Vec3};
use lariat_common::{EntityId, LariatError, LariatResult};
use lariat_gameplay::command::{CommandOutcome, RopeCommand};
use lariat_gameplay::diagnostics::{RopeEvent, RopeEventBus};
use lariat_gameplay::geometry::GeometryQuery;
use lariat_gameplay::kinematic::KinematicCharacter;
use lariat_gameplay::movement::{MovementAdapter, RopeCharacter, SharedCharacter};
use lariat_gameplay::state::RopePhase;
use lariat_gameplay::traversal::RopeTraversal;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;
use tracing::{debug, info, trace, warn};

use crate::config::SimConfig;

/// Slack when deciding whether a step is due on the current tick.
const DUE_EPSILON: f32 = 1e-4;

/// A single scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAction {
    /// Send a command to the rope
    Rope {
        /// The command
        command: RopeCommand,
    },
    /// Aim from the character's current location
    Aim {
        /// World-space aim direction
        direction: Vec3,
    },
    /// Aim along the character's facing again
    ClearAim,
    /// Set the facing direction
    Face {
        /// World-space facing, flattened onto the ground plane
        forward: Vec3,
    },
    /// Set walk input until changed
    Walk {
        /// X axis (-1 to 1)
        x: f32,
        /// Y axis (-1 to 1)
        y: f32,
    },
    /// Hold swing input for a while
    Swing {
        /// Right axis
        right: f32,
        /// Forward axis
        forward: f32,
        /// Seconds to hold the input
        duration: f32,
    },
    /// Move the character and stop it
    Teleport {
        /// New position
        position: Vec3,
    },
    /// Log a message
    Log {
        /// Message to log
        message: String,
    },
}

/// An action and the time it is due.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    /// Seconds from the start of the run
    pub at: f32,
    /// What to do
    pub action: ScenarioAction,
}

impl ScenarioStep {
    /// A rope command due at `at`.
    #[must_use]
    pub fn rope(at: f32, command: RopeCommand) -> Self {
        Self {
            at,
            action: ScenarioAction::Rope { command },
        }
    }

    /// Any action due at `at`.
    #[must_use]
    pub fn action(at: f32, action: ScenarioAction) -> Self {
        Self { at, action }
    }
}

/// A named timeline of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// What the scenario exercises
    #[serde(default)]
    pub description: Option<String>,
    /// Steps, in any order
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    /// Parses a scenario from JSON text.
    pub fn from_json_str(text: &str) -> LariatResult<Self> {
        let mut scenario: Self = serde_json::from_str(text)
            .map_err(|e| LariatError::Scenario(format!("Failed to parse scenario JSON: {e}")))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Loads a scenario from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> LariatResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let scenario = Self::from_json_str(&text)?;
        info!(
            "Loaded scenario '{}' with {} steps from {}",
            scenario.name,
            scenario.steps.len(),
            path.display()
        );
        Ok(scenario)
    }

    /// Rejects steps with unusable times and sorts the timeline.
    pub fn validate(&mut self) -> LariatResult<()> {
        if let Some(step) = self
            .steps
            .iter()
            .find(|step| !step.at.is_finite() || step.at < 0.0)
        {
            return Err(LariatError::Scenario(format!(
                "step time {} in '{}' must be finite and non-negative",
                step.at, self.name
            )));
        }
        if let Some(step) = self.steps.iter().find(|step| match &step.action {
            ScenarioAction::Swing { duration, .. } => !duration.is_finite() || *duration < 0.0,
            _ => false,
        }) {
            return Err(LariatError::Scenario(format!(
                "swing at {} in '{}' has an invalid duration",
                step.at, self.name
            )));
        }
        self.steps.sort_by(|a, b| a.at.total_cmp(&b.at));
        Ok(())
    }

    /// Built-in courtyard run: throw at the overhang, climb, swing,
    /// jump off and recall.
    #[must_use]
    pub fn demo() -> Self {
        use ScenarioAction as A;

        Self {
            name: "courtyard".to_string(),
            description: Some("Throw, climb, swing, jump release and recall".to_string()),
            steps: vec![
                ScenarioStep::action(0.0, A::Aim { direction: Vec3::Z }),
                ScenarioStep::rope(0.0, RopeCommand::StartAim),
                ScenarioStep::rope(0.1, RopeCommand::Throw),
                ScenarioStep::rope(0.1, RopeCommand::StopAim),
                ScenarioStep::action(0.1, A::ClearAim),
                ScenarioStep::rope(0.6, RopeCommand::ClimbUp),
                ScenarioStep::rope(0.9, RopeCommand::StopClimb),
                ScenarioStep::action(
                    1.0,
                    A::Swing {
                        right: 0.0,
                        forward: 1.0,
                        duration: 1.0,
                    },
                ),
                ScenarioStep::rope(2.2, RopeCommand::Release { jump: true }),
                ScenarioStep::rope(2.6, RopeCommand::BeginRecall),
                ScenarioStep::action(
                    3.5,
                    A::Log {
                        message: "demo complete".to_string(),
                    },
                ),
            ],
        }
    }
}

/// A phase change observed during a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseTransition {
    /// Sim time of the change
    pub time: f32,
    /// Previous phase
    pub from: RopePhase,
    /// New phase
    pub to: RopePhase,
}

/// Summary of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimReport {
    /// Scenario that produced the report
    pub scenario: String,
    /// Character that ran the scenario
    pub character: EntityId,
    /// Ticks simulated
    pub ticks: u64,
    /// Sim seconds elapsed
    pub elapsed: f32,
    /// Steps applied
    pub steps_applied: usize,
    /// Jumps the rope passed back to the character
    pub jumps_passed: usize,
    /// Every rope phase change in order
    pub transitions: Vec<PhaseTransition>,
    /// Completed throws
    pub attaches: usize,
    /// Successful ledge climbs
    pub ledge_climbs: usize,
    /// Completed recalls
    pub recalls: usize,
    /// Forced or fault resets
    pub resets: usize,
    /// Rope phase at the end of the run
    pub final_phase: RopePhase,
    /// Character position at the end of the run
    pub final_position: Vec3,
    /// Rope length at the end of the run
    pub final_length: f32,
}

#[derive(Debug, Clone, Copy)]
struct HeldSwing {
    input: Vec2,
    until: f32,
}

/// Runs a [`Scenario`] against a headless rope session.
pub struct ScenarioRunner {
    pending: VecDeque<ScenarioStep>,
    character: Rc<RefCell<KinematicCharacter>>,
    rope: RopeTraversal,
    events: Rc<RopeEventBus>,
    dt: f32,
    ticks: u64,
    held_swing: Option<HeldSwing>,
    report: SimReport,
}

impl std::fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("scenario", &self.report.scenario)
            .field("ticks", &self.ticks)
            .field("pending", &self.pending.len())
            .field("rope", &self.rope)
            .finish_non_exhaustive()
    }
}

impl ScenarioRunner {
    /// Builds the scene, character and rope described by `config`.
    #[must_use]
    pub fn new(config: &SimConfig, scenario: Scenario) -> Self {
        let world: Rc<dyn GeometryQuery> = Rc::new(config.scene.build());
        let character = Rc::new(RefCell::new(
            KinematicCharacter::with_config(config.spawn, config.character.clone())
                .in_scene(Rc::clone(&world)),
        ));
        let entity = character.borrow().entity_id();
        let shared: SharedCharacter = character.clone();
        let events = Rc::new(RopeEventBus::new(config.event_capacity));
        let rope = RopeTraversal::new(config.rope.clone(), world)
            .with_owner(&shared)
            .with_diagnostics(events.clone());

        info!(
            scenario = %scenario.name,
            character = %entity,
            scene = config.scene.name(),
            steps = scenario.steps.len(),
            "scenario ready"
        );

        let mut steps = scenario.steps;
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));

        Self {
            pending: steps.into(),
            character,
            rope,
            events,
            dt: config.fixed_dt(),
            ticks: 0,
            held_swing: None,
            report: SimReport {
                scenario: scenario.name,
                character: entity,
                ..SimReport::default()
            },
        }
    }

    /// The rope under test.
    #[must_use]
    pub fn rope(&self) -> &RopeTraversal {
        &self.rope
    }

    /// The simulated character.
    #[must_use]
    pub fn character(&self) -> &Rc<RefCell<KinematicCharacter>> {
        &self.character
    }

    /// Sim time at the start of the next tick.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.ticks as f32 * self.dt
    }

    /// Steps not yet applied.
    #[must_use]
    pub fn pending_steps(&self) -> usize {
        self.pending.len()
    }

    /// Applies due steps, then advances movement and rope by one tick.
    pub fn tick(&mut self) {
        let now = self.time();
        while self
            .pending
            .front()
            .is_some_and(|step| step.at <= now + DUE_EPSILON)
        {
            if let Some(step) = self.pending.pop_front() {
                self.apply(step.action, now);
            }
        }

        if let Some(swing) = self.held_swing {
            if now < swing.until {
                self.rope.apply_swing_input(swing.input);
            } else {
                self.held_swing = None;
            }
        }

        self.character.borrow_mut().step(self.dt);
        self.rope.tick(self.dt);
        self.ticks += 1;
        self.collect_events();
    }

    /// Runs `ticks` ticks and returns the report.
    pub fn run(&mut self, ticks: u64) -> SimReport {
        for _ in 0..ticks {
            self.tick();
        }
        self.report()
    }

    /// Report for the run so far.
    #[must_use]
    pub fn report(&self) -> SimReport {
        let character = self.character.borrow();
        SimReport {
            ticks: self.ticks,
            elapsed: self.time(),
            final_phase: self.rope.phase(),
            final_position: character.location(),
            final_length: self.rope.current_length(),
            ..self.report.clone()
        }
    }

    fn apply(&mut self, action: ScenarioAction, now: f32) {
        debug!(time = now, ?action, "step");
        self.report.steps_applied += 1;

        match action {
            ScenarioAction::Rope { command } => {
                if command.apply(&mut self.rope) == CommandOutcome::Passed {
                    self.character.borrow_mut().jump();
                    self.report.jumps_passed += 1;
                }
            },
            ScenarioAction::Aim { direction } => {
                let mut character = self.character.borrow_mut();
                let origin = character.location();
                character.set_aim(origin, direction);
            },
            ScenarioAction::ClearAim => self.character.borrow_mut().clear_aim(),
            ScenarioAction::Face { forward } => self.character.borrow_mut().set_forward(forward),
            ScenarioAction::Walk { x, y } => {
                self.character
                    .borrow_mut()
                    .set_walk_input(Vec3::new(x, y, 0.0));
            },
            ScenarioAction::Swing {
                right,
                forward,
                duration,
            } => {
                self.held_swing = Some(HeldSwing {
                    input: Vec2::new(right, forward),
                    until: now + duration,
                });
            },
            ScenarioAction::Teleport { position } => {
                let mut character = self.character.borrow_mut();
                character.set_position(position);
                character.set_velocity(Vec3::ZERO);
            },
            ScenarioAction::Log { message } => info!(time = now, "{message}"),
        }
    }

    fn collect_events(&mut self) {
        let time = self.time();
        for event in self.events.drain() {
            match event {
                RopeEvent::PhaseChanged { from, to } => {
                    info!(time, %from, %to, "rope phase");
                    self.report
                        .transitions
                        .push(PhaseTransition { time, from, to });
                },
                RopeEvent::Attached { anchor, length } => {
                    debug!(time, ?anchor, length, "rope attached");
                    self.report.attaches += 1;
                },
                RopeEvent::LedgeClimbed { target } => {
                    debug!(time, ?target, "ledge climbed");
                    self.report.ledge_climbs += 1;
                },
                RopeEvent::Recalled => self.report.recalls += 1,
                RopeEvent::Reset => {
                    warn!(time, "rope reset");
                    self.report.resets += 1;
                },
                RopeEvent::Debug(shape) => trace!(?shape, "debug draw"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ScenePreset;

    fn gallery_config() -> SimConfig {
        SimConfig {
            scene: ScenePreset::Gallery,
            spawn: Vec3::new(0.0, 0.0, 400.0),
            ..SimConfig::default()
        }
    }

    fn hang_and_recall() -> Scenario {
        Scenario {
            name: "hang_and_recall".to_string(),
            description: None,
            steps: vec![
                ScenarioStep::rope(1.0, RopeCommand::BeginRecall),
                ScenarioStep::rope(0.05, RopeCommand::Throw),
                ScenarioStep::action(0.0, ScenarioAction::Aim { direction: Vec3::Z }),
                ScenarioStep::rope(0.0, RopeCommand::StartAim),
            ],
        }
    }

    #[test]
    fn test_parse_scenario_json() {
        let text = r#"{
            "name": "parse",
            "steps": [
                {"at": 0.5, "action": {"type": "rope", "command": {"type": "throw"}}},
                {"at": 0.0, "action": {"type": "aim", "direction": [0.0, 0.0, 1.0]}},
                {"at": 1.0, "action": {"type": "swing", "right": 0.0, "forward": 1.0, "duration": 0.5}}
            ]
        }"#;

        let scenario = Scenario::from_json_str(text).expect("parse");
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(
            scenario.steps[0].action,
            ScenarioAction::Aim { direction: Vec3::Z }
        );
        assert_eq!(
            scenario.steps[1].action,
            ScenarioAction::Rope {
                command: RopeCommand::Throw
            }
        );
    }

    #[test]
    fn test_rejects_negative_time() {
        let text = r#"{"name": "bad", "steps": [{"at": -1.0, "action": {"type": "clear_aim"}}]}"#;
        let err = Scenario::from_json_str(text).expect_err("negative time");
        assert!(matches!(err, LariatError::Scenario(_)));
    }

    #[test]
    fn test_rejects_unknown_action() {
        let text = r#"{"name": "bad", "steps": [{"at": 0.0, "action": {"type": "fly"}}]}"#;
        assert!(Scenario::from_json_str(text).is_err());
    }

    #[test]
    fn test_bundled_scenario_parses() {
        let scenario =
            Scenario::from_json_str(include_str!("../scenarios/courtyard.json")).expect("parse");
        assert_eq!(scenario, Scenario::demo());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = Scenario::load("/nonexistent/scenario.json").expect_err("missing");
        assert!(matches!(err, LariatError::Io(_)));
    }

    #[test]
    fn test_runner_hangs_then_recalls() {
        let mut runner = ScenarioRunner::new(&gallery_config(), hang_and_recall());

        for _ in 0..30 {
            runner.tick();
        }
        assert!(runner.rope().is_hanging());
        assert_eq!(runner.pending_steps(), 1);

        let report = runner.run(60);
        assert_eq!(report.ticks, 90);
        assert_eq!(report.steps_applied, 4);
        assert_eq!(report.attaches, 1);
        assert_eq!(report.recalls, 1);
        assert_eq!(report.resets, 0);
        assert_eq!(report.final_phase, RopePhase::Idle);
        assert!(report
            .transitions
            .iter()
            .any(|t| t.to == RopePhase::Hanging));
        assert_eq!(
            report.transitions.last().map(|t| t.to),
            Some(RopePhase::Idle)
        );
    }

    #[test]
    fn test_runner_passes_jump_to_character() {
        let config = SimConfig {
            scene: ScenePreset::Flat,
            spawn: Vec3::new(0.0, 0.0, 150.0),
            ..SimConfig::default()
        };
        let scenario = Scenario {
            name: "jump".to_string(),
            description: None,
            steps: vec![ScenarioStep::rope(0.5, RopeCommand::Jump)],
        };
        let mut runner = ScenarioRunner::new(&config, scenario);

        runner.run(30);
        assert!((runner.character().borrow().location().z - 88.0).abs() < 1.0);

        let report = runner.run(12);
        assert_eq!(report.jumps_passed, 1);
        assert_eq!(runner.character().borrow().jump_count(), 1);
        assert!(report.final_position.z > 120.0);
    }

    #[test]
    fn test_held_swing_expires() {
        let config = gallery_config();
        let scenario = Scenario {
            name: "swing".to_string(),
            description: None,
            steps: vec![ScenarioStep::action(
                0.0,
                ScenarioAction::Swing {
                    right: 1.0,
                    forward: 0.0,
                    duration: 0.1,
                },
            )],
        };
        let mut runner = ScenarioRunner::new(&config, scenario);

        runner.tick();
        assert!(runner.held_swing.is_some());
        runner.run(10);
        assert!(runner.held_swing.is_none());
    }

    #[test]
    fn test_teleport_and_walk() {
        let config = SimConfig {
            scene: ScenePreset::Flat,
            ..SimConfig::default()
        };
        let scenario = Scenario {
            name: "walk".to_string(),
            description: None,
            steps: vec![
                ScenarioStep::action(
                    0.0,
                    ScenarioAction::Teleport {
                        position: Vec3::new(100.0, 0.0, 88.0),
                    },
                ),
                ScenarioStep::action(0.0, ScenarioAction::Walk { x: 1.0, y: 0.0 }),
            ],
        };
        let mut runner = ScenarioRunner::new(&config, scenario);

        let report = runner.run(30);

        assert!(report.final_position.x > 100.0);
        assert_eq!(report.final_phase, RopePhase::Idle);
    }
}
