//! Property-based tests for rope state invariants.
//!
//! Random command sequences are interleaved with movement and rope ticks,
//! and the rope length bounds are checked after every step.

use glam::Vec3;
use lariat_gameplay::prelude::*;
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Op {
    Command(RopeCommand),
    Aim(Vec3),
    Tick(f32),
}

fn arb_command() -> impl Strategy<Value = RopeCommand> {
    prop_oneof![
        Just(RopeCommand::StartAim),
        Just(RopeCommand::StopAim),
        Just(RopeCommand::Throw),
        Just(RopeCommand::ToggleHold),
        Just(RopeCommand::BeginRecall),
        Just(RopeCommand::CancelRecall),
        (-1.0f32..1.0, -1.0f32..1.0)
            .prop_map(|(right, forward)| RopeCommand::Swing { right, forward }),
        Just(RopeCommand::ClimbUp),
        Just(RopeCommand::ClimbDown),
        Just(RopeCommand::StopClimb),
        any::<bool>().prop_map(|jump| RopeCommand::Release { jump }),
        Just(RopeCommand::Jump),
        Just(RopeCommand::ForceReset),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_command().prop_map(Op::Command),
        1 => prop::array::uniform3(-1.0f32..1.0)
            .prop_map(|[x, y, z]| Op::Aim(Vec3::new(x, y, z.abs() + 0.2))),
        4 => (0.0f32..0.05).prop_map(Op::Tick),
    ]
}

fn arena() -> StaticScene {
    let mut scene = StaticScene::new();
    scene.add_ground(0.0);
    scene.add_box(
        Vec3::new(-2000.0, -2000.0, 700.0),
        Vec3::new(2000.0, 2000.0, 800.0),
    );
    scene.add_box(Vec3::new(400.0, -300.0, 0.0), Vec3::new(700.0, 300.0, 250.0));
    scene
}

fn check_invariants(rope: &RopeTraversal) -> Result<(), TestCaseError> {
    let config = rope.config();
    let length = rope.current_length();

    prop_assert!(length.is_finite());
    if rope.is_attached() {
        prop_assert!(length >= 0.0, "length {} below zero", length);
        prop_assert!(length <= config.max_length, "length {} above max", length);
    } else {
        prop_assert_eq!(length, config.max_length);
    }
    if rope.is_holding() {
        prop_assert!(length >= config.climb_floor(), "held length {} below floor", length);
    }
    if rope.is_hanging() {
        prop_assert!(rope.is_attached() && rope.is_holding());
    }
    if rope.climb_sign() != ClimbSign::None {
        prop_assert!(rope.is_hanging() || rope.is_holding());
    }
    let progress = rope.recall_progress();
    prop_assert!((0.0..=1.0).contains(&progress));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn proptest_length_stays_in_bounds(ops in prop::collection::vec(arb_op(), 1..200)) {
        let world: Rc<dyn GeometryQuery> = Rc::new(arena());
        let character = Rc::new(RefCell::new(
            KinematicCharacter::new(Vec3::new(0.0, 0.0, 300.0)).in_scene(Rc::clone(&world)),
        ));
        let shared: SharedCharacter = character.clone();
        let mut config = RopeConfig::default();
        config.climb_min_length = 40.0;
        let mut rope = RopeTraversal::new(config, world).with_owner(&shared);

        for op in ops {
            match op {
                Op::Command(command) => {
                    if command.apply(&mut rope) == CommandOutcome::Passed {
                        character.borrow_mut().jump();
                    }
                },
                Op::Aim(direction) => {
                    let mut character = character.borrow_mut();
                    let origin = character.location();
                    character.set_aim(origin, direction);
                },
                Op::Tick(dt) => {
                    character.borrow_mut().step(dt);
                    rope.tick(dt);
                },
            }
            check_invariants(&rope)?;
        }
    }

    #[test]
    fn proptest_recall_always_finishes(height in 1.0f32..1200.0) {
        let mut scene = StaticScene::new();
        scene.add_box(
            Vec3::new(-50.0, -50.0, height),
            Vec3::new(50.0, 50.0, height + 10.0),
        );
        let world: Rc<dyn GeometryQuery> = Rc::new(scene);
        let concrete = Rc::new(RefCell::new(KinematicCharacter::new(Vec3::ZERO)));
        concrete.borrow_mut().set_aim(Vec3::ZERO, Vec3::Z);
        let character: SharedCharacter = concrete;
        let mut rope = RopeTraversal::new(RopeConfig::default(), world).with_owner(&character);

        rope.start_aim();
        rope.tick(1.0 / 60.0);
        rope.throw_rope();
        for _ in 0..60 {
            if rope.is_attached() {
                break;
            }
            rope.tick(1.0 / 60.0);
        }
        prop_assert!(rope.is_attached());

        rope.begin_recall();
        prop_assert!(rope.is_recalling());
        for _ in 0..61 {
            rope.tick(1.0 / 60.0);
        }
        prop_assert_eq!(rope.phase(), RopePhase::Idle);
        prop_assert_eq!(rope.current_length(), rope.config().max_length);
    }
}
