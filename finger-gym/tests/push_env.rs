use approx::assert_relative_eq;

use finger_core::PointCoordinates;
use finger_gym::{compute_reward, EnvError, FingerPush, FingerPushCfg, ObservationKey, SchemaEntry};
use finger_sim::FingerType;

fn env(finger_type: FingerType, seed: u64) -> FingerPush {
    FingerPushCfg {
        finger_type,
        seed,
        ..FingerPushCfg::default()
    }
    .finalize()
    .unwrap()
}

#[test]
fn test_reset_observation_is_scaled() {
    for (finger_type, width) in [(FingerType::Tri, 33), (FingerType::Single, 15)] {
        let mut env = env(finger_type, 11);
        for _ in 0..20 {
            let observation = env.reset().unwrap();
            assert_eq!(observation.len(), width);
            assert_eq!(observation.len(), env.schema().width());
            assert!(observation.iter().all(|v| (-1.0..=1.0).contains(v)));
        }
    }
}

#[test]
fn test_reward_is_negative_distance() {
    let goal = PointCoordinates::new(0.05, -0.02, 0.0425);
    assert_eq!(compute_reward(&goal, &goal), (0.0, false));
    let (reward, done) = compute_reward(&PointCoordinates::new(0.05, 0.08, 0.0425), &goal);
    assert_relative_eq!(reward, -0.1, epsilon = 1e-12);
    assert!(!done);
}

#[test]
fn test_step_reward_follows_the_object() {
    let mut env = env(FingerType::Tri, 5);
    let goal = env.episode().goal;
    let action = vec![0.0; env.action_space().dim()];

    env.block().set_state(goal, [0.0, 0.0, 0.0, 1.0]);
    let result = env.step(&action).unwrap();
    assert_relative_eq!(result.reward, 0.0, epsilon = 1e-12);
    assert!(!result.done);
    assert_eq!(result.info.is_success, 0.0);

    env.block()
        .set_state(goal + PointCoordinates::new(0.03, 0.04, 0.0), [0.0, 0.0, 0.0, 1.0]);
    let result = env.step(&action).unwrap();
    assert_relative_eq!(result.reward, -0.05, epsilon = 1e-12);
    assert_eq!(env.episode().step_count, 2);
}

#[test]
fn test_action_is_unscaled_into_joint_bounds() {
    let mut env = env(FingerType::Single, 1);
    let result = env.step(&[1.0, 1.0, 1.0]).unwrap();
    let commanded = env
        .unscaled_field(&result.observation, ObservationKey::ActionJointPositions)
        .unwrap();
    assert_eq!(commanded.len(), 3);
    assert_relative_eq!(commanded[0], 1.0, epsilon = 1e-9);
    assert_relative_eq!(commanded[1], 1.57, epsilon = 1e-9);
    assert_relative_eq!(commanded[2], 0.0, epsilon = 1e-9);
}

#[test]
fn test_wrong_action_width_is_rejected() {
    let mut env = env(FingerType::Tri, 2);
    assert!(matches!(
        env.step(&[0.0; 3]),
        Err(EnvError::ActionWidth { expected: 9, got: 3 })
    ));
}

#[test]
fn test_control_rate_must_match_the_simulation_step() {
    let cfg = FingerPushCfg {
        control_rate_s: 0.01,
        ..FingerPushCfg::default()
    };
    assert!(matches!(cfg.finalize(), Err(EnvError::ControlRate { .. })));

    for control_rate_s in [f64::NAN, 0.0, 0.001] {
        let cfg = FingerPushCfg {
            control_rate_s,
            ..FingerPushCfg::default()
        };
        assert!(matches!(cfg.finalize(), Err(EnvError::ControlRate { .. })));
    }

    let env = FingerPushCfg {
        control_rate_s: 0.02,
        ..FingerPushCfg::default()
    }
    .finalize()
    .unwrap();
    assert_eq!(env.steps_per_control(), 5);
}

#[test]
fn test_same_seed_same_episodes() {
    let mut a = env(FingerType::Tri, 42);
    let mut b = env(FingerType::Tri, 42);
    assert_eq!(a.episode(), b.episode());
    assert_eq!(a.reset().unwrap(), b.reset().unwrap());
    assert_eq!(a.episode(), b.episode());
    assert_eq!(a.goal_marker().positions(), &[a.episode().goal]);
}

#[test]
fn test_custom_schema_is_validated() {
    let cfg = FingerPushCfg {
        finger_type: FingerType::Single,
        observations: Some(vec![
            SchemaEntry {
                key: ObservationKey::EndEffectorToGoal,
                width: 3,
            },
            SchemaEntry {
                key: ObservationKey::ObjectPosition,
                width: 3,
            },
        ]),
        ..FingerPushCfg::default()
    };
    let mut env = cfg.finalize().unwrap();
    assert_eq!(env.reset().unwrap().len(), 6);

    let cfg = FingerPushCfg {
        observations: Some(vec![SchemaEntry {
            key: ObservationKey::JointVelocities,
            width: 3,
        }]),
        ..FingerPushCfg::default()
    };
    assert!(matches!(cfg.finalize(), Err(EnvError::SchemaWidth { .. })));
}

#[test]
fn test_episodes_are_logged() {
    let mut env = env(FingerType::Tri, 9);
    let action = vec![0.0; 9];
    for _ in 0..3 {
        env.step(&action).unwrap();
    }
    env.reset().unwrap();

    let episodes = env.logger().episodes();
    assert_eq!(episodes.len(), 2);
    // reset plus three steps
    assert_eq!(episodes[0].steps.len(), 4);
    assert_eq!(episodes[0].steps[0].tip_positions.len(), 3);
    assert_eq!(episodes[1].steps.len(), 1);
}
