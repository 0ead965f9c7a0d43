use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use finger_sim::{
    block::BLOCK_HALF_SIZE, sample::random_position_in_arena, tricamera_calibrations, Block, FingerType, SimCameraRig, SimCameraRigCfg,
    SimFinger, SimMarkerDetector, SIMULATION_TIME_STEP,
};
use visual_servo::ServoLoopCfg;

const CUBE_MOVES: usize = 5;
const CUBE_MOVE_PERIOD: Duration = Duration::from_secs(3);

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => ServoLoopCfg::from_yaml_file(path)?,
        None => ServoLoopCfg::default(),
    };
    log::debug!("{cfg:?}");

    let block = Block::default();
    let calibrations = tricamera_calibrations()?;
    for calibration in &calibrations {
        log::debug!("{}: cam_to_world {}", calibration.name, calibration.cam_to_world());
    }

    let rig = SimCameraRig::new(calibrations.clone(), block.clone(), SimCameraRigCfg::default())?;
    let tracker = cfg
        .tracker
        .clone()
        .finalize(rig, calibrations, SimMarkerDetector)?;

    let finger = SimFinger::new(FingerType::Tri, SIMULATION_TIME_STEP);
    let kinematics = finger.kinematics().clone();
    let mut servo = cfg.finalize(finger, tracker, kinematics)?;

    // moves the cube around while the loop follows it, then stops the loop
    let stop = Arc::new(AtomicBool::new(false));
    let mover = {
        let stop = stop.clone();
        let block = block.clone();
        thread::spawn(move || {
            let mut rng = ChaCha8Rng::seed_from_u64(0);
            for _ in 0..CUBE_MOVES {
                thread::sleep(CUBE_MOVE_PERIOD);
                let position = random_position_in_arena(&mut rng, BLOCK_HALF_SIZE);
                log::info!("cube moved to [{:.3}, {:.3}, {:.3}]", position.x, position.y, position.z);
                block.set_state(position, [0.0, 0.0, 0.0, 1.0]);
            }
            thread::sleep(CUBE_MOVE_PERIOD);
            stop.store(true, Ordering::Relaxed);
        })
    };

    let ticks = servo.run(&stop)?;
    log::info!("{ticks} ticks, final command {:?}", servo.commanded().as_slice());

    if mover.join().is_err() {
        log::warn!("cube mover panicked");
    }
    Ok(())
}
