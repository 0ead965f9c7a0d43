use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use finger_gym::FingerPushCfg;

const EPISODES: usize = 3;
const STEPS_PER_EPISODE: usize = 200;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| String::from("push_rollout.csv"));

    let mut env = FingerPushCfg::default().finalize()?;
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let action_dim = env.action_space().dim();

    for episode in 0..EPISODES {
        if episode > 0 {
            env.reset()?;
        }
        let mut total = 0.0;
        for _ in 0..STEPS_PER_EPISODE {
            let action: Vec<f64> = (0..action_dim).map(|_| rng.gen_range(-1.0..=1.0)).collect();
            let result = env.step(&action)?;
            total += result.reward;
        }
        log::info!(
            "episode {episode}: goal {:?}, mean reward {:.4}",
            env.episode().goal.as_slice(),
            total / STEPS_PER_EPISODE as f64
        );
    }

    env.logger().save_csv(&output)?;
    log::info!("episode log written to {output}");
    Ok(())
}
