//! Drive a pool of scripted walkers with random actions
//!
//! Shows the curriculum withdrawing assistance as rollouts keep clearing the
//! promotion threshold. Run with `RUST_LOG=debug` for per-rollout detail.
use anyhow::Result;
use nalgebra::Vector3;
use rand::Rng;
use stride_rl::body::{BodyPartId, BodyState, ScriptedHarness, SimClock, ACTION_SIZE};
use stride_rl::curriculum::{CurriculumConfig, CurriculumHub, SkillCurriculum};
use stride_rl::env::{BipedEnv, EnvConfig, EnvPool, Environment};
use stride_rl::skill::Skill;
use tracing_subscriber::EnvFilter;

const NUM_ENVS: usize = 8;
const TOTAL_STEPS: usize = 2_000;

fn walker() -> ScriptedHarness {
    ScriptedHarness::standing().with_reset_jitter(0.05).with_motion(
        |clock: &SimClock, states: &mut [BodyState; BodyPartId::COUNT]| {
            let t = clock.time as f32;
            let speed = 0.5 + 0.1 * (t * 3.0).sin();
            let hips = &mut states[BodyPartId::Hips.index()];
            hips.linear_velocity = Vector3::new(0.0, 0.0, speed);
            hips.position.z += speed * 0.02;

            let left_down = (clock.step / 15) % 2 == 0;
            states[BodyPartId::FootL.index()].ground_contact = left_down;
            states[BodyPartId::FootR.index()].ground_contact = !left_down;
        },
    )
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("🚶 Scripted walker curriculum demo\n");

    let curriculum = CurriculumConfig::default().with_lock_duration(0.5).with_skill(
        SkillCurriculum::new(Skill::Walk).with_milestone_secs(0.5).with_reduction_percentage(0.2),
    );
    let hub = CurriculumHub::new(curriculum)?;
    let config = EnvConfig::default().with_max_episode_steps(250);

    let mut pool = EnvPool::try_new(|| BipedEnv::new(walker(), config.clone(), &hub), NUM_ENVS)?;
    pool.reset()?;

    let mut rng = rand::thread_rng();
    let mut episodes = 0;
    let mut returns = vec![0.0_f32; NUM_ENVS];

    for step in 0..TOTAL_STEPS / NUM_ENVS {
        let actions: Vec<Vec<f32>> = (0..NUM_ENVS)
            .map(|_| (0..ACTION_SIZE).map(|_| rng.gen_range(-0.3..0.3)).collect())
            .collect();
        let results = pool.step(&actions)?;

        for (id, result) in results.iter().enumerate() {
            returns[id] += result.reward;
            if result.terminated || result.truncated {
                episodes += 1;
                println!(
                    "Episode {:3} | env {} | return {:7.3} | lesson {} | assist {:.2}",
                    episodes, id, returns[id], result.info.lesson, result.info.assist_multiplier
                );
                returns[id] = 0.0;
                pool.reset_env(id)?;
            }
        }

        if step % 50 == 0 {
            let snapshot = hub.snapshot(Skill::Walk)?;
            println!(
                "\n📊 Step {} | walk lesson {} | multiplier {:.2} | expert reward {:.3}\n",
                step * NUM_ENVS,
                snapshot.lesson,
                snapshot.multiplier,
                snapshot.expert_reward
            );
        }
    }

    if let Some(env) = pool.env(0) {
        println!("Final observation size: {}", env.observation_space().shape[0]);
    }
    println!("✅ Done after {} episodes", episodes);
    Ok(())
}
