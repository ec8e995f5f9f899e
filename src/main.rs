// This is my entry point for the academy CLI
// It walks the course, runs the hashing, Merkle and mining demos, and manages learner settings
use bitcoin_academy::core::{MiningSimulator, MiningTick, SiblingPosition};
use bitcoin_academy::{
    clamp_volume, hash256, sha256, to_hex, truncate_hash, Command, Config, LearningSession,
    MerkleTree, Opt, DISPLAY_HASH_LEN, GLOBAL_CONFIG,
};
use clap::Parser;
use log::{error, LevelFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;
use std::process;
use std::time::Instant;

fn main() {
    // I log at Info so session loads and completions show up without debug noise
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();
    // Switching the data directory also picks up the academy.toml that lives there
    if let Some(dir) = opt.data_dir {
        GLOBAL_CONFIG.set_data_dir(dir);
    }

    // Any failure is logged and turned into exit code 1
    if let Err(e) = run_command(opt.command, &GLOBAL_CONFIG) {
        error!("Error: {e}");
        process::exit(1);
    }
}

// Each command opens its own session, so progress always comes fresh from the store
fn run_command(command: Command, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        // I list every module with where the learner stands on it
        Command::Modules { json } => {
            let session = LearningSession::open(config)?;
            let completed = &session.state().completed_modules;
            let modules = session.registry().modules();

            if json {
                let rows: Vec<_> = modules
                    .iter()
                    .map(|module| json!({ "module": module, "status": module.status(completed) }))
                    .collect();
                let listing = json!({
                    "modules": rows,
                    "mastery_points": session.state().mastery_points,
                });
                println!("{}", serde_json::to_string_pretty(&listing)?);
                return Ok(());
            }
            for module in modules {
                let status = module.status(completed).to_string();
                println!(
                    "{:>2}. [{status:^6}] {:<13} {} ({} steps, {} pts)",
                    module.order, module.id, module.title, module.step_count, module.mastery_points
                );
            }
            println!("Mastery points: {}", session.state().mastery_points);
        }
        // I ask the resolver for the first open, unfinished module
        Command::Next => {
            let session = LearningSession::open(config)?;
            match session.next_module() {
                Some(module) => println!("Next up: {} - {}", module.id, module.title),
                None => println!("Course complete!"),
            }
        }
        // I complete one step; locked or unknown modules come back as errors
        Command::Step { module, index } => {
            let mut session = LearningSession::open(config)?;
            let report = session.complete_step(&module, index, Instant::now())?;
            if !report.outcome.newly_completed {
                println!("Step {index} of {module} was already complete");
            }
            // The achievement only shows the first time the last step lands
            if let Some(achievement) = report.achievement {
                println!(
                    "Achievement: {} (+{} pts)",
                    achievement.title, achievement.mastery_points
                );
            } else if let Some(stepper) = session.stepper(&module) {
                println!(
                    "{module}: {}/{} steps complete",
                    stepper.completed_steps().len(),
                    stepper.step_count()
                );
            }
        }
        // I finish every remaining step of a module in one go
        Command::Complete { module } => {
            let mut session = LearningSession::open(config)?;
            match session.complete_module(&module, Instant::now())? {
                Some(achievement) => println!(
                    "Achievement: {} (+{} pts)",
                    achievement.title, achievement.mastery_points
                ),
                None => println!("{module} was already complete"),
            }
        }
        // Progress goes away, audio and level settings stay
        Command::Reset => {
            let mut session = LearningSession::open(config)?;
            session.reset()?;
            println!("Progress erased");
        }
        Command::Hash { text, double } => {
            println!("sha256:  {}", sha256(&text));
            if double {
                println!("hash256: {}", hash256(&text));
            }
        }
        // I print the tree from the root down, with shortened hashes for readability
        Command::Merkle { items, prove } => {
            let tree = MerkleTree::build(items.as_slice())?;
            for (depth, level) in tree.levels().iter().enumerate().rev() {
                let hashes: Vec<String> = level
                    .iter()
                    .map(|h| truncate_hash(&to_hex(h), DISPLAY_HASH_LEN))
                    .collect();
                println!("L{depth}: {}", hashes.join(" "));
            }
            println!("Root: {}", tree.root_hex());

            // The proof is checked against full digests, never the shortened ones
            if let Some(index) = prove {
                let proof = tree.build_proof(index)?;
                for element in &proof.path {
                    let side = match element.position {
                        SiblingPosition::Left => "left ",
                        SiblingPosition::Right => "right",
                    };
                    let sibling = to_hex(&element.sibling_hash);
                    println!("  {side} {}", truncate_hash(&sibling, DISPLAY_HASH_LEN));
                }
                println!("Proof valid: {}", tree.verify_proof(&proof));
            }
        }
        // This is a simulation: each tick is a coin flip, no hash is checked against a target
        Command::Mine {
            difficulty,
            ticks,
            seed,
        } => {
            // A seed makes the run repeatable
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut simulator = MiningSimulator::with_config(difficulty);
            println!("Simulated mining (not real proof-of-work)");
            for _ in 0..ticks {
                match simulator.tick(&mut rng) {
                    MiningTick::Searching { attempts } => println!("  tried {attempts} nonces..."),
                    MiningTick::Found(block) => {
                        println!("Found! nonce {} hash {}", block.nonce, block.hash);
                        return Ok(());
                    }
                }
            }
            println!("No block after {ticks} ticks");
        }
        Command::Settings => {
            let session = LearningSession::open(config)?;
            let settings = session.store().load_settings();
            println!("audio:  {}", if settings.audio_enabled { "on" } else { "off" });
            println!("volume: {:.2}", settings.volume);
            println!("level:  {}", settings.adaptation_level);
        }
        // Settings writes are best-effort; a failed save is only logged
        Command::SetAudio { state } => {
            let session = LearningSession::open(config)?;
            session.store().set_audio_enabled(state.into());
            println!("Audio updated");
        }
        Command::SetVolume { volume } => {
            let session = LearningSession::open(config)?;
            session.store().set_volume(volume);
            // The store clamps to [0, 1], so I echo the clamped value
            println!("Volume set to {:.2}", clamp_volume(volume));
        }
        Command::SetLevel { level } => {
            let session = LearningSession::open(config)?;
            session.store().set_adaptation_level(level);
            println!("Level set to {level}");
        }
    }
    Ok(())
}
