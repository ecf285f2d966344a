//! Gridline headless demo
//!
//! Runs a scripted session against the simulation core and logs HUD-style
//! telemetry once per simulated second. Useful for balance tuning and as a
//! living example of the engine's frame contract: drain the segment queues
//! every frame, exactly once.
//!
//! An optional argument names a JSON config file; missing fields fall back
//! to the shipped defaults.

use gridline::{Config, Engine, TurnDirection};

const FRAMES_PER_SECOND: u64 = 60;
const RUN_FRAMES: u64 = 7200;

fn load_config() -> Config {
    let Some(path) = std::env::args().nth(1) else {
        return Config::default();
    };
    match std::fs::read_to_string(&path) {
        Ok(json) => match Config::from_json(&json) {
            Ok(config) => {
                log::info!("loaded config from {path}");
                config
            }
            Err(err) => {
                log::error!("bad config {path}: {err}; using defaults");
                Config::default()
            }
        },
        Err(err) => {
            log::error!("cannot read {path}: {err}; using defaults");
            Config::default()
        }
    }
}

fn main() {
    env_logger::init();

    let config = load_config();
    let mut engine = Engine::new(config);

    // A lap-like script: alternate turns, with a brake pulse mid-run
    let mut rendered_segments: usize = 0;

    for frame in 1..=RUN_FRAMES {
        match frame {
            400 | 1600 | 2800 => engine.queue_turn(TurnDirection::Right),
            1000 | 2200 | 3400 => engine.queue_turn(TurnDirection::Left),
            1800 => engine.set_braking(true),
            2000 => engine.set_braking(false),
            _ => {}
        }

        let health = engine.update();

        // Consume the frame deltas the way a renderer would
        rendered_segments += engine.take_new_segments().len();
        rendered_segments -= engine.take_removed_segments().min(rendered_segments);

        if frame % FRAMES_PER_SECOND == 0 {
            let bike = engine.bike_state();
            log::info!(
                "t={:>4}s pos=({:>7.2},{:>7.2}) health={:>6.1} brake={:>5.1} zone={:.2} trail={} segs={}",
                frame / FRAMES_PER_SECOND,
                bike.position.x,
                bike.position.z,
                bike.health,
                bike.brake_energy,
                engine.arena_scale(),
                engine.trail_len(),
                rendered_segments,
            );
        }

        if health <= 0.0 && !engine.bike_state().alive {
            log::info!("run over at frame {}", engine.frame_count());
            break;
        }
    }

    let bike = engine.bike_state();
    println!(
        "frames={} health={:.1} ({}%) alive={} trail_span={}",
        engine.frame_count(),
        bike.health,
        bike.health_percent() as u32,
        bike.alive,
        engine.active_trail_frame_span(),
    );
    if let Ok(snapshot) = serde_json::to_string_pretty(&bike) {
        println!("{snapshot}");
    }
}
