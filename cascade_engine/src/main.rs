/// Cascade kernel — Demo Runner
///
/// Runs a preset for N steps and prints the resulting organ table and
/// clinical timeline.
///
/// Usage: cascade-sim [preset] [steps]
///   preset  normal | early-sepsis | advanced-sepsis | cardiogenic-shock
///           (default early-sepsis)
///   steps   number of steps (default 48)
///
/// Set CASCADE_TIME_STEP_HOURS to change the step length, RUST_LOG to
/// change log verbosity.

use std::process;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cascade_engine::config::EngineConfig;
use cascade_engine::engine::PhysiologyEngine;
use cascade_engine::hashing::canonical_hash;
use cascade_engine::scenarios::Preset;

const DEFAULT_STEPS: usize = 48;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);

    let preset = match args.next().map(|a| a.parse::<Preset>()) {
        None => Preset::EarlySepsis,
        Some(Ok(p)) => p,
        Some(Err(e)) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    let steps = match args.next().map(|a| a.parse::<usize>()) {
        None => DEFAULT_STEPS,
        Some(Ok(n)) => n,
        Some(Err(e)) => {
            error!("invalid step count: {}", e);
            process::exit(2);
        }
    };

    let config = match EngineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    let engine = match PhysiologyEngine::with_config(config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{}", e);
            process::exit(2);
        }
    };

    info!(%preset, steps, time_step = engine.time_step(), "cascade-sim starting");

    let initial = preset.build();
    let state = engine.run(&initial, steps);

    println!("Preset: {}  t = {:.1} h", preset, state.timestamp);
    println!();
    println!("{:<12} {:>8}  {}", "organ", "severity", "description");
    for organ in state.organs.iter() {
        println!(
            "{:<12} {:>8.3}  {}",
            organ.id().as_str(),
            organ.severity().value(),
            organ.description()
        );
    }

    let sys = &state.systemic_parameters;
    println!();
    println!(
        "lactate {:.2}  pH {:.3}  BE {:.2}  inflammation {:.2}  perfusion {:.2}",
        sys.lactate, sys.ph, sys.base_excess, sys.inflammation, sys.perfusion_status
    );

    println!();
    println!("Timeline:");
    for entry in &state.timeline {
        let organ = entry
            .organ_affected
            .map(|o| format!(" [{}]", o))
            .unwrap_or_default();
        println!("  {:>6.1} h  {}{}", entry.time, entry.event, organ);
    }

    let visible = engine.active_propagations(&state);
    if !visible.is_empty() {
        println!();
        println!("Active propagations:");
        for rule in &visible {
            println!("  {} -> {}: {}", rule.source, rule.target, rule.mechanism);
        }
    }

    println!();
    println!("State hash: {}", canonical_hash(&state));
}
