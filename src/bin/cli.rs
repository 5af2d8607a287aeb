use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use ampstack::engine::{Engine, EngineConfig};
use ampstack::io::Manager;
use ampstack::module::ModuleKind;
use ampstack::preset;
use ampstack::settings::Settings;
use ampstack::source::SourceConfig;

#[derive(Parser, Debug)]
#[command(name = "ampstack")]
#[command(version)]
#[command(about = "Guitar amp signal-chain engine on JACK")]
struct Args {
    #[arg(
        long,
        env = "LOOP_FILE",
        help = "Loop a WAV file instead of taking live input"
    )]
    loop_file: Option<PathBuf>,
    #[arg(long, help = "Neural amp model (JSON) to load into the amp slot")]
    model: Option<PathBuf>,
    #[arg(long, help = "Preset name to apply at startup")]
    preset: Option<String>,
    #[arg(long, help = "Cabinet impulse response name (see --list-irs)")]
    ir: Option<String>,
    #[arg(long, help = "List available cabinet impulse responses and exit")]
    list_irs: bool,
    #[arg(long, help = "Start in direct (bypass) mode")]
    bypass: bool,
    #[arg(long, help = "Disable the pedal module at startup")]
    no_pedal: bool,
    #[arg(long, help = "Disable the cabinet module at startup")]
    no_cabinet: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    info!("ampstack v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {:?}", args);

    let settings = Settings::load().context("failed to load settings")?;
    settings.apply_to_environment();

    let manager = Manager::new(&settings.audio).context("failed to reach the audio server")?;

    let (mut engine, rt) = Engine::new(EngineConfig {
        sample_rate: manager.sample_rate(),
        ir_dir: PathBuf::from(&settings.ir_dir),
    })
    .context("failed to create engine")?;

    if args.list_irs {
        for name in engine.available_irs() {
            println!("{name}");
        }
        return Ok(());
    }

    let preset_manager =
        preset::Manager::new(&settings.preset_dir).context("failed to open preset directory")?;
    let selected = args.preset.clone().or_else(|| settings.selected_preset.clone());
    if let Some(name) = selected {
        match preset_manager.get_preset_by_name(&name) {
            Some(found) => {
                engine.apply_preset(found)?;
                info!("applied preset '{name}'");
            }
            None => anyhow::bail!("preset '{name}' not found in {}", settings.preset_dir),
        }
    }

    if args.no_pedal {
        engine.set_module_enabled(ModuleKind::Pedal, false)?;
    }
    if args.no_cabinet {
        engine.set_module_enabled(ModuleKind::Cabinet, false)?;
    }
    if let Some(ref ir) = args.ir {
        engine.select_cabinet_ir(ir)?;
    }
    if let Some(ref model) = args.model {
        engine.load_neural_model(model);
    }
    engine.set_bypass(args.bypass);

    let _active = manager.activate(rt)?;

    let source = args
        .loop_file
        .map_or(SourceConfig::LiveInput, SourceConfig::LoopFile);
    engine.start(source)?;

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = Arc::clone(&running);

    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        shutdown_flag.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl+C handler");

    while running.load(Ordering::SeqCst) {
        // Drains model/IR load completions and retired chains
        engine.wait_events(Duration::from_millis(200));
    }

    engine.stop();
    Ok(())
}
