pub mod error;
pub mod message;
pub mod rt;
pub mod status;

pub use error::EngineError;
pub use rt::RtProcessor;
pub use status::{EngineStatus, NeuralStatus, StatusHandle};

use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use crossbeam::channel::{Receiver, Sender, bounded};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::chain::build_chain;
use crate::chain::stages::StageKind;
use crate::engine::message::{Retired, RtMessage};
use crate::engine::status::ModuleStatus;
use crate::ir::loader::{IrLoader, load_ir_file};
use crate::model::loader::{ModelLoaded, ModelLoader};
use crate::module::{AmpModel, IrSelection, ModuleKind, Modules, NeuralState, ParamSpec, StageOwner};
use crate::preset::{ModuleRecord, Preset};
use crate::source::{LoopPlayer, SourceConfig, SourceState};

pub struct EngineConfig {
    pub sample_rate: usize,
    pub ir_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            ir_dir: PathBuf::from("./impulse_responses"),
        }
    }
}

struct IrLoaded {
    generation: u64,
    result: Result<Vec<f32>>,
}

/// Control-context half of the signal-chain engine.
///
/// Owns module state, builds chains, loads assets and serializes
/// presets. Structural changes are realized by building a complete new
/// chain here and shipping it to the paired `RtProcessor`; the audio
/// side swaps pointers and sends the displaced structure back for
/// disposal. All methods take `&mut self`, so structural operations on
/// one engine are serialized by construction.
pub struct Engine {
    modules: Modules,
    bypass: bool,
    running: bool,
    source: SourceConfig,
    sample_rate: f32,
    /// Bumped on stop; in-flight asset loads from an older generation
    /// are discarded when they complete.
    generation: u64,
    last_layout: Vec<(StageOwner, StageKind)>,

    ir_loader: IrLoader,

    tx_rt: Sender<RtMessage>,
    rx_retired: Receiver<Retired>,
    tx_model: Sender<ModelLoaded>,
    rx_model: Receiver<ModelLoaded>,
    tx_ir: Sender<IrLoaded>,
    rx_ir: Receiver<IrLoaded>,

    status: Arc<ArcSwap<EngineStatus>>,
}

impl Engine {
    /// Create the control half and its paired audio-side processor.
    /// The processor goes to whoever drives the callback: the JACK
    /// manager in production, the test itself in tests.
    pub fn new(config: EngineConfig) -> Result<(Self, RtProcessor)> {
        let ir_loader = IrLoader::new(&config.ir_dir, config.sample_rate)
            .context("failed to initialize IR loader")?;

        let (tx_rt, rx_rt) = bounded::<RtMessage>(256);
        let (tx_retired, rx_retired) = bounded::<Retired>(256);
        let (tx_model, rx_model) = bounded::<ModelLoaded>(8);
        let (tx_ir, rx_ir) = bounded::<IrLoaded>(8);

        let processor = RtProcessor::new(rx_rt, tx_retired);

        let engine = Self {
            modules: Modules::new(),
            bypass: false,
            running: false,
            source: SourceConfig::LiveInput,
            sample_rate: config.sample_rate as f32,
            generation: 0,
            last_layout: Vec::new(),
            ir_loader,
            tx_rt,
            rx_retired,
            tx_model,
            rx_model,
            tx_ir,
            rx_ir,
            status: Arc::new(ArcSwap::from_pointee(EngineStatus::default())),
        };
        engine.publish_status();

        Ok((engine, processor))
    }

    /// Acquire the source, realize the initial chain and go live.
    /// No-op when already running. On failure nothing has been sent to
    /// the audio side; the engine stays stopped and intact.
    pub fn start(&mut self, source: SourceConfig) -> Result<(), EngineError> {
        if self.running {
            return Ok(());
        }

        let state = self.realize_source(&source)?;
        self.source = source;

        let chain = build_chain(&self.modules, self.bypass, self.sample_rate);
        self.last_layout = chain.layout();

        self.send(RtMessage::SetSource(Box::new(state)));
        self.send(RtMessage::SetChain(Box::new(chain)));
        self.send(RtMessage::SetActive(true));
        self.running = true;

        info!("engine started ({})", self.source);
        self.publish_status();
        Ok(())
    }

    /// Tear down the chain, release the source, silence the output.
    /// Idempotent. In-flight asset loads become no-ops.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }

        self.generation += 1;
        if matches!(self.modules.amp.neural, NeuralState::Loading) {
            self.modules.amp.neural = NeuralState::Idle;
        }
        if matches!(self.modules.cabinet.ir, IrSelection::Loading) {
            self.modules.cabinet.ir = IrSelection::Default;
        }

        self.send(RtMessage::SetActive(false));
        self.send(RtMessage::SetChain(Box::new(crate::chain::Chain::empty())));
        self.send(RtMessage::SetSource(Box::new(SourceState::Live)));
        self.running = false;
        self.last_layout = Vec::new();

        self.reclaim();
        info!("engine stopped");
        self.publish_status();
    }

    /// Enable or disable one module and rebuild. Disabling releases the
    /// module's realized stages with the retired chain; module state
    /// (parameter values, loaded assets) stays for the next enable.
    pub fn set_module_enabled(
        &mut self,
        kind: ModuleKind,
        enabled: bool,
    ) -> Result<(), EngineError> {
        if self.modules.enabled(kind) == enabled {
            return Ok(());
        }
        self.modules.set_enabled(kind, enabled);
        debug!("{kind} {}", if enabled { "enabled" } else { "disabled" });
        if self.running {
            self.rebuild();
        }
        self.publish_status();
        Ok(())
    }

    /// Direct mode on/off. A pure detour: module flags are untouched,
    /// so switching back restores the previous processed chain shape.
    pub fn set_bypass(&mut self, bypass: bool) {
        if self.bypass == bypass {
            return;
        }
        self.bypass = bypass;
        debug!("bypass {}", if bypass { "on" } else { "off" });
        if self.running {
            self.rebuild();
        }
        self.publish_status();
    }

    /// Clamp and apply one parameter. Never rebuilds: the value is
    /// stored in module state and, when running, routed to the realized
    /// stage, landing within the next buffer or two.
    pub fn set_parameter(
        &mut self,
        kind: ModuleKind,
        name: &str,
        value: f32,
    ) -> Result<(), EngineError> {
        if !self.modules.enabled(kind) {
            return Err(EngineError::UnknownParameter {
                module: kind,
                name: name.to_string(),
            });
        }
        let Some(spec) = Modules::spec(kind, name) else {
            return Err(EngineError::UnknownParameter {
                module: kind,
                name: name.to_string(),
            });
        };
        if !value.is_finite() {
            return Err(EngineError::InvalidRange {
                name: name.to_string(),
                value,
            });
        }

        let clamped = value.clamp(spec.min, spec.max);
        self.modules.set_value(kind, name, clamped);

        if self.running {
            self.send(RtMessage::SetParam {
                owner: spec.target.owner,
                kind: spec.target.kind,
                nth: spec.target.nth,
                name: spec.target.param,
                value: clamped,
            });
        }
        self.publish_status();
        Ok(())
    }

    /// Swap the signal source. The new source is acquired first; if
    /// that fails the engine keeps running on the old one, untouched.
    pub fn switch_source(&mut self, source: SourceConfig) -> Result<(), EngineError> {
        let state = self.realize_source(&source)?;
        self.source = source;

        if self.running {
            self.send(RtMessage::SetSource(Box::new(state)));
            self.rebuild();
        }
        info!("source switched to {}", self.source);
        self.publish_status();
        Ok(())
    }

    /// Request the neural amp model at `path`. Loading happens on a
    /// background thread; until it completes (and whenever it fails)
    /// the amp keeps its classic stages. Completion triggers a rebuild
    /// through `poll_events`.
    pub fn load_neural_model(&mut self, path: &Path) {
        self.modules.amp.model = AmpModel::Neural;
        self.modules.amp.neural = NeuralState::Loading;
        ModelLoader::spawn(path.to_path_buf(), self.generation, self.tx_model.clone());
        info!("loading neural amp model from {}", path.display());
        self.publish_status();
    }

    /// Select the amp sub-mode directly. Switching to neural without a
    /// loaded model realizes classic stages until a model is loaded.
    pub fn set_amp_model(&mut self, model: AmpModel) {
        if self.modules.amp.model == model {
            return;
        }
        self.modules.amp.model = model;
        if self.running {
            self.rebuild();
        }
        self.publish_status();
    }

    /// Select a WAV cabinet impulse response by catalog name. The load
    /// runs off-thread; until it lands the cabinet contributes no
    /// stages, and a rebuild fires when it becomes ready.
    pub fn select_cabinet_ir(&mut self, name: &str) -> Result<(), EngineError> {
        let Some(path) = self.ir_loader.path_of(name) else {
            return Err(EngineError::AssetLoadFailed(format!(
                "impulse response '{name}' not found"
            )));
        };

        self.modules.cabinet.ir = IrSelection::Loading;
        let tx = self.tx_ir.clone();
        let generation = self.generation;
        let rate = self.sample_rate as usize;
        thread::Builder::new()
            .name("ir-loader".into())
            .spawn(move || {
                let result = load_ir_file(&path, rate);
                let _ = tx.send(IrLoaded { generation, result });
            })
            .expect("failed to spawn IR loader thread");

        if self.running {
            self.rebuild();
        }
        self.publish_status();
        Ok(())
    }

    /// Revert the cabinet to the built-in impulse response.
    pub fn reset_cabinet_ir(&mut self) {
        self.modules.cabinet.ir = IrSelection::Default;
        if self.running {
            self.rebuild();
        }
        self.publish_status();
    }

    /// Drain completed asset loads and retired structures. Returns the
    /// number of asset events handled. Call this from the control loop;
    /// nothing here blocks.
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;

        while let Ok(loaded) = self.rx_model.try_recv() {
            handled += 1;
            if loaded.generation != self.generation {
                debug!("dropping stale model load (generation {})", loaded.generation);
                continue;
            }
            match loaded.result {
                Ok(network) => {
                    info!("neural amp model ready (hidden_size {})", network.hidden_size);
                    self.modules.amp.neural = NeuralState::Ready(network);
                    if self.running {
                        self.rebuild();
                    }
                }
                Err(e) => {
                    warn!("neural amp model unavailable, staying classic: {e}");
                    self.modules.amp.neural = NeuralState::Failed(e.to_string());
                }
            }
        }

        while let Ok(loaded) = self.rx_ir.try_recv() {
            handled += 1;
            if loaded.generation != self.generation {
                debug!("dropping stale IR load (generation {})", loaded.generation);
                continue;
            }
            match loaded.result {
                Ok(samples) => {
                    info!("cabinet impulse response ready ({} samples)", samples.len());
                    self.modules.cabinet.ir = IrSelection::Custom(Arc::new(samples));
                    if self.running {
                        self.rebuild();
                    }
                }
                Err(e) => {
                    warn!("cabinet IR load failed, reverting to built-in: {e}");
                    self.modules.cabinet.ir = IrSelection::Default;
                    if self.running {
                        self.rebuild();
                    }
                }
            }
        }

        self.reclaim();
        if handled > 0 {
            self.publish_status();
        }
        handled
    }

    /// Block the control thread until an asset event arrives or the
    /// timeout passes. Convenience for the CLI loop and tests.
    pub fn wait_events(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let handled = self.poll_events();
            if handled > 0 || Instant::now() >= deadline {
                return handled;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Free structures the audio side has displaced. Returns how many
    /// came back this call.
    pub fn reclaim(&mut self) -> usize {
        let mut count = 0;
        while let Ok(retired) = self.rx_retired.try_recv() {
            count += 1;
            match retired {
                Retired::Chain(chain) => debug!("reclaimed chain ({} stages)", chain.len()),
                Retired::Source(_) => debug!("reclaimed source"),
            }
        }
        count
    }

    /// Serialize current module state into a persistence record.
    pub fn snapshot(&self) -> Preset {
        let modules = ModuleKind::ALL
            .iter()
            .map(|&kind| ModuleRecord {
                module: kind.as_str().to_string(),
                enabled: self.modules.enabled(kind),
                params: Modules::specs(kind)
                    .iter()
                    .map(|spec| {
                        let value = self
                            .modules
                            .value(kind, spec.name)
                            .unwrap_or(spec.default);
                        (spec.name.to_string(), value)
                    })
                    .collect(),
            })
            .collect();

        Preset::new("current".to_string(), modules)
    }

    /// Reconstruct module state from a persistence record: declared
    /// defaults first, then overlay whatever the record carries,
    /// clamped to each parameter's range. Unknown modules or parameter
    /// names are logged and skipped, never fatal.
    pub fn apply_preset(&mut self, preset: &Preset) -> Result<(), EngineError> {
        for kind in ModuleKind::ALL {
            self.modules.reset_values(kind);
            // Modules absent from the record revert fully to defaults
            self.modules.set_enabled(kind, true);

            let Some(record) = preset.modules.iter().find(|r| r.module == kind.as_str()) else {
                continue;
            };
            self.modules.set_enabled(kind, record.enabled);
            for (name, &value) in &record.params {
                let Some(spec) = Modules::spec(kind, name) else {
                    warn!("preset '{}': unknown parameter {kind}.{name}", preset.name);
                    continue;
                };
                if !value.is_finite() {
                    warn!("preset '{}': non-finite value for {kind}.{name}", preset.name);
                    continue;
                }
                self.modules.set_value(kind, name, value.clamp(spec.min, spec.max));
            }
        }

        for record in &preset.modules {
            if ModuleKind::from_name(&record.module).is_none() {
                warn!("preset '{}': unknown module '{}'", preset.name, record.module);
            }
        }

        if self.running {
            self.rebuild();
        }
        self.publish_status();
        Ok(())
    }

    pub fn parameter_specs(kind: ModuleKind) -> &'static [ParamSpec] {
        Modules::specs(kind)
    }

    pub fn available_irs(&self) -> Vec<String> {
        self.ir_loader.available_ir_names()
    }

    pub fn status_handle(&self) -> StatusHandle {
        StatusHandle::new(Arc::clone(&self.status))
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    fn realize_source(&self, source: &SourceConfig) -> Result<SourceState, EngineError> {
        match source {
            SourceConfig::LiveInput => Ok(SourceState::Live),
            SourceConfig::LoopFile(path) => {
                let player = LoopPlayer::load(path, self.sample_rate as u32)
                    .map_err(|e| EngineError::AssetLoadFailed(e.to_string()))?;
                Ok(SourceState::Loop(player))
            }
        }
    }

    /// Build a complete chain off the audio path and ship it over. The
    /// displaced chain comes back on the retirement channel.
    fn rebuild(&mut self) {
        let chain = build_chain(&self.modules, self.bypass, self.sample_rate);
        self.last_layout = chain.layout();
        debug!("chain rebuilt: {} stages", chain.len());
        self.send(RtMessage::SetChain(Box::new(chain)));
    }

    /// Never blocks; the queue is deep enough that overflow means the
    /// audio side has stopped draining, which is worth shouting about.
    fn send(&self, message: RtMessage) {
        if let Err(e) = self.tx_rt.try_send(message) {
            error!("failed to send message to audio context: {e}");
        }
    }

    fn publish_status(&self) {
        let modules = ModuleKind::ALL
            .iter()
            .map(|&kind| ModuleStatus {
                module: kind,
                enabled: self.modules.enabled(kind),
                params: Modules::specs(kind)
                    .iter()
                    .map(|spec| {
                        let value = self
                            .modules
                            .value(kind, spec.name)
                            .unwrap_or(spec.default);
                        (spec.name, value)
                    })
                    .collect(),
            })
            .collect();

        let neural = match &self.modules.amp.neural {
            NeuralState::Idle => NeuralStatus::Idle,
            NeuralState::Loading => NeuralStatus::Loading,
            NeuralState::Ready(_) => NeuralStatus::Ready,
            NeuralState::Failed(e) => NeuralStatus::Failed(e.clone()),
        };

        self.status.store(Arc::new(EngineStatus {
            running: self.running,
            bypass: self.bypass,
            source: self.source.clone(),
            amp_model: self.modules.amp.effective_model(),
            neural,
            modules,
            chain_layout: self.last_layout.clone(),
        }));
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}
