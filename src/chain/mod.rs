pub mod stages;

use crate::chain::stages::convolver::ConvolverStage;
use crate::chain::stages::eq::ThreeBandEqStage;
use crate::chain::stages::filter::{FilterStage, FilterType};
use crate::chain::stages::gain::GainStage;
use crate::chain::stages::inference::InferenceStage;
use crate::chain::stages::reverb::ReverbStage;
use crate::chain::stages::waveshaper::WaveshaperStage;
use crate::chain::stages::{Stage, StageKind};
use crate::ir;
use crate::module::cabinet::{FILTER_Q, PRESENCE_HZ};
use crate::module::{AmpModel, IrSelection, Modules, StageOwner};

/// Fixed room size of the closing master reverb.
const MASTER_REVERB_ROOM: f32 = 0.7;

pub struct ChainStage {
    pub owner: StageOwner,
    pub stage: Box<dyn Stage>,
}

/// The realized signal path: an ordered sequence of stages from source
/// to output. Chains are built whole and swapped whole; nothing ever
/// splices a live chain.
pub struct Chain {
    stages: Vec<ChainStage>,
}

impl Chain {
    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let mut signal = input;
        for entry in &mut self.stages {
            signal = entry.stage.process(signal);
        }
        signal
    }

    // process_block processes a block of samples through the entire chain.
    pub fn process_block(&mut self, input: &mut [f32]) {
        for entry in &mut self.stages {
            entry.stage.process_block(input);
        }
    }

    /// Route a parameter update to the `nth` stage of `kind` owned by
    /// `owner`. Returns false when no such stage is realized right now
    /// (disabled module, neural sub-mode, bypass); the value still lives
    /// in the module state and lands on the next rebuild.
    pub fn apply_parameter(
        &mut self,
        owner: StageOwner,
        kind: StageKind,
        nth: usize,
        name: &str,
        value: f32,
    ) -> bool {
        let mut seen = 0;
        for entry in &mut self.stages {
            if entry.owner == owner && entry.stage.kind() == kind {
                if seen == nth {
                    return entry.stage.set_parameter(name, value).is_ok();
                }
                seen += 1;
            }
        }
        false
    }

    /// Structural fingerprint of the chain, for status reporting and
    /// structural comparison in tests.
    pub fn layout(&self) -> Vec<(StageOwner, StageKind)> {
        self.stages
            .iter()
            .map(|entry| (entry.owner, entry.stage.kind()))
            .collect()
    }
}

/// Compute the chain for the current module flags and mode. Pure over
/// its inputs: same flags and parameter values produce a structurally
/// identical chain. All allocation happens here, in the control
/// context, never in the audio callback.
pub fn build_chain(modules: &Modules, bypass: bool, sample_rate: f32) -> Chain {
    // Direct mode: source straight to output, zero processing stages.
    if bypass {
        return Chain::empty();
    }

    let mut stages: Vec<ChainStage> = Vec::new();
    let mut push = |owner: StageOwner, stage: Box<dyn Stage>| {
        stages.push(ChainStage { owner, stage });
    };

    if modules.pedal.enabled {
        push(
            StageOwner::Pedal,
            Box::new(ReverbStage::new(
                modules.pedal.mix,
                modules.pedal.room_size,
                sample_rate,
            )),
        );
    }

    if modules.amp.enabled {
        match modules.amp.effective_model() {
            AmpModel::Neural => {
                // effective_model guarantees the network is loaded
                if let Some(network) = modules.amp.network() {
                    push(
                        StageOwner::Amp,
                        Box::new(InferenceStage::new(network.clone())),
                    );
                }
            }
            AmpModel::Classic => {
                push(
                    StageOwner::Amp,
                    Box::new(WaveshaperStage::new(modules.amp.drive)),
                );
                push(
                    StageOwner::Amp,
                    Box::new(ThreeBandEqStage::new(
                        modules.amp.bass,
                        modules.amp.mid,
                        modules.amp.treble,
                        sample_rate,
                    )),
                );
            }
        }
    }

    // A cabinet whose impulse response is still loading contributes
    // nothing; the engine rebuilds once the asset lands.
    if modules.cabinet.enabled && modules.cabinet.ir_ready() {
        let cab = &modules.cabinet;
        push(
            StageOwner::Cabinet,
            Box::new(FilterStage::new(
                FilterType::Highpass,
                cab.low_cut,
                FILTER_Q,
                sample_rate,
            )),
        );
        let convolver = match &cab.ir {
            IrSelection::Custom(samples) => ConvolverStage::new(samples),
            _ => ConvolverStage::new(&ir::procedural_ir(sample_rate)),
        };
        push(StageOwner::Cabinet, Box::new(convolver));
        push(
            StageOwner::Cabinet,
            Box::new(FilterStage::new(
                FilterType::Lowpass,
                cab.high_cut,
                FILTER_Q,
                sample_rate,
            )),
        );
        push(
            StageOwner::Cabinet,
            Box::new(FilterStage::peaking(
                PRESENCE_HZ,
                FILTER_Q,
                cab.presence,
                sample_rate,
            )),
        );
    }

    // Fixed closing sequence: master reverb into output volume.
    push(
        StageOwner::Master,
        Box::new(ReverbStage::new(
            modules.amp.reverb,
            MASTER_REVERB_ROOM,
            sample_rate,
        )),
    );
    push(
        StageOwner::Master,
        Box::new(GainStage::volume_db(modules.amp.volume)),
    );

    Chain { stages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleKind;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn kinds(chain: &Chain) -> Vec<StageKind> {
        chain.layout().into_iter().map(|(_, kind)| kind).collect()
    }

    #[test]
    fn full_chain_layout_in_signal_order() {
        let modules = Modules::new();
        let chain = build_chain(&modules, false, SAMPLE_RATE);
        assert_eq!(
            kinds(&chain),
            vec![
                StageKind::Reverb,     // pedal
                StageKind::Waveshaper, // amp
                StageKind::Eq,
                StageKind::Filter, // cabinet highpass
                StageKind::Convolver,
                StageKind::Filter, // cabinet lowpass
                StageKind::Filter, // cabinet presence
                StageKind::Reverb, // master
                StageKind::Output,
            ]
        );
    }

    #[test]
    fn bypass_is_empty() {
        let modules = Modules::new();
        let chain = build_chain(&modules, true, SAMPLE_RATE);
        assert!(chain.is_empty());
    }

    #[test]
    fn disabled_modules_contribute_nothing() {
        let mut modules = Modules::new();
        modules.set_enabled(ModuleKind::Pedal, false);
        modules.set_enabled(ModuleKind::Cabinet, false);
        let chain = build_chain(&modules, false, SAMPLE_RATE);
        assert_eq!(
            kinds(&chain),
            vec![
                StageKind::Waveshaper,
                StageKind::Eq,
                StageKind::Reverb,
                StageKind::Output,
            ]
        );
    }

    #[test]
    fn closing_stages_survive_amp_disable() {
        let mut modules = Modules::new();
        modules.set_enabled(ModuleKind::Pedal, false);
        modules.set_enabled(ModuleKind::Amp, false);
        modules.set_enabled(ModuleKind::Cabinet, false);
        let chain = build_chain(&modules, false, SAMPLE_RATE);
        assert_eq!(kinds(&chain), vec![StageKind::Reverb, StageKind::Output]);
    }

    #[test]
    fn loading_cabinet_ir_skips_the_module() {
        let mut modules = Modules::new();
        modules.set_enabled(ModuleKind::Pedal, false);
        modules.cabinet.ir = IrSelection::Loading;
        let chain = build_chain(&modules, false, SAMPLE_RATE);
        assert_eq!(
            kinds(&chain),
            vec![
                StageKind::Waveshaper,
                StageKind::Eq,
                StageKind::Reverb,
                StageKind::Output,
            ]
        );
    }

    #[test]
    fn rebuild_is_structurally_deterministic() {
        let modules = Modules::new();
        let a = build_chain(&modules, false, SAMPLE_RATE);
        let b = build_chain(&modules, false, SAMPLE_RATE);
        assert_eq!(a.layout(), b.layout());
    }

    #[test]
    fn apply_parameter_hits_the_right_filter_slot() {
        let mut modules = Modules::new();
        modules.set_enabled(ModuleKind::Pedal, false);
        let mut chain = build_chain(&modules, false, SAMPLE_RATE);

        // nth=1 is the cabinet lowpass
        assert!(chain.apply_parameter(StageOwner::Cabinet, StageKind::Filter, 1, "frequency", 4000.0));

        // A filter that is not peaking refuses gain_db; slot 2 accepts it
        assert!(!chain.apply_parameter(StageOwner::Cabinet, StageKind::Filter, 1, "gain_db", 3.0));
        assert!(chain.apply_parameter(StageOwner::Cabinet, StageKind::Filter, 2, "gain_db", 3.0));
    }

    #[test]
    fn apply_parameter_misses_unrealized_stages() {
        let mut modules = Modules::new();
        modules.set_enabled(ModuleKind::Amp, false);
        let mut chain = build_chain(&modules, false, SAMPLE_RATE);
        assert!(!chain.apply_parameter(StageOwner::Amp, StageKind::Waveshaper, 0, "drive", 0.5));
        // Master stages are still reachable
        assert!(chain.apply_parameter(StageOwner::Master, StageKind::Output, 0, "volume", -12.0));
    }

    #[test]
    fn chain_passes_signal() {
        let modules = Modules::new();
        let mut chain = build_chain(&modules, false, SAMPLE_RATE);
        let mut buf: Vec<f32> = (0..4096).map(|i| ((i as f32) * 0.05).sin() * 0.3).collect();
        chain.process_block(&mut buf);
        assert!(buf.iter().all(|s| s.is_finite()));
        assert!(buf.iter().any(|s| s.abs() > 1e-6), "chain went silent");
    }
}
