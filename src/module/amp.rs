use crate::chain::stages::StageKind;
use crate::model::network::SharedNetwork;
use crate::module::{ParamSpec, ParamTarget, StageOwner};

/// Which processing the amp slot uses when realized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmpModel {
    /// Waveshaper drive into a three-band EQ.
    Classic,
    /// A loaded neural model replaces the classic pair.
    Neural,
}

impl std::fmt::Display for AmpModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::Neural => write!(f, "neural"),
        }
    }
}

/// Lifecycle of the neural model asset. Weights live here between
/// chain rebuilds; per-chain recurrent state does not.
#[derive(Default)]
pub enum NeuralState {
    #[default]
    Idle,
    Loading,
    Ready(SharedNetwork),
    Failed(String),
}

pub struct AmpModule {
    pub enabled: bool,
    /// Requested sub-mode; the realized chain may still be classic
    /// while a neural load is in flight or after it failed.
    pub model: AmpModel,
    pub neural: NeuralState,
    pub drive: f32,
    pub bass: f32,
    pub mid: f32,
    pub treble: f32,
    pub reverb: f32,
    pub volume: f32,
}

impl AmpModule {
    pub const SPECS: &'static [ParamSpec] = &[
        ParamSpec::new(
            "drive",
            0.0,
            1.0,
            0.01,
            0.4,
            ParamTarget {
                owner: StageOwner::Amp,
                kind: StageKind::Waveshaper,
                nth: 0,
                param: "drive",
            },
        ),
        ParamSpec::new(
            "bass",
            -12.0,
            12.0,
            0.5,
            0.0,
            ParamTarget {
                owner: StageOwner::Amp,
                kind: StageKind::Eq,
                nth: 0,
                param: "bass",
            },
        ),
        ParamSpec::new(
            "mid",
            -12.0,
            12.0,
            0.5,
            0.0,
            ParamTarget {
                owner: StageOwner::Amp,
                kind: StageKind::Eq,
                nth: 0,
                param: "mid",
            },
        ),
        ParamSpec::new(
            "treble",
            -12.0,
            12.0,
            0.5,
            0.0,
            ParamTarget {
                owner: StageOwner::Amp,
                kind: StageKind::Eq,
                nth: 0,
                param: "treble",
            },
        ),
        // The master reverb and output volume are fixed closing stages,
        // but their controls belong to the amp's parameter map, matching
        // the persisted record shape.
        ParamSpec::new(
            "reverb",
            0.0,
            1.0,
            0.01,
            0.3,
            ParamTarget {
                owner: StageOwner::Master,
                kind: StageKind::Reverb,
                nth: 0,
                param: "wet",
            },
        ),
        ParamSpec::new(
            "volume",
            -60.0,
            0.0,
            1.0,
            -6.0,
            ParamTarget {
                owner: StageOwner::Master,
                kind: StageKind::Output,
                nth: 0,
                param: "volume",
            },
        ),
    ];

    /// The model the chain builder realizes right now: neural only when
    /// requested and actually loaded, classic otherwise.
    pub fn effective_model(&self) -> AmpModel {
        match (self.model, &self.neural) {
            (AmpModel::Neural, NeuralState::Ready(_)) => AmpModel::Neural,
            _ => AmpModel::Classic,
        }
    }

    pub fn network(&self) -> Option<&SharedNetwork> {
        match &self.neural {
            NeuralState::Ready(network) => Some(network),
            _ => None,
        }
    }

    pub fn set_value(&mut self, name: &str, value: f32) -> bool {
        match name {
            "drive" => self.drive = value,
            "bass" => self.bass = value,
            "mid" => self.mid = value,
            "treble" => self.treble = value,
            "reverb" => self.reverb = value,
            "volume" => self.volume = value,
            _ => return false,
        }
        true
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        match name {
            "drive" => Some(self.drive),
            "bass" => Some(self.bass),
            "mid" => Some(self.mid),
            "treble" => Some(self.treble),
            "reverb" => Some(self.reverb),
            "volume" => Some(self.volume),
            _ => None,
        }
    }
}

impl Default for AmpModule {
    fn default() -> Self {
        Self {
            enabled: true,
            model: AmpModel::Classic,
            neural: NeuralState::Idle,
            drive: 0.4,
            bass: 0.0,
            mid: 0.0,
            treble: 0.0,
            reverb: 0.3,
            volume: -6.0,
        }
    }
}
