use std::sync::Arc;

use crate::chain::stages::StageKind;
use crate::module::{ParamSpec, ParamTarget, StageOwner};

/// Which impulse response the cabinet's convolver uses.
///
/// `Loading` means a WAV impulse response is being fetched off-thread;
/// the chain builder skips the whole cabinet until it lands, and a
/// rebuild is triggered when it does.
#[derive(Default, Clone)]
pub enum IrSelection {
    /// The built-in procedurally generated cabinet response.
    #[default]
    Default,
    Custom(Arc<Vec<f32>>),
    Loading,
}

/// Speaker cabinet: highpass → convolver → lowpass → presence peak.
/// The low/high-cut parameters move the bracketing filters; the
/// impulse response itself is never edited in place.
pub struct CabinetModule {
    pub enabled: bool,
    pub low_cut: f32,
    pub high_cut: f32,
    pub presence: f32,
    pub ir: IrSelection,
}

/// Center frequency of the presence peaking filter.
pub const PRESENCE_HZ: f32 = 2000.0;
pub const FILTER_Q: f32 = 1.0;

impl CabinetModule {
    pub const SPECS: &'static [ParamSpec] = &[
        ParamSpec::new(
            "low_cut",
            20.0,
            200.0,
            1.0,
            80.0,
            ParamTarget {
                owner: StageOwner::Cabinet,
                kind: StageKind::Filter,
                nth: 0,
                param: "frequency",
            },
        ),
        ParamSpec::new(
            "high_cut",
            2000.0,
            20000.0,
            100.0,
            8000.0,
            ParamTarget {
                owner: StageOwner::Cabinet,
                kind: StageKind::Filter,
                nth: 1,
                param: "frequency",
            },
        ),
        ParamSpec::new(
            "presence",
            -12.0,
            12.0,
            0.5,
            0.0,
            ParamTarget {
                owner: StageOwner::Cabinet,
                kind: StageKind::Filter,
                nth: 2,
                param: "gain_db",
            },
        ),
    ];

    /// True when the cabinet can contribute stages to a chain.
    pub fn ir_ready(&self) -> bool {
        !matches!(self.ir, IrSelection::Loading)
    }

    pub fn set_value(&mut self, name: &str, value: f32) -> bool {
        match name {
            "low_cut" => self.low_cut = value,
            "high_cut" => self.high_cut = value,
            "presence" => self.presence = value,
            _ => return false,
        }
        true
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        match name {
            "low_cut" => Some(self.low_cut),
            "high_cut" => Some(self.high_cut),
            "presence" => Some(self.presence),
            _ => None,
        }
    }
}

impl Default for CabinetModule {
    fn default() -> Self {
        Self {
            enabled: true,
            low_cut: 80.0,
            high_cut: 8000.0,
            presence: 0.0,
            ir: IrSelection::Default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ir_states() {
        let mut cabinet = CabinetModule::default();
        assert!(cabinet.ir_ready());

        cabinet.ir = IrSelection::Loading;
        assert!(!cabinet.ir_ready());

        cabinet.ir = IrSelection::Custom(Arc::new(vec![1.0, 0.5]));
        assert!(cabinet.ir_ready());
    }

    #[test]
    fn filter_targets_are_distinct_slots() {
        let slots: Vec<usize> = CabinetModule::SPECS.iter().map(|s| s.target.nth).collect();
        assert_eq!(slots, vec![0, 1, 2]);
    }
}
