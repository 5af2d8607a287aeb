use crate::chain::stages::StageKind;
use crate::module::{ParamSpec, ParamTarget, StageOwner};

/// Reverb pedal sitting ahead of the amp. One stage, two parameters.
pub struct PedalModule {
    pub enabled: bool,
    pub mix: f32,
    pub room_size: f32,
}

impl PedalModule {
    pub const SPECS: &'static [ParamSpec] = &[
        ParamSpec::new(
            "mix",
            0.0,
            1.0,
            0.01,
            0.8,
            ParamTarget {
                owner: StageOwner::Pedal,
                kind: StageKind::Reverb,
                nth: 0,
                param: "wet",
            },
        ),
        ParamSpec::new(
            "room_size",
            0.1,
            1.0,
            0.01,
            0.9,
            ParamTarget {
                owner: StageOwner::Pedal,
                kind: StageKind::Reverb,
                nth: 0,
                param: "room_size",
            },
        ),
    ];

    pub fn set_value(&mut self, name: &str, value: f32) -> bool {
        match name {
            "mix" => self.mix = value,
            "room_size" => self.room_size = value,
            _ => return false,
        }
        true
    }

    pub fn value(&self, name: &str) -> Option<f32> {
        match name {
            "mix" => Some(self.mix),
            "room_size" => Some(self.room_size),
            _ => None,
        }
    }
}

impl Default for PedalModule {
    fn default() -> Self {
        Self {
            enabled: true,
            mix: 0.8,
            room_size: 0.9,
        }
    }
}
