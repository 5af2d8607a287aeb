pub mod amp;
pub mod cabinet;
pub mod pedal;

pub use amp::{AmpModel, AmpModule, NeuralState};
pub use cabinet::{CabinetModule, IrSelection};
pub use pedal::PedalModule;

use crate::chain::stages::StageKind;

/// The three user-toggleable effect groups, in signal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Pedal,
    Amp,
    Cabinet,
}

impl ModuleKind {
    /// Declaration order; preset records apply in this order.
    pub const ALL: [Self; 3] = [Self::Pedal, Self::Amp, Self::Cabinet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pedal => "pedal",
            Self::Amp => "amp",
            Self::Cabinet => "cabinet",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "pedal" => Some(Self::Pedal),
            "amp" => Some(Self::Amp),
            "cabinet" => Some(Self::Cabinet),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a realized chain stage belongs to. `Master` marks the fixed
/// closing stages (reverb and output volume) that are present in every
/// processed chain regardless of module flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOwner {
    Pedal,
    Amp,
    Cabinet,
    Master,
}

impl From<ModuleKind> for StageOwner {
    fn from(kind: ModuleKind) -> Self {
        match kind {
            ModuleKind::Pedal => Self::Pedal,
            ModuleKind::Amp => Self::Amp,
            ModuleKind::Cabinet => Self::Cabinet,
        }
    }
}

impl std::fmt::Display for StageOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pedal => write!(f, "pedal"),
            Self::Amp => write!(f, "amp"),
            Self::Cabinet => write!(f, "cabinet"),
            Self::Master => write!(f, "master"),
        }
    }
}

/// Where a module parameter lands in a realized chain: the `nth` stage
/// of `kind` owned by `owner`, under the stage's own parameter name.
/// `nth` disambiguates the cabinet's three filter stages.
#[derive(Debug, Clone, Copy)]
pub struct ParamTarget {
    pub owner: StageOwner,
    pub kind: StageKind,
    pub nth: usize,
    pub param: &'static str,
}

/// A declared, range-bounded continuous parameter. Values set through
/// the engine are clamped to `[min, max]`; `step` is a UI hint only.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
    pub target: ParamTarget,
}

impl ParamSpec {
    pub const fn new(
        name: &'static str,
        min: f32,
        max: f32,
        step: f32,
        default: f32,
        target: ParamTarget,
    ) -> Self {
        Self {
            name,
            min,
            max,
            step,
            default,
            target,
        }
    }
}

/// All module state the engine owns: parameter values, enabled flags
/// and loaded assets. Holds no realized stages; those live only inside
/// chains, so a disabled module never keeps processing state alive.
pub struct Modules {
    pub pedal: PedalModule,
    pub amp: AmpModule,
    pub cabinet: CabinetModule,
}

impl Modules {
    pub fn new() -> Self {
        Self {
            pedal: PedalModule::default(),
            amp: AmpModule::default(),
            cabinet: CabinetModule::default(),
        }
    }

    pub fn specs(kind: ModuleKind) -> &'static [ParamSpec] {
        match kind {
            ModuleKind::Pedal => PedalModule::SPECS,
            ModuleKind::Amp => AmpModule::SPECS,
            ModuleKind::Cabinet => CabinetModule::SPECS,
        }
    }

    pub fn spec(kind: ModuleKind, name: &str) -> Option<&'static ParamSpec> {
        Self::specs(kind).iter().find(|s| s.name == name)
    }

    pub fn enabled(&self, kind: ModuleKind) -> bool {
        match kind {
            ModuleKind::Pedal => self.pedal.enabled,
            ModuleKind::Amp => self.amp.enabled,
            ModuleKind::Cabinet => self.cabinet.enabled,
        }
    }

    pub fn set_enabled(&mut self, kind: ModuleKind, enabled: bool) {
        match kind {
            ModuleKind::Pedal => self.pedal.enabled = enabled,
            ModuleKind::Amp => self.amp.enabled = enabled,
            ModuleKind::Cabinet => self.cabinet.enabled = enabled,
        }
    }

    /// Store a (already clamped) parameter value. Returns false when the
    /// name is not declared for the module.
    pub fn set_value(&mut self, kind: ModuleKind, name: &str, value: f32) -> bool {
        match kind {
            ModuleKind::Pedal => self.pedal.set_value(name, value),
            ModuleKind::Amp => self.amp.set_value(name, value),
            ModuleKind::Cabinet => self.cabinet.set_value(name, value),
        }
    }

    pub fn value(&self, kind: ModuleKind, name: &str) -> Option<f32> {
        match kind {
            ModuleKind::Pedal => self.pedal.value(name),
            ModuleKind::Amp => self.amp.value(name),
            ModuleKind::Cabinet => self.cabinet.value(name),
        }
    }

    /// Reset one module's parameters to their declared defaults.
    /// Enabled flags and loaded assets are left alone.
    pub fn reset_values(&mut self, kind: ModuleKind) {
        for spec in Self::specs(kind) {
            self.set_value(kind, spec.name, spec.default);
        }
    }
}

impl Default for Modules {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_lookup_by_name() {
        let spec = Modules::spec(ModuleKind::Amp, "drive").unwrap();
        assert_eq!(spec.min, 0.0);
        assert_eq!(spec.max, 1.0);
        assert!(Modules::spec(ModuleKind::Amp, "fuzz").is_none());
    }

    #[test]
    fn defaults_match_declared_specs() {
        let modules = Modules::new();
        for kind in ModuleKind::ALL {
            for spec in Modules::specs(kind) {
                assert_eq!(
                    modules.value(kind, spec.name),
                    Some(spec.default),
                    "{kind}.{} should start at its default",
                    spec.name
                );
            }
        }
    }

    #[test]
    fn set_value_round_trips() {
        let mut modules = Modules::new();
        assert!(modules.set_value(ModuleKind::Cabinet, "low_cut", 120.0));
        assert_eq!(modules.value(ModuleKind::Cabinet, "low_cut"), Some(120.0));
        assert!(!modules.set_value(ModuleKind::Cabinet, "sparkle", 1.0));
    }

    #[test]
    fn reset_restores_defaults() {
        let mut modules = Modules::new();
        modules.set_value(ModuleKind::Amp, "drive", 0.9);
        modules.reset_values(ModuleKind::Amp);
        assert_eq!(modules.value(ModuleKind::Amp, "drive"), Some(0.4));
    }

    #[test]
    fn module_names_round_trip() {
        for kind in ModuleKind::ALL {
            assert_eq!(ModuleKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ModuleKind::from_name("tuner"), None);
    }
}
