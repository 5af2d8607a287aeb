pub mod convolver;
pub mod eq;
pub mod filter;
pub mod gain;
pub mod inference;
pub mod reverb;
pub mod waveshaper;

/// Identifies what a stage does, independent of which module owns it.
/// Chain layouts are compared by these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Gain,
    Filter,
    Waveshaper,
    Eq,
    Convolver,
    Inference,
    Reverb,
    Output,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gain => write!(f, "gain"),
            Self::Filter => write!(f, "filter"),
            Self::Waveshaper => write!(f, "waveshaper"),
            Self::Eq => write!(f, "eq"),
            Self::Convolver => write!(f, "convolver"),
            Self::Inference => write!(f, "inference"),
            Self::Reverb => write!(f, "reverb"),
            Self::Output => write!(f, "output"),
        }
    }
}

// The core trait that all processing stages must implement
pub trait Stage: Send + Sync + 'static {
    // Process a single sample through this stage
    fn process(&mut self, input: f32) -> f32;

    // Process a block of samples through this stage
    fn process_block(&mut self, input: &mut [f32]) {
        for sample in input.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    // Set a parameter value by name
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str>;

    // Get a parameter value by name
    fn get_parameter(&self, name: &str) -> Result<f32, &'static str>;

    // What this stage does, for chain layout inspection
    fn kind(&self) -> StageKind;
}
