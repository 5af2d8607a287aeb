use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::chain::stages::StageKind;
use crate::module::{AmpModel, ModuleKind, StageOwner};
use crate::source::SourceConfig;

/// Neural model lifecycle as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeuralStatus {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ModuleStatus {
    pub module: ModuleKind,
    pub enabled: bool,
    pub params: Vec<(&'static str, f32)>,
}

/// Read-only snapshot of engine state, published on every control-side
/// change. UI code renders from this and never touches stage internals.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    pub running: bool,
    pub bypass: bool,
    pub source: SourceConfig,
    pub amp_model: AmpModel,
    pub neural: NeuralStatus,
    pub modules: Vec<ModuleStatus>,
    pub chain_layout: Vec<(StageOwner, StageKind)>,
}

impl Default for EngineStatus {
    fn default() -> Self {
        Self {
            running: false,
            bypass: false,
            source: SourceConfig::LiveInput,
            amp_model: AmpModel::Classic,
            neural: NeuralStatus::Idle,
            modules: Vec::new(),
            chain_layout: Vec::new(),
        }
    }
}

/// Cheap cloneable handle for readers; lock-free on both sides.
#[derive(Clone)]
pub struct StatusHandle {
    inner: Arc<ArcSwap<EngineStatus>>,
}

impl StatusHandle {
    pub fn new(inner: Arc<ArcSwap<EngineStatus>>) -> Self {
        Self { inner }
    }

    pub fn get(&self) -> EngineStatus {
        self.inner.load().as_ref().clone()
    }
}
