use thiserror::Error;

use crate::module::ModuleKind;

/// Errors surfaced at the engine boundary.
///
/// Structural failures (`SourceUnavailable`, `AssetLoadFailed`) abort
/// the requested operation and leave the engine in its last-known-good
/// state. Parameter errors are local; the engine keeps running with its
/// prior chain. Neural model failures never appear here; they fall
/// back to the classic amp and are reported through the status snapshot.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("audio source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("asset load failed: {0}")]
    AssetLoadFailed(String),

    #[error("unknown parameter '{name}' for module '{module}'")]
    UnknownParameter { module: ModuleKind, name: String },

    #[error("value {value} is not valid for parameter '{name}'")]
    InvalidRange { name: String, value: f32 },
}
