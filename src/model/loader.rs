use crossbeam::channel::Sender;
use log::{debug, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use thiserror::Error;

use crate::model::network::{LstmNetwork, SharedNetwork};

/// Why a neural amp model could not be turned into an inference stage.
/// None of these are fatal to a running engine; the amp falls back to
/// its classic stages.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("model asset not found: {}", .0.display())]
    AssetNotFound(PathBuf),
    #[error("malformed model asset: {0}")]
    MalformedAsset(String),
    #[error("unsupported model architecture '{0}'")]
    UnsupportedArchitecture(String),
    #[error("inference runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    architecture: String,
    config: ModelConfig,
    weights: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ModelConfig {
    hidden_size: usize,
}

const SUPPORTED_ARCHITECTURE: &str = "LSTM";

/// Parse and validate a model file, returning shareable network weights.
///
/// Blocking; callers that must not stall go through `ModelLoader::spawn`.
pub fn load_model(path: &Path) -> Result<SharedNetwork, LoadError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| LoadError::AssetNotFound(path.to_path_buf()))?;

    let file: ModelFile =
        serde_json::from_str(&raw).map_err(|e| LoadError::MalformedAsset(e.to_string()))?;

    if file.architecture != SUPPORTED_ARCHITECTURE {
        return Err(LoadError::UnsupportedArchitecture(file.architecture));
    }

    let hidden = file.config.hidden_size;
    if hidden == 0 || hidden > LstmNetwork::MAX_HIDDEN_SIZE {
        return Err(LoadError::MalformedAsset(format!(
            "hidden_size {hidden} outside 1..={}",
            LstmNetwork::MAX_HIDDEN_SIZE
        )));
    }

    let expected = LstmNetwork::expected_len(hidden);
    if file.weights.len() != expected {
        return Err(LoadError::MalformedAsset(format!(
            "expected {expected} weights for hidden_size {hidden}, found {}",
            file.weights.len()
        )));
    }
    if file.weights.iter().any(|w| !w.is_finite()) {
        return Err(LoadError::MalformedAsset(
            "weights contain non-finite values".into(),
        ));
    }

    let network = LstmNetwork::from_weights(hidden, &file.weights);
    self_test(&network)?;

    debug!(
        "loaded neural amp model from {} (hidden_size {hidden})",
        path.display()
    );
    Ok(Arc::new(network))
}

// A short silence-plus-tone buffer through the fresh network; if the
// backend can't produce finite samples here it never will.
fn self_test(network: &LstmNetwork) -> Result<(), LoadError> {
    let mut state = network.new_state();
    for i in 0..256 {
        let x = if i < 64 { 0.0 } else { (i as f32 * 0.05).sin() };
        let y = network.step(&mut state, x);
        if !y.is_finite() {
            return Err(LoadError::RuntimeUnavailable(
                "model produced non-finite output during self-test".into(),
            ));
        }
    }
    Ok(())
}

/// Outcome message delivered to the control context when a background
/// load finishes. Stale generations are dropped by the receiver.
pub struct ModelLoaded {
    pub generation: u64,
    pub result: Result<SharedNetwork, LoadError>,
}

pub struct ModelLoader;

impl ModelLoader {
    /// Load a model off-thread and report completion on `tx`.
    /// Send failure just means the engine is gone; nothing to do then.
    pub fn spawn(path: PathBuf, generation: u64, tx: Sender<ModelLoaded>) {
        thread::Builder::new()
            .name("model-loader".into())
            .spawn(move || {
                let result = load_model(&path);
                if let Err(ref e) = result {
                    warn!("model load failed for {}: {e}", path.display());
                }
                let _ = tx.send(ModelLoaded { generation, result });
            })
            .expect("failed to spawn model loader thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_model(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn valid_model_json(hidden: usize) -> String {
        let weights: Vec<String> = (0..LstmNetwork::expected_len(hidden))
            .map(|i| format!("{:.4}", ((i % 13) as f32 - 6.0) * 0.05))
            .collect();
        format!(
            r#"{{"architecture":"LSTM","config":{{"hidden_size":{hidden}}},"weights":[{}]}}"#,
            weights.join(",")
        )
    }

    #[test]
    fn loads_a_valid_model() {
        let dir = TempDir::new().unwrap();
        let path = write_model(&dir, "amp.json", &valid_model_json(8));
        let network = load_model(&path).unwrap();
        assert_eq!(network.hidden_size, 8);
    }

    #[test]
    fn missing_file_is_asset_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_model(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, LoadError::AssetNotFound(_)));
    }

    #[test]
    fn junk_json_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_model(&dir, "bad.json", "{not json");
        assert!(matches!(
            load_model(&path).unwrap_err(),
            LoadError::MalformedAsset(_)
        ));
    }

    #[test]
    fn wrong_weight_count_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_model(
            &dir,
            "short.json",
            r#"{"architecture":"LSTM","config":{"hidden_size":8},"weights":[0.1,0.2]}"#,
        );
        assert!(matches!(
            load_model(&path).unwrap_err(),
            LoadError::MalformedAsset(_)
        ));
    }

    #[test]
    fn unknown_architecture_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_model(
            &dir,
            "wavenet.json",
            r#"{"architecture":"WaveNet","config":{"hidden_size":8},"weights":[]}"#,
        );
        assert!(matches!(
            load_model(&path).unwrap_err(),
            LoadError::UnsupportedArchitecture(a) if a == "WaveNet"
        ));
    }

    #[test]
    fn oversized_hidden_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_model(
            &dir,
            "big.json",
            r#"{"architecture":"LSTM","config":{"hidden_size":1024},"weights":[]}"#,
        );
        assert!(matches!(
            load_model(&path).unwrap_err(),
            LoadError::MalformedAsset(_)
        ));
    }

    #[test]
    fn spawn_reports_on_channel() {
        let dir = TempDir::new().unwrap();
        let path = write_model(&dir, "amp.json", &valid_model_json(4));
        let (tx, rx) = crossbeam::channel::bounded(1);
        ModelLoader::spawn(path, 7, tx);
        let loaded = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("loader never reported");
        assert_eq!(loaded.generation, 7);
        assert!(loaded.result.is_ok());
    }
}
