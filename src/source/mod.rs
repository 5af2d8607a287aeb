use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

use crate::ir::loader::{read_wav_mono, resample};

/// What the engine should use as its signal origin. Acquisition happens
/// in the control context; the realized `SourceState` is what the audio
/// callback consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Frames arrive from the live input the audio backend provides.
    LiveInput,
    /// A WAV file decoded up front and played on repeat.
    LoopFile(PathBuf),
}

impl std::fmt::Display for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LiveInput => write!(f, "live input"),
            Self::LoopFile(path) => write!(f, "loop:{}", path.display()),
        }
    }
}

/// Realized source. Exactly one exists on the audio side at a time;
/// switching ships a new one over the message channel and retires the
/// old one back to the control context.
pub enum SourceState {
    Live,
    Loop(LoopPlayer),
}

impl SourceState {
    /// Produce one buffer of source frames. For live input this copies
    /// the backend's input buffer; for loop playback it reads from the
    /// decoded samples, wrapping as needed.
    pub fn fill(&mut self, live_input: &[f32], output: &mut [f32]) {
        match self {
            Self::Live => {
                let frames = live_input.len().min(output.len());
                output[..frames].copy_from_slice(&live_input[..frames]);
                output[frames..].fill(0.0);
            }
            Self::Loop(player) => player.fill(output),
        }
    }
}

/// Looped playback of a fully decoded, rate-matched buffer. Decoding
/// and resampling happen at load; the audio-side `fill` is copies only.
pub struct LoopPlayer {
    samples: Vec<f32>,
    pos: usize,
}

impl LoopPlayer {
    pub fn load(path: &Path, target_sample_rate: u32) -> Result<Self> {
        let (mono, file_rate) = read_wav_mono(path)
            .with_context(|| format!("failed to decode loop file {}", path.display()))?;

        if mono.is_empty() {
            return Err(anyhow!("loop file {} contains no audio", path.display()));
        }

        let samples = if file_rate == target_sample_rate {
            mono
        } else {
            resample(&mono, file_rate, target_sample_rate)
                .context("failed to resample loop file")?
        };

        Ok(Self { samples, pos: 0 })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    fn fill(&mut self, output: &mut [f32]) {
        for slot in output.iter_mut() {
            *slot = self.samples[self.pos];
            self.pos += 1;
            if self.pos == self.samples.len() {
                self.pos = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_ramp_wav(path: &Path, sample_rate: u32, n: usize) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..n {
            writer.write_sample(i as f32 / n as f32).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn live_source_copies_input() {
        let mut source = SourceState::Live;
        let input = [0.1f32, 0.2, 0.3, 0.4];
        let mut output = [0.0f32; 4];
        source.fill(&input, &mut output);
        assert_eq!(output, input);
    }

    #[test]
    fn live_source_pads_short_input() {
        let mut source = SourceState::Live;
        let input = [0.5f32; 2];
        let mut output = [1.0f32; 4];
        source.fill(&input, &mut output);
        assert_eq!(output, [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn loop_player_wraps_around() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("loop.wav");
        write_ramp_wav(&path, 48_000, 6);

        let mut player = LoopPlayer::load(&path, 48_000).unwrap();
        assert_eq!(player.len(), 6);

        let mut output = [0.0f32; 9];
        player.fill(&mut output);
        // After 6 samples the ramp restarts
        assert!((output[6] - output[0]).abs() < 1e-6);
        assert!((output[7] - output[1]).abs() < 1e-6);
    }

    #[test]
    fn loop_player_resamples() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("loop.wav");
        write_ramp_wav(&path, 44_100, 4410);

        let player = LoopPlayer::load(&path, 48_000).unwrap();
        assert!(
            player.len() > 4600 && player.len() < 5000,
            "got {} samples",
            player.len()
        );
    }

    #[test]
    fn missing_file_errors() {
        let err = LoopPlayer::load(Path::new("/no/such/file.wav"), 48_000);
        assert!(err.is_err());
    }
}
