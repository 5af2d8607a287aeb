use anyhow::{Context, Result, anyhow};
use hound::WavReader;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

const MAX_IR_LENGTH_SECONDS: u64 = 5;

/// Decode a WAV file to mono f32 samples, averaging channels.
/// Returns the samples together with the file's sample rate.
pub fn read_wav_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let reader = WavReader::open(path)
        .with_context(|| format!("failed to open WAV file {}", path.display()))?;
    let spec = reader.spec();

    let samples: Vec<f32> = if spec.sample_format == hound::SampleFormat::Float {
        reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read float samples")?
    } else {
        let max_val = (1 << (spec.bits_per_sample - 1)) as f32;
        reader
            .into_samples::<i32>()
            .map(|s| s.map(|v| v as f32 / max_val))
            .collect::<Result<Vec<_>, _>>()
            .context("failed to read integer samples")?
    };

    let mono = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|c| c.iter().sum::<f32>() / spec.channels as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}

/// Load an impulse response: decode, resample to the engine rate and
/// peak-normalize to 0.9. Rejects IRs longer than a few seconds; those
/// are reverb tails, not cabinets, and would sink the convolver.
pub fn load_ir_file(path: &Path, target_sample_rate: usize) -> Result<Vec<f32>> {
    let (mono, file_rate) = read_wav_mono(path)?;

    if mono.len() as u64 > u64::from(file_rate) * MAX_IR_LENGTH_SECONDS {
        return Err(anyhow!(
            "impulse response too long: {:.1} seconds (max {})",
            mono.len() as f64 / f64::from(file_rate),
            MAX_IR_LENGTH_SECONDS
        ));
    }

    let mut resampled = if file_rate == target_sample_rate as u32 {
        mono
    } else {
        debug!(
            "resampling IR from {} Hz to {} Hz",
            file_rate, target_sample_rate
        );
        resample(&mono, file_rate, target_sample_rate as u32)?
    };

    let peak = resampled.iter().fold(0.0f32, |m, x| m.max(x.abs()));
    if peak > 0.0 {
        let g = 0.9 / peak;
        for s in &mut resampled {
            *s *= g;
        }
    }

    Ok(resampled)
}

/// Catalog of WAV impulse responses under a directory tree, addressed
/// by path relative to that directory.
pub struct IrLoader {
    available_ir_paths: Vec<(String, PathBuf)>,
    ir_directory: PathBuf,
    target_sample_rate: usize,
}

impl IrLoader {
    pub fn new(directory: &Path, target_sample_rate: usize) -> Result<Self> {
        let mut loader = Self {
            available_ir_paths: Vec::new(),
            ir_directory: directory.to_path_buf(),
            target_sample_rate,
        };

        loader.scan_ir_directory()?;

        Ok(loader)
    }

    pub fn load_by_name(&self, name: &str) -> Result<Vec<f32>> {
        let path = self
            .path_of(name)
            .ok_or_else(|| anyhow!("ir name '{}' not found", name))?;
        load_ir_file(&path, self.target_sample_rate)
    }

    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        self.available_ir_paths
            .iter()
            .find(|(ir_name, _)| ir_name == name)
            .map(|(_, path)| path.clone())
    }

    pub fn available_ir_names(&self) -> Vec<String> {
        self.available_ir_paths
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn scan_ir_directory(&mut self) -> Result<()> {
        if !self.ir_directory.exists() {
            fs::create_dir_all(&self.ir_directory).context("failed to create IR directory")?;
            warn!("IR directory created at {:?}", self.ir_directory);
            return Ok(());
        }

        self.available_ir_paths.clear();
        let base = self.ir_directory.clone();
        self.scan_recursive(&base, &base)?;

        // Shallow entries first, then lexicographic
        self.available_ir_paths.sort_by(|a, b| {
            let a_sep_count = a.0.matches('/').count();
            let b_sep_count = b.0.matches('/').count();
            a_sep_count.cmp(&b_sep_count).then_with(|| a.0.cmp(&b.0))
        });

        debug!(
            "found {} impulse response files",
            self.available_ir_paths.len()
        );
        Ok(())
    }

    fn scan_recursive(&mut self, current_dir: &Path, base_dir: &Path) -> Result<()> {
        for entry in fs::read_dir(current_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                self.scan_recursive(&path, base_dir)?;
            } else if path.extension().and_then(|s| s.to_str()) == Some("wav") {
                let relative_path = path
                    .strip_prefix(base_dir)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .replace('\\', "/");

                self.available_ir_paths.push((relative_path, path));
            }
        }
        Ok(())
    }
}

/// resample takes input samples at a given rate and returns them at the target rate
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, samples.len(), 1)?;

    let input = vec![samples.to_vec()];
    let output = resampler.process(&input, None)?;

    output
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("resampling produced no output"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, seconds: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let n = (sample_rate as f32 * seconds) as usize;
        for i in 0..n {
            let t = i as f32 / sample_rate as f32;
            let s = (t * 440.0 * std::f32::consts::TAU).sin() * 0.5;
            for _ in 0..channels {
                writer
                    .write_sample((s * f32::from(i16::MAX)) as i16)
                    .unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn scan_finds_wavs_recursively() -> Result<()> {
        let tmp = TempDir::new()?;
        let ir_dir = tmp.path().join("irs");
        std::fs::create_dir_all(ir_dir.join("nested"))?;

        std::fs::write(ir_dir.join("a.wav"), "")?;
        std::fs::write(ir_dir.join("nested").join("b.wav"), "")?;

        let loader = IrLoader::new(&ir_dir, 48_000)?;
        assert_eq!(loader.available_ir_names(), vec!["a.wav", "nested/b.wav"]);

        Ok(())
    }

    #[test]
    fn stereo_collapses_to_mono() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("stereo.wav");
        write_sine_wav(&path, 48_000, 2, 0.05);

        let (mono, rate) = read_wav_mono(&path)?;
        assert_eq!(rate, 48_000);
        assert_eq!(mono.len(), 2400);

        Ok(())
    }

    #[test]
    fn load_normalizes_peak() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("ir.wav");
        write_sine_wav(&path, 48_000, 1, 0.1);

        let loader = IrLoader::new(tmp.path(), 48_000)?;
        let ir = loader.load_by_name("ir.wav")?;
        let peak = ir.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        assert!((peak - 0.9).abs() < 1e-3, "expected 0.9 peak, got {peak}");

        Ok(())
    }

    #[test]
    fn load_resamples_off_rate_files() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("ir.wav");
        write_sine_wav(&path, 44_100, 1, 0.1);

        let loader = IrLoader::new(tmp.path(), 48_000)?;
        let ir = loader.load_by_name("ir.wav")?;
        // 0.1s of audio at the target rate, within resampler tolerance
        assert!(
            ir.len() > 4600 && ir.len() < 5000,
            "got {} samples",
            ir.len()
        );

        Ok(())
    }

    #[test]
    fn overlong_ir_is_rejected() -> Result<()> {
        let tmp = TempDir::new()?;
        let path = tmp.path().join("long.wav");
        write_sine_wav(&path, 8_000, 1, 6.0);

        assert!(load_ir_file(&path, 48_000).is_err());
        Ok(())
    }

    #[test]
    fn unknown_name_errors() -> Result<()> {
        let tmp = TempDir::new()?;
        let loader = IrLoader::new(tmp.path(), 48_000)?;
        assert!(loader.load_by_name("missing.wav").is_err());
        Ok(())
    }

    #[test]
    fn resample_halves_length() -> Result<()> {
        let input: Vec<f32> = (0..48_000).map(|x| (x as f32).sin()).collect();
        let output = resample(&input, 48_000, 24_000)?;

        // It's not guaranteed to be exactly half but it should be approximately
        assert!(output.len() > 23_000 && output.len() < 25_000);
        Ok(())
    }
}
