use std::f32::consts::PI;

use crate::chain::stages::{Stage, StageKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FilterType {
    Highpass,
    Lowpass,
    Peaking,
}

impl std::fmt::Display for FilterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Highpass => write!(f, "highpass"),
            Self::Lowpass => write!(f, "lowpass"),
            Self::Peaking => write!(f, "peaking"),
        }
    }
}

/// Second-order IIR filter (RBJ cookbook coefficients), transposed
/// direct form II. Coefficients are recomputed whenever `frequency`,
/// `q` or `gain_db` changes; state carries across so live parameter
/// moves don't click.
pub struct FilterStage {
    filter_type: FilterType,
    frequency: f32,
    q: f32,
    gain_db: f32,
    sample_rate: f32,

    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    z1: f32,
    z2: f32,
}

impl FilterStage {
    /// Minimum cutoff to keep the frequency warp away from zero.
    const MIN_FREQUENCY_HZ: f32 = 10.0;

    pub fn new(filter_type: FilterType, frequency: f32, q: f32, sample_rate: f32) -> Self {
        let mut stage = Self {
            filter_type,
            frequency,
            q: q.max(0.1),
            gain_db: 0.0,
            sample_rate,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        stage.update_coefficients();
        stage
    }

    pub fn peaking(frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let mut stage = Self::new(FilterType::Peaking, frequency, q, sample_rate);
        stage.gain_db = gain_db;
        stage.update_coefficients();
        stage
    }

    fn update_coefficients(&mut self) {
        let freq = self
            .frequency
            .clamp(Self::MIN_FREQUENCY_HZ, self.sample_rate * 0.49);
        let w0 = 2.0 * PI * freq / self.sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * self.q);

        let (b0, b1, b2, a0, a1, a2) = match self.filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                let b0 = b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Highpass => {
                let b1 = -(1.0 + cos_w0);
                let b0 = -b1 / 2.0;
                (b0, b1, b0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
            }
            FilterType::Peaking => {
                let a = 10f32.powf(self.gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }
}

impl Stage for FilterStage {
    fn process(&mut self, input: f32) -> f32 {
        let output = self.b0.mul_add(input, self.z1);
        self.z1 = self.b1.mul_add(input, self.a1.mul_add(-output, self.z2));
        self.z2 = self.b2.mul_add(input, self.a2 * -output);
        output
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "frequency" => {
                if (0.0..=20000.0).contains(&value) {
                    self.frequency = value;
                    self.update_coefficients();
                    Ok(())
                } else {
                    Err("Frequency must be between 0Hz and 20kHz")
                }
            }
            "q" => {
                if (0.1..=10.0).contains(&value) {
                    self.q = value;
                    self.update_coefficients();
                    Ok(())
                } else {
                    Err("Q must be between 0.1 and 10")
                }
            }
            "gain_db" => {
                if self.filter_type != FilterType::Peaking {
                    Err("gain_db only applies to peaking filters")
                } else if (-24.0..=24.0).contains(&value) {
                    self.gain_db = value;
                    self.update_coefficients();
                    Ok(())
                } else {
                    Err("Gain must be between -24dB and 24dB")
                }
            }
            _ => Err("Unknown parameter"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "frequency" => Ok(self.frequency),
            "q" => Ok(self.q),
            "gain_db" if self.filter_type == FilterType::Peaking => Ok(self.gain_db),
            _ => Err("Unknown parameter"),
        }
    }

    fn kind(&self) -> StageKind {
        StageKind::Filter
    }
}
