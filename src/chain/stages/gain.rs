use crate::chain::stages::{Stage, StageKind};

/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Lowest output volume before the stage is treated as fully muted.
pub const VOLUME_DB_MIN: f32 = -60.0;
pub const VOLUME_DB_MAX: f32 = 0.0;

enum GainUnit {
    /// Plain scalar multiply, parameter `level`.
    Linear,
    /// Master volume in decibels, parameter `volume`, clamped −60..0 dB.
    /// −60 dB mutes outright rather than leaving a residual signal.
    VolumeDb,
}

/// Scalar gain. Doubles as the chain's closing output-volume stage when
/// constructed with `volume_db`, where the parameter is expressed in dB.
pub struct GainStage {
    unit: GainUnit,
    value: f32,
    gain: f32,
}

impl GainStage {
    pub fn linear(level: f32) -> Self {
        Self {
            unit: GainUnit::Linear,
            value: level,
            gain: level,
        }
    }

    pub fn volume_db(db: f32) -> Self {
        let db = db.clamp(VOLUME_DB_MIN, VOLUME_DB_MAX);
        Self {
            unit: GainUnit::VolumeDb,
            value: db,
            gain: Self::db_gain(db),
        }
    }

    fn db_gain(db: f32) -> f32 {
        if db <= VOLUME_DB_MIN {
            0.0
        } else {
            db_to_lin(db)
        }
    }
}

impl Stage for GainStage {
    fn process(&mut self, input: f32) -> f32 {
        input * self.gain
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match (&self.unit, name) {
            (GainUnit::Linear, "level") => {
                if (0.0..=4.0).contains(&value) {
                    self.value = value;
                    self.gain = value;
                    Ok(())
                } else {
                    Err("Level must be between 0.0 and 4.0")
                }
            }
            (GainUnit::VolumeDb, "volume") => {
                if (VOLUME_DB_MIN..=VOLUME_DB_MAX).contains(&value) {
                    self.value = value;
                    self.gain = Self::db_gain(value);
                    Ok(())
                } else {
                    Err("Volume must be between -60dB and 0dB")
                }
            }
            _ => Err("Unknown parameter"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match (&self.unit, name) {
            (GainUnit::Linear, "level") | (GainUnit::VolumeDb, "volume") => Ok(self.value),
            _ => Err("Unknown parameter"),
        }
    }

    fn kind(&self) -> StageKind {
        match self.unit {
            GainUnit::Linear => StageKind::Gain,
            GainUnit::VolumeDb => StageKind::Output,
        }
    }
}
