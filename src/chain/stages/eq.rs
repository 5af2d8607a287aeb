use std::f32::consts::PI;

use crate::chain::stages::gain::db_to_lin;
use crate::chain::stages::{Stage, StageKind};

const LOW_CROSSOVER_HZ: f32 = 400.0;
const HIGH_CROSSOVER_HZ: f32 = 2500.0;

/// Three-band tone section: the signal is split at 400 Hz and 2.5 kHz
/// with one-pole crossovers, each band scaled by its own dB gain, then
/// summed. Complementary band extraction (mid = input − low − high)
/// keeps the recombined signal flat when all gains sit at 0 dB.
pub struct ThreeBandEqStage {
    bass_db: f32,
    mid_db: f32,
    treble_db: f32,

    low_gain: f32,
    mid_gain: f32,
    high_gain: f32,

    low_alpha: f32,
    high_alpha: f32,
    low_lp: f32,
    high_lp: f32,
}

impl ThreeBandEqStage {
    pub fn new(bass_db: f32, mid_db: f32, treble_db: f32, sample_rate: f32) -> Self {
        let dt = 1.0 / sample_rate;
        let alpha = |f: f32| dt / (dt + 1.0 / (2.0 * PI * f));

        Self {
            bass_db,
            mid_db,
            treble_db,
            low_gain: db_to_lin(bass_db),
            mid_gain: db_to_lin(mid_db),
            high_gain: db_to_lin(treble_db),
            low_alpha: alpha(LOW_CROSSOVER_HZ),
            high_alpha: alpha(HIGH_CROSSOVER_HZ),
            low_lp: 0.0,
            high_lp: 0.0,
        }
    }
}

impl Stage for ThreeBandEqStage {
    fn process(&mut self, input: f32) -> f32 {
        // Low band: one-pole lowpass at the low crossover
        self.low_lp += self.low_alpha * (input - self.low_lp);
        let low = self.low_lp;

        // High band: input minus a one-pole lowpass at the high crossover
        self.high_lp += self.high_alpha * (input - self.high_lp);
        let high = input - self.high_lp;

        // Mid band is whatever the other two didn't claim
        let mid = input - low - high;

        self.low_gain
            .mul_add(low, self.mid_gain.mul_add(mid, self.high_gain * high))
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        if !(-24.0..=24.0).contains(&value) {
            return Err("Band gain must be between -24dB and 24dB");
        }
        match name {
            "bass" => {
                self.bass_db = value;
                self.low_gain = db_to_lin(value);
            }
            "mid" => {
                self.mid_db = value;
                self.mid_gain = db_to_lin(value);
            }
            "treble" => {
                self.treble_db = value;
                self.high_gain = db_to_lin(value);
            }
            _ => return Err("Unknown parameter"),
        }
        Ok(())
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "bass" => Ok(self.bass_db),
            "mid" => Ok(self.mid_db),
            "treble" => Ok(self.treble_db),
            _ => Err("Unknown parameter"),
        }
    }

    fn kind(&self) -> StageKind {
        StageKind::Eq
    }
}
