use crate::chain::stages::{Stage, StageKind};

// Schroeder tail: comb delays are mutually prime at 44.1kHz and get
// rescaled to the engine rate at construction.
const COMB_TUNINGS: [usize; 4] = [1116, 1188, 1277, 1356];
const ALLPASS_TUNINGS: [usize; 2] = [556, 441];
const ALLPASS_FEEDBACK: f32 = 0.5;
const DAMP: f32 = 0.25;
const REFERENCE_RATE: f32 = 44_100.0;

struct Comb {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
    filter_state: f32,
}

impl Comb {
    fn new(len: usize, feedback: f32) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            pos: 0,
            feedback,
            filter_state: 0.0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let out = self.buffer[self.pos];
        // Damped feedback: lowpass in the loop darkens the tail over time
        self.filter_state += DAMP * (out - self.filter_state);
        self.buffer[self.pos] = self.feedback.mul_add(self.filter_state, input);
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }
}

struct Allpass {
    buffer: Vec<f32>,
    pos: usize,
}

impl Allpass {
    fn new(len: usize) -> Self {
        Self {
            buffer: vec![0.0; len.max(1)],
            pos: 0,
        }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.pos];
        let out = delayed - input;
        self.buffer[self.pos] = ALLPASS_FEEDBACK.mul_add(delayed, input);
        self.pos = (self.pos + 1) % self.buffer.len();
        out
    }
}

/// Wet/dry reverb: four parallel damped combs into two series allpasses.
///
/// `room_size` maps onto comb feedback, so moving it reshapes the decay
/// without touching any buffer, safe to change while audio is flowing.
/// Note on `wet`: values above ~0.8 leave the dry signal essentially
/// inaudible under the tail. Deliberately not clamped; the declared
/// range is the full 0..1 and the balance is the player's call.
pub struct ReverbStage {
    wet: f32,
    room_size: f32,
    combs: [Comb; 4],
    allpasses: [Allpass; 2],
}

impl ReverbStage {
    pub fn new(wet: f32, room_size: f32, sample_rate: f32) -> Self {
        let scale = sample_rate / REFERENCE_RATE;
        let room_size = room_size.clamp(0.1, 1.0);
        let feedback = Self::feedback_for(room_size);

        let comb_at = |i: usize| Comb::new((COMB_TUNINGS[i] as f32 * scale) as usize, feedback);
        let allpass_at = |i: usize| Allpass::new((ALLPASS_TUNINGS[i] as f32 * scale) as usize);

        Self {
            wet: wet.clamp(0.0, 1.0),
            room_size,
            combs: [comb_at(0), comb_at(1), comb_at(2), comb_at(3)],
            allpasses: [allpass_at(0), allpass_at(1)],
        }
    }

    // room_size 0.1..1.0 -> comb feedback 0.70..0.97
    fn feedback_for(room_size: f32) -> f32 {
        0.3f32.mul_add(room_size, 0.67)
    }
}

impl Stage for ReverbStage {
    fn process(&mut self, input: f32) -> f32 {
        let mut tail = 0.0;
        for comb in &mut self.combs {
            tail += comb.process(input);
        }
        tail *= 0.25;
        for allpass in &mut self.allpasses {
            tail = allpass.process(tail);
        }
        (1.0 - self.wet).mul_add(input, self.wet * tail)
    }

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "wet" => {
                if (0.0..=1.0).contains(&value) {
                    self.wet = value;
                    Ok(())
                } else {
                    Err("Wet must be between 0.0 and 1.0")
                }
            }
            "room_size" => {
                if (0.1..=1.0).contains(&value) {
                    self.room_size = value;
                    let feedback = Self::feedback_for(value);
                    for comb in &mut self.combs {
                        comb.feedback = feedback;
                    }
                    Ok(())
                } else {
                    Err("Room size must be between 0.1 and 1.0")
                }
            }
            _ => Err("Unknown parameter"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "wet" => Ok(self.wet),
            "room_size" => Ok(self.room_size),
            _ => Err("Unknown parameter"),
        }
    }

    fn kind(&self) -> StageKind {
        StageKind::Reverb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn dry_passthrough_at_zero_wet() {
        let mut reverb = ReverbStage::new(0.0, 0.7, SAMPLE_RATE);
        for i in 0..4096 {
            let input = (i as f32 * 0.01).sin() * 0.5;
            let out = reverb.process(input);
            assert!(
                (out - input).abs() < 1e-6,
                "expected dry passthrough at sample {i}"
            );
        }
    }

    #[test]
    fn impulse_produces_a_tail() {
        let mut reverb = ReverbStage::new(1.0, 0.9, SAMPLE_RATE);
        reverb.process(1.0);

        // Energy must still be arriving well after the impulse has passed.
        let mut late_energy = 0.0;
        for i in 1..SAMPLE_RATE as usize {
            let out = reverb.process(0.0);
            if i > 20_000 {
                late_energy += out.abs();
            }
        }
        assert!(late_energy > 0.01, "expected a decaying tail, got silence");
    }

    #[test]
    fn tail_decays() {
        let mut reverb = ReverbStage::new(1.0, 0.5, SAMPLE_RATE);
        reverb.process(1.0);

        let window = 4800;
        let mut early = 0.0;
        let mut late = 0.0;
        for i in 0..window * 10 {
            let out = reverb.process(0.0).abs();
            if i < window {
                early += out;
            } else if i >= window * 9 {
                late += out;
            }
        }
        assert!(
            late < early * 0.5,
            "tail should decay: early={early}, late={late}"
        );
    }

    #[test]
    fn larger_room_sustains_longer() {
        let tail_energy = |room: f32| {
            let mut reverb = ReverbStage::new(1.0, room, SAMPLE_RATE);
            reverb.process(1.0);
            let mut acc = 0.0;
            for i in 0..SAMPLE_RATE as usize {
                let out = reverb.process(0.0).abs();
                if i > 24_000 {
                    acc += out;
                }
            }
            acc
        };
        assert!(tail_energy(1.0) > tail_energy(0.2) * 2.0);
    }

    #[test]
    fn room_size_change_keeps_output_finite() {
        let mut reverb = ReverbStage::new(0.5, 0.3, SAMPLE_RATE);
        for i in 0..10_000 {
            if i == 5000 {
                reverb.set_parameter("room_size", 1.0).unwrap();
            }
            assert!(reverb.process(0.5).is_finite());
        }
    }

    #[test]
    fn parameter_validation() {
        let mut reverb = ReverbStage::new(0.5, 0.5, SAMPLE_RATE);
        assert!(reverb.set_parameter("wet", 1.5).is_err());
        assert!(reverb.set_parameter("room_size", 0.05).is_err());
        assert!(reverb.set_parameter("unknown", 0.0).is_err());
    }
}
