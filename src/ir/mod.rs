use std::f32::consts::PI;

pub mod loader;

pub use loader::IrLoader;

/// Built-in cabinet impulse response: 100 ms exponential decay with a
/// 100 Hz resonance component. Used whenever no WAV impulse response
/// has been selected, so an enabled cabinet always has a kernel ready.
pub fn procedural_ir(sample_rate: f32) -> Vec<f32> {
    let length = (sample_rate * 0.1) as usize;
    (0..length)
        .map(|i| {
            let decay = (-(i as f32) / (sample_rate * 0.05)).exp();
            let resonance = (i as f32 * 2.0 * PI * 100.0 / sample_rate).sin() * 0.3;
            (decay + resonance) * 0.1
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedural_ir_has_expected_length() {
        assert_eq!(procedural_ir(48_000.0).len(), 4800);
        assert_eq!(procedural_ir(44_100.0).len(), 4410);
    }

    #[test]
    fn procedural_ir_starts_strong_and_is_finite() {
        let ir = procedural_ir(48_000.0);
        assert!(ir[0] > 0.05);
        assert!(ir.iter().all(|s| s.is_finite()));
    }
}
