use crate::chain::stages::{Stage, StageKind};
use crate::model::network::{LstmState, SharedNetwork};

/// Neural amp model stage. Weights are shared with the owning module
/// via `Arc`; the recurrent state is per-instance, so every chain
/// rebuild starts from a settled (zero) state rather than inheriting a
/// tail from the previous chain.
pub struct InferenceStage {
    network: SharedNetwork,
    state: LstmState,
}

impl InferenceStage {
    pub fn new(network: SharedNetwork) -> Self {
        let state = network.new_state();
        Self { network, state }
    }
}

impl Stage for InferenceStage {
    fn process(&mut self, input: f32) -> f32 {
        self.network.step(&mut self.state, input)
    }

    fn set_parameter(&mut self, _name: &str, _value: f32) -> Result<(), &'static str> {
        Err("Inference stage has no parameters")
    }

    fn get_parameter(&self, _name: &str) -> Result<f32, &'static str> {
        Err("Inference stage has no parameters")
    }

    fn kind(&self) -> StageKind {
        StageKind::Inference
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::network::LstmNetwork;
    use std::sync::Arc;

    fn test_network() -> SharedNetwork {
        let h = 4;
        let weights: Vec<f32> = (0..LstmNetwork::expected_len(h))
            .map(|i| ((i % 11) as f32 - 5.0) * 0.08)
            .collect();
        Arc::new(LstmNetwork::from_weights(h, &weights))
    }

    #[test]
    fn two_instances_from_one_network_are_independent() {
        let network = test_network();
        let mut a = InferenceStage::new(Arc::clone(&network));
        let mut b = InferenceStage::new(network);

        for _ in 0..100 {
            a.process(0.8);
        }
        // b has seen no signal; identical inputs now diverge
        let ya = a.process(0.5);
        let yb = b.process(0.5);
        assert!((ya - yb).abs() > 1e-6);
    }

    #[test]
    fn output_stays_finite() {
        let mut stage = InferenceStage::new(test_network());
        for i in 0..10_000 {
            let x = ((i as f32) * 0.02).sin();
            assert!(stage.process(x).is_finite());
        }
    }

    #[test]
    fn has_no_parameters() {
        let mut stage = InferenceStage::new(test_network());
        assert!(stage.set_parameter("drive", 0.5).is_err());
        assert_eq!(stage.kind(), StageKind::Inference);
    }
}
