use std::sync::Arc;

/// Weights for a single-layer LSTM amp model with a linear head.
///
/// The flat weight vector of a model file lays out, in order:
/// input weights (4H), recurrent weights (4H·H), gate biases (4H),
/// head weights (H), head bias (1). Gate order is input, forget,
/// cell, output. Weights are shared between chain rebuilds via `Arc`;
/// the per-instance recurrent state lives in the inference stage.
#[derive(Debug)]
pub struct LstmNetwork {
    pub hidden_size: usize,
    w_input: Vec<f32>,
    w_recurrent: Vec<f32>,
    bias: Vec<f32>,
    w_head: Vec<f32>,
    b_head: f32,
}

/// Mutable recurrent state for one realized inference stage.
pub struct LstmState {
    hidden: Vec<f32>,
    cell: Vec<f32>,
    gates: Vec<f32>,
}

impl LstmNetwork {
    pub const MAX_HIDDEN_SIZE: usize = 64;

    /// Number of weights a model with the given hidden size must carry.
    pub fn expected_len(hidden_size: usize) -> usize {
        4 * hidden_size + 4 * hidden_size * hidden_size + 4 * hidden_size + hidden_size + 1
    }

    /// Split a flat weight vector. The caller validates the length.
    pub fn from_weights(hidden_size: usize, weights: &[f32]) -> Self {
        debug_assert_eq!(weights.len(), Self::expected_len(hidden_size));
        let h4 = 4 * hidden_size;
        let mut offset = 0;
        let mut take = |n: usize| {
            let slice = weights[offset..offset + n].to_vec();
            offset += n;
            slice
        };

        let w_input = take(h4);
        let w_recurrent = take(h4 * hidden_size);
        let bias = take(h4);
        let w_head = take(hidden_size);
        let b_head = weights[offset];

        Self {
            hidden_size,
            w_input,
            w_recurrent,
            bias,
            w_head,
            b_head,
        }
    }

    pub fn new_state(&self) -> LstmState {
        LstmState {
            hidden: vec![0.0; self.hidden_size],
            cell: vec![0.0; self.hidden_size],
            gates: vec![0.0; 4 * self.hidden_size],
        }
    }

    /// One sample through the network. The model predicts the wet signal
    /// directly; no residual connection, matching the training setup.
    pub fn step(&self, state: &mut LstmState, input: f32) -> f32 {
        let h = self.hidden_size;

        // gates = W_in·x + W_rec·h + b
        for (i, gate) in state.gates.iter_mut().enumerate() {
            let mut acc = self.w_input[i].mul_add(input, self.bias[i]);
            let row = &self.w_recurrent[i * h..(i + 1) * h];
            for (w, prev) in row.iter().zip(state.hidden.iter()) {
                acc = w.mul_add(*prev, acc);
            }
            *gate = acc;
        }

        let mut output = self.b_head;
        for i in 0..h {
            let input_gate = sigmoid(state.gates[i]);
            let forget_gate = sigmoid(state.gates[h + i]);
            let cell_cand = state.gates[2 * h + i].tanh();
            let output_gate = sigmoid(state.gates[3 * h + i]);

            state.cell[i] = forget_gate.mul_add(state.cell[i], input_gate * cell_cand);
            state.hidden[i] = output_gate * state.cell[i].tanh();
            output = self.w_head[i].mul_add(state.hidden[i], output);
        }

        output
    }
}

pub type SharedNetwork = Arc<LstmNetwork>;

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_len_counts_all_tensors() {
        // H=2: 8 + 16 + 8 + 2 + 1
        assert_eq!(LstmNetwork::expected_len(2), 35);
    }

    #[test]
    fn zero_weights_produce_zero_output() {
        let h = 4;
        let weights = vec![0.0; LstmNetwork::expected_len(h)];
        let net = LstmNetwork::from_weights(h, &weights);
        let mut state = net.new_state();
        for _ in 0..64 {
            assert_eq!(net.step(&mut state, 0.5), 0.0);
        }
    }

    #[test]
    fn output_is_bounded_for_bounded_weights() {
        let h = 8;
        let len = LstmNetwork::expected_len(h);
        // Deterministic pseudo-weights in [-0.5, 0.5]
        let weights: Vec<f32> = (0..len)
            .map(|i| (((i * 2_654_435_761) % 1000) as f32 / 1000.0) - 0.5)
            .collect();
        let net = LstmNetwork::from_weights(h, &weights);
        let mut state = net.new_state();

        // cell is bounded by the gate structure, so the head output is
        // bounded by sum(|w_head|) + |b_head|
        let bound: f32 = net.w_head.iter().map(|w| w.abs()).sum::<f32>() + net.b_head.abs() + 1e-3;
        for i in 0..4096 {
            let x = ((i as f32) * 0.1).sin();
            let y = net.step(&mut state, x);
            assert!(y.is_finite());
            assert!(y.abs() <= bound, "output {y} exceeded bound {bound}");
        }
    }

    #[test]
    fn state_carries_memory() {
        let h = 4;
        let len = LstmNetwork::expected_len(h);
        let weights: Vec<f32> = (0..len).map(|i| ((i % 7) as f32 - 3.0) * 0.1).collect();
        let net = LstmNetwork::from_weights(h, &weights);

        // Same input, different history -> different output
        let mut fresh = net.new_state();
        let mut warmed = net.new_state();
        for _ in 0..32 {
            net.step(&mut warmed, 1.0);
        }
        let a = net.step(&mut fresh, 0.5);
        let b = net.step(&mut warmed, 0.5);
        assert!((a - b).abs() > 1e-6, "expected state to affect output");
    }
}
