use log::warn;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

use crate::chain::stages::{Stage, StageKind};

const FFT_BLOCK_SIZE: usize = 512;
const PARTITION_SIZE: usize = FFT_BLOCK_SIZE / 2;
const MAX_PARTITIONS: usize = 64;

/// Uniform partitioned FFT convolution (overlap-save).
///
/// The impulse response is cut into 256-sample partitions whose spectra
/// are precomputed at construction, off the audio path. At run time one
/// forward FFT, a multiply-accumulate over the partition history, and
/// one inverse FFT happen per 256 samples; everything in `process` works
/// out of buffers allocated up front. Output is delayed by one partition.
///
/// The IR is energy-normalized at construction so the stage is roughly
/// unity-gain; tonal shaping around it belongs to the bracketing filter
/// stages, which is also where the cabinet's low/high-cut parameters
/// live. This stage itself has no parameters.
pub struct ConvolverStage {
    partitions: Vec<Vec<Complex<f32>>>,

    r2c: Arc<dyn RealToComplex<f32>>,
    c2r: Arc<dyn ComplexToReal<f32>>,
    r2c_scratch: Vec<Complex<f32>>,
    c2r_scratch: Vec<Complex<f32>>,

    // Time-domain window: [previous partition | partition being filled]
    window: Vec<f32>,
    fill: usize,

    // Frequency-domain input history ring, newest at hist_head
    history: Vec<Vec<Complex<f32>>>,
    hist_head: usize,

    // Scratch
    time_scratch: Vec<f32>,
    freq_scratch: Vec<Complex<f32>>,
    freq_accumulator: Vec<Complex<f32>>,

    // Convolution output for the partition currently being emitted
    out_block: Vec<f32>,
}

impl ConvolverStage {
    pub fn new(impulse_response: &[f32]) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(FFT_BLOCK_SIZE);
        let c2r = planner.plan_fft_inverse(FFT_BLOCK_SIZE);
        let r2c_scratch = r2c.make_scratch_vec();
        let c2r_scratch = c2r.make_scratch_vec();

        let partitions = Self::partition_ir(r2c.as_ref(), impulse_response);
        let bins = FFT_BLOCK_SIZE / 2 + 1;
        let history = vec![vec![Complex::new(0.0, 0.0); bins]; partitions.len().max(1)];

        Self {
            partitions,
            r2c,
            c2r,
            r2c_scratch,
            c2r_scratch,
            window: vec![0.0; FFT_BLOCK_SIZE],
            fill: 0,
            history,
            hist_head: 0,
            time_scratch: vec![0.0; FFT_BLOCK_SIZE],
            freq_scratch: vec![Complex::new(0.0, 0.0); bins],
            freq_accumulator: vec![Complex::new(0.0, 0.0); bins],
            out_block: vec![0.0; PARTITION_SIZE],
        }
    }

    fn partition_ir(r2c: &dyn RealToComplex<f32>, ir: &[f32]) -> Vec<Vec<Complex<f32>>> {
        let max_samples = MAX_PARTITIONS * PARTITION_SIZE;
        let ir = if ir.len() > max_samples {
            warn!(
                "impulse response truncated from {} to {} samples for performance",
                ir.len(),
                max_samples
            );
            &ir[..max_samples]
        } else {
            ir
        };

        // Energy normalization keeps the convolution near unity gain.
        let energy: f32 = ir.iter().map(|x| x * x).sum();
        let scale = if energy > 1e-12 {
            1.0 / energy.sqrt()
        } else {
            0.0
        };

        let num_partitions = ir.len().div_ceil(PARTITION_SIZE).max(1);
        let mut parts = Vec::with_capacity(num_partitions);
        let mut scratch = r2c.make_scratch_vec();

        for p in 0..num_partitions {
            let start = p * PARTITION_SIZE;
            let end = ((p + 1) * PARTITION_SIZE).min(ir.len());

            let mut time_block = vec![0.0f32; FFT_BLOCK_SIZE];
            for (slot, &sample) in time_block.iter_mut().zip(&ir[start..end]) {
                *slot = sample * scale;
            }

            let mut freq_block = vec![Complex::new(0.0, 0.0); FFT_BLOCK_SIZE / 2 + 1];
            r2c.process_with_scratch(&mut time_block, &mut freq_block, &mut scratch)
                .expect("realfft forward failed");
            parts.push(freq_block);
        }

        parts
    }

    fn compute_block(&mut self) {
        // FFT of [previous | current] partition pair
        self.time_scratch.copy_from_slice(&self.window);
        self.r2c
            .process_with_scratch(
                &mut self.time_scratch,
                &mut self.freq_scratch,
                &mut self.r2c_scratch,
            )
            .expect("realfft forward failed");

        self.history[self.hist_head].copy_from_slice(&self.freq_scratch);

        self.freq_accumulator.fill(Complex::new(0.0, 0.0));
        let hist_len = self.history.len();
        for (j, partition) in self.partitions.iter().enumerate() {
            let x = &self.history[(self.hist_head + hist_len - j) % hist_len];
            for (acc, (xv, hv)) in self
                .freq_accumulator
                .iter_mut()
                .zip(x.iter().zip(partition.iter()))
            {
                let prod = *xv * *hv;
                *acc += Complex::new(zap_denormal(prod.re), zap_denormal(prod.im));
            }
        }
        self.hist_head = (self.hist_head + 1) % hist_len;

        self.freq_accumulator[0].im = 0.0;
        if let Some(last) = self.freq_accumulator.last_mut() {
            last.im = 0.0;
        }

        self.c2r
            .process_with_scratch(
                &mut self.freq_accumulator,
                &mut self.time_scratch,
                &mut self.c2r_scratch,
            )
            .expect("realfft inverse failed");

        // Overlap-save: the first half is circular wraparound, discard it
        let norm = 1.0 / FFT_BLOCK_SIZE as f32;
        for (out, &raw) in self
            .out_block
            .iter_mut()
            .zip(&self.time_scratch[PARTITION_SIZE..])
        {
            *out = zap_denormal(raw * norm);
        }

        // Current partition becomes the previous one
        self.window.copy_within(PARTITION_SIZE.., 0);
    }
}

impl Stage for ConvolverStage {
    fn process(&mut self, input: f32) -> f32 {
        self.window[PARTITION_SIZE + self.fill] = input;
        let out = self.out_block[self.fill];
        self.fill += 1;
        if self.fill == PARTITION_SIZE {
            self.fill = 0;
            self.compute_block();
        }
        out
    }

    fn set_parameter(&mut self, _name: &str, _value: f32) -> Result<(), &'static str> {
        Err("Convolver has no parameters")
    }

    fn get_parameter(&self, _name: &str) -> Result<f32, &'static str> {
        Err("Convolver has no parameters")
    }

    fn kind(&self) -> StageKind {
        StageKind::Convolver
    }
}

#[inline]
fn zap_denormal(x: f32) -> f32 {
    if x.abs() < 1.0e-30 { 0.0 } else { x }
}
