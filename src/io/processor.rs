use anyhow::{Context as _, Result};
use jack::{AudioIn, AudioOut, Client, Control, Frames, Port, ProcessScope};
use log::{debug, warn};

use crate::engine::RtProcessor;

pub struct AudioPorts {
    input: Port<AudioIn>,
    output_left: Port<AudioOut>,
    output_right: Port<AudioOut>,
}

impl AudioPorts {
    pub fn new(client: &Client) -> Result<Self> {
        Ok(Self {
            input: client
                .register_port("in_port", AudioIn::default())
                .context("failed to register in port")?,
            output_left: client
                .register_port("out_port_left", AudioOut::default())
                .context("failed to register out port left")?,
            output_right: client
                .register_port("out_port_right", AudioOut::default())
                .context("failed to register out port right")?,
        })
    }

    pub fn read_input<'a>(&'a self, ps: &'a ProcessScope) -> &'a [f32] {
        self.input.as_slice(ps)
    }

    /// Mono engine output duplicated to both sides.
    pub fn write_output(&mut self, ps: &ProcessScope, samples: &[f32]) {
        let output_size = ps.n_frames() as usize;
        let frame_count = samples.len().min(output_size);
        let out_left = self.output_left.as_mut_slice(ps);
        let out_right = self.output_right.as_mut_slice(ps);

        out_left[..frame_count].copy_from_slice(&samples[..frame_count]);
        out_right[..frame_count].copy_from_slice(&samples[..frame_count]);

        for i in frame_count..output_size {
            out_left[i] = 0.0;
            out_right[i] = 0.0;
        }
    }
}

/// Glue between the JACK callback and the engine's audio-side half.
pub struct JackProcessor {
    ports: AudioPorts,
    rt: RtProcessor,
    scratch: Vec<f32>,
}

impl JackProcessor {
    pub fn new(client: &Client, rt: RtProcessor) -> Result<Self> {
        let ports = AudioPorts::new(client).context("failed to create audio ports")?;
        Ok(Self {
            ports,
            rt,
            scratch: vec![0.0; client.buffer_size() as usize],
        })
    }
}

impl jack::ProcessHandler for JackProcessor {
    fn process(&mut self, _: &Client, ps: &ProcessScope) -> Control {
        let frames = ps.n_frames() as usize;
        if frames > self.scratch.len() {
            // Should only happen if the server skipped the buffer_size
            // notification; recover rather than write out of bounds.
            self.scratch.resize(frames, 0.0);
        }
        let output = &mut self.scratch[..frames];

        let input = self.ports.read_input(ps);
        self.rt.process(input, output);
        self.ports.write_output(ps, output);

        Control::Continue
    }

    fn buffer_size(&mut self, client: &Client, frames: Frames) -> Control {
        let new_size = frames as usize;
        warn!("buffer size changed to {new_size} frames");
        debug!(
            "sample rate: {}, calls p/s: {:.1}",
            client.sample_rate(),
            client.sample_rate() as f32 / new_size as f32
        );
        self.scratch.resize(new_size, 0.0);
        Control::Continue
    }
}
