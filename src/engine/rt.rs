use crossbeam::channel::{Receiver, Sender};

use crate::chain::Chain;
use crate::engine::message::{Retired, RtMessage};
use crate::source::SourceState;

/// The audio-context half of the engine. Owned by whoever drives the
/// callback: the JACK process handler in production, the test harness
/// directly in tests.
///
/// `process` is bounded: it drains its inbox with `try_recv`, swaps
/// pointers, copies buffers and runs the chain. No locks, no blocking
/// I/O, and no allocation beyond channel bookkeeping; displaced chains
/// and sources are shipped back to the control context for disposal.
pub struct RtProcessor {
    chain: Box<Chain>,
    source: Box<SourceState>,
    active: bool,
    rx: Receiver<RtMessage>,
    tx_retired: Sender<Retired>,
}

impl RtProcessor {
    pub fn new(rx: Receiver<RtMessage>, tx_retired: Sender<Retired>) -> Self {
        Self {
            chain: Box::new(Chain::empty()),
            source: Box::new(SourceState::Live),
            active: false,
            rx,
            tx_retired,
        }
    }

    /// One buffer of audio. `input` is whatever the backend captured;
    /// it is only consulted while the live source is selected.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        self.handle_messages();

        if !self.active {
            output.fill(0.0);
            return;
        }

        self.source.fill(input, output);
        self.chain.process_block(output);
    }

    /// Applied between buffers; draining everything queued makes a
    /// burst of control changes last-write-wins.
    fn handle_messages(&mut self) {
        while let Ok(message) = self.rx.try_recv() {
            match message {
                RtMessage::SetChain(chain) => {
                    let old = std::mem::replace(&mut self.chain, chain);
                    // If the retirement channel is full the old chain
                    // drops here; worse for the callback, never wrong.
                    let _ = self.tx_retired.try_send(Retired::Chain(old));
                }
                RtMessage::SetSource(source) => {
                    let old = std::mem::replace(&mut self.source, source);
                    let _ = self.tx_retired.try_send(Retired::Source(old));
                }
                RtMessage::SetParam {
                    owner,
                    kind,
                    nth,
                    name,
                    value,
                } => {
                    // Misses are fine: the stage may not be realized in
                    // the current chain. The module state has the value.
                    let _ = self.chain.apply_parameter(owner, kind, nth, name, value);
                }
                RtMessage::SetActive(active) => {
                    self.active = active;
                }
            }
        }
    }
}
