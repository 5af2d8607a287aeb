use crate::chain::Chain;
use crate::chain::stages::StageKind;
use crate::module::StageOwner;
use crate::source::SourceState;

/// Control → audio. Everything heap-allocated is boxed on the control
/// side; the callback only moves pointers.
pub enum RtMessage {
    /// Swap in a freshly built chain. The displaced one is retired.
    SetChain(Box<Chain>),
    /// Swap the signal source. The displaced one is retired.
    SetSource(Box<SourceState>),
    /// Non-structural parameter write, routed by stage address. The
    /// name is `'static` so nothing is freed on the audio thread.
    SetParam {
        owner: StageOwner,
        kind: StageKind,
        nth: usize,
        name: &'static str,
        value: f32,
    },
    /// false silences the output and stops pulling the source.
    SetActive(bool),
}

/// Audio → control. Displaced structures come back whole so their
/// buffers are freed in the control context, not in the callback.
pub enum Retired {
    Chain(Box<Chain>),
    Source(Box<SourceState>),
}
