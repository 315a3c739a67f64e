use std::sync::Arc;

use parking_lot::Mutex;

use crate::command::{control_channel, ControlReceiver, ControlSender};
use crate::config::BackendConfig;
use crate::engine::BinauralEngine;
use crate::error::Result;
use crate::models::{NoiseUpdate, ParamUpdate};
use crate::streaming_noise::NoiseEngine;

/// A generator that mixes its next frames into an interleaved stereo buffer.
pub trait Voice: Send {
    fn process(&mut self, output: &mut [f32]);
}

/// Render-side owner of both engines and the consumer ends of their control
/// channels. Lives on the audio thread; never allocates after construction.
pub struct AudioSession {
    binaural: BinauralEngine,
    noise: NoiseEngine,
    binaural_rx: ControlReceiver<ParamUpdate>,
    noise_rx: ControlReceiver<NoiseUpdate>,
    scratch: Vec<f32>,
    sample_rate: u32,
}

/// Producer side of an [`AudioSession`].
pub struct SessionHandle {
    binaural_tx: ControlSender<ParamUpdate>,
    noise_tx: ControlSender<NoiseUpdate>,
}

/// Handle shared between producer threads. The queues stay single-producer;
/// the lock only serialises the senders and is never taken by the renderer.
pub type SharedHandle = Arc<Mutex<SessionHandle>>;

impl AudioSession {
    pub fn new(config: &BackendConfig, sample_rate: u32) -> Result<(Self, SessionHandle)> {
        config.validate()?;
        let settings = config.engine_settings(sample_rate)?;
        let binaural = BinauralEngine::new(&settings)?;
        let noise = NoiseEngine::new(sample_rate, config.noise_smooth)?;
        Ok(Self::with_engines(config, binaural, noise))
    }

    /// Build a session around pre-made engines (e.g. a seeded noise engine).
    pub fn with_engines(
        config: &BackendConfig,
        binaural: BinauralEngine,
        noise: NoiseEngine,
    ) -> (Self, SessionHandle) {
        let sample_rate = binaural.sample_rate() as u32;
        let limits = config.control_limits(sample_rate);
        let (binaural_tx, binaural_rx) = control_channel(config.control_capacity, limits);
        let (noise_tx, noise_rx) = control_channel(config.control_capacity, limits);
        let scratch = vec![0.0; config.block_frames.max(1) * 2];
        log::debug!(
            "audio session at {} Hz, {} control slots, {}-frame chunks",
            sample_rate,
            config.control_capacity,
            config.block_frames
        );
        (
            Self {
                binaural,
                noise,
                binaural_rx,
                noise_rx,
                scratch,
                sample_rate,
            },
            SessionHandle {
                binaural_tx,
                noise_tx,
            },
        )
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn binaural(&self) -> &BinauralEngine {
        &self.binaural
    }

    pub fn noise(&self) -> &NoiseEngine {
        &self.noise
    }

    /// Apply every pending update, then render `buffer` (interleaved stereo).
    pub fn process_block(&mut self, buffer: &mut [f32]) {
        let binaural = &mut self.binaural;
        self.binaural_rx.drain(|msg| binaural.apply(&msg));
        let noise = &mut self.noise;
        self.noise_rx.drain(|msg| noise.apply(&msg));

        let chunk = self.scratch.len();
        for out in buffer.chunks_mut(chunk) {
            self.binaural.render(out);
            let scratch = &mut self.scratch[..out.len()];
            self.noise.render(scratch);
            for (o, n) in out.iter_mut().zip(scratch.iter()) {
                *o = (*o + *n).clamp(-1.0, 1.0);
            }
        }
    }
}

impl SessionHandle {
    pub fn send(&mut self, update: ParamUpdate) -> Result<()> {
        self.binaural_tx.send(update)
    }

    pub fn send_noise(&mut self, update: NoiseUpdate) -> Result<()> {
        self.noise_tx.send(update)
    }

    pub fn into_shared(self) -> SharedHandle {
        Arc::new(Mutex::new(self))
    }
}
