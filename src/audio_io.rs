use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam::channel::Receiver;

use crate::error::{EngineError, Result};
use crate::session::AudioSession;

fn device_err<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::Device(e.to_string())
}

fn output_device() -> Result<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| EngineError::Device("no output device available".into()))
}

/// Default sample rate of the default output device.
pub fn default_output_rate() -> Result<u32> {
    let device = output_device()?;
    let cfg = device.default_output_config().map_err(device_err)?;
    Ok(cfg.sample_rate().0)
}

/// Render the session's stereo output into a device buffer with `channels`
/// interleaved channels. `stereo` is scratch space for channel counts other
/// than two.
fn fill_output(session: &mut AudioSession, data: &mut [f32], channels: usize, stereo: &mut [f32]) {
    if channels == 2 {
        session.process_block(data);
        return;
    }
    if channels == 0 || stereo.len() < 2 {
        data.fill(0.0);
        return;
    }
    let chunk_frames = stereo.len() / 2;
    for out in data.chunks_mut(chunk_frames * channels) {
        let frames = out.len() / channels;
        let buf = &mut stereo[..frames * 2];
        session.process_block(buf);
        for (frame, lr) in out.chunks_exact_mut(channels).zip(buf.chunks_exact(2)) {
            if channels == 1 {
                frame[0] = 0.5 * (lr[0] + lr[1]);
            } else {
                frame[0] = lr[0];
                frame[1] = lr[1];
                frame[2..].fill(0.0);
            }
        }
    }
}

/// Play `session` on the default output device until a message (or
/// disconnect) arrives on `stop`.
pub fn run_audio_stream(mut session: AudioSession, stop: Receiver<()>) -> Result<()> {
    let device = output_device()?;
    let supported = device.default_output_config().map_err(device_err)?;
    if supported.sample_format() != SampleFormat::F32 {
        return Err(EngineError::Device(format!(
            "unsupported sample format {:?}",
            supported.sample_format()
        )));
    }
    let mut config: StreamConfig = supported.into();
    config.sample_rate = cpal::SampleRate(session.sample_rate());
    let channels = config.channels as usize;
    log::info!(
        "opening {} at {} Hz, {} channel(s)",
        device.name().unwrap_or_else(|_| "output device".into()),
        config.sample_rate.0,
        channels
    );

    let mut stereo = vec![0.0f32; 4096 * 2];
    let callback = move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        fill_output(&mut session, data, channels, &mut stereo);
    };
    let err_fn = |err: cpal::StreamError| log::error!("stream error: {err}");

    let stream = device
        .build_output_stream(&config, callback, err_fn, None)
        .map_err(device_err)?;
    stream.play().map_err(device_err)?;

    // Either an explicit stop or every sender dropping ends playback.
    let _ = stop.recv();
    drop(stream);
    log::info!("audio stream stopped");
    Ok(())
}
