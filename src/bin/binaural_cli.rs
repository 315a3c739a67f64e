use binaural_backend::audio_io;
use binaural_backend::{
    AudioSession, BackendConfig, EngineError, NoiseUpdate, ParamUpdate, SessionScript,
    SharedHandle,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

/// CLI for streaming binaural beats through the realtime backend
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a steady tone until Ctrl+C, then fade out
    Tone(ToneArgs),
    /// Play a JSON session script of timed parameter updates
    Play(PlayArgs),
    /// Generate a default config file and exit
    GenerateConfig(ConfigArgs),
}

#[derive(ClapArgs)]
struct ToneArgs {
    /// Left-ear frequency in Hz
    #[arg(long, default_value_t = 310.0)]
    left: f32,
    /// Right-ear frequency in Hz
    #[arg(long, default_value_t = 315.0)]
    right: f32,
    /// Output level (capped by the config's max_volume)
    #[arg(long, default_value_t = 0.15)]
    gain: f32,
    /// Fade-in and fade-out time in seconds
    #[arg(long, default_value_t = 2.0)]
    fade: f32,
    /// Pulse each band at its beat frequency
    #[arg(long, default_value_t = false)]
    iso: bool,
    /// Right-channel delay in milliseconds
    #[arg(long, default_value_t = 0.0)]
    interleave_ms: f32,
    /// Level of the white-noise bed
    #[arg(long, default_value_t = 0.0)]
    noise: f32,
    /// Path to a config.toml
    #[arg(long)]
    config: Option<String>,
}

#[derive(ClapArgs)]
struct PlayArgs {
    /// Path to the session script JSON file
    #[arg(long)]
    path: String,
    /// Path to a config.toml
    #[arg(long)]
    config: Option<String>,
}

#[derive(ClapArgs)]
struct ConfigArgs {
    /// Output path for the generated configuration
    #[arg(long, default_value = "config.toml")]
    out: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Tone(args) => tone_command(args)?,
        Commands::Play(args) => play_command(args)?,
        Commands::GenerateConfig(cfg) => {
            BackendConfig::generate_default(&cfg.out)?;
            println!("Generated default config at {}", cfg.out);
        }
    }
    Ok(())
}

/// Reasons the main thread stops waiting on playback.
enum Wake {
    Interrupted,
    StreamFailed(EngineError),
}

/// Build a session at the configured (or device) rate and start streaming it
/// on a background thread. A stream failure is reported through `wake`.
fn start_stream(
    config: &BackendConfig,
    wake: Sender<Wake>,
) -> Result<(SharedHandle, Sender<()>, std::thread::JoinHandle<()>), Box<dyn std::error::Error>> {
    let rate = match config.sample_rate {
        Some(rate) => rate,
        None => audio_io::default_output_rate()?,
    };
    let (session, handle) = AudioSession::new(config, rate)?;
    let (stop_tx, stop_rx) = unbounded();
    let worker = std::thread::spawn(move || {
        if let Err(e) = audio_io::run_audio_stream(session, stop_rx) {
            log::error!("audio stream failed: {e}");
            let _ = wake.send(Wake::StreamFailed(e));
        }
    });
    Ok((handle.into_shared(), stop_tx, worker))
}

fn wake_channel() -> Result<(Sender<Wake>, Receiver<Wake>), Box<dyn std::error::Error>> {
    let (tx, rx) = unbounded();
    let ctrlc_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(Wake::Interrupted);
    })?;
    Ok((tx, rx))
}

/// Time left until `seconds` after `start`. Unrepresentable instants wait
/// forever.
fn remaining(start: Instant, seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0))
        .ok()
        .and_then(|d| start.checked_add(d))
        .map_or(Duration::MAX, |t| t.saturating_duration_since(Instant::now()))
}

/// Block for at most `timeout`. Returns true on Ctrl+C and propagates a
/// failed stream as an error.
fn wait(wake: &Receiver<Wake>, timeout: Duration) -> Result<bool, Box<dyn std::error::Error>> {
    match wake.recv_timeout(timeout) {
        Ok(Wake::Interrupted) | Err(RecvTimeoutError::Disconnected) => Ok(true),
        Ok(Wake::StreamFailed(e)) => Err(e.into()),
        Err(RecvTimeoutError::Timeout) => Ok(false),
    }
}

fn fade_out(
    handle: &SharedHandle,
    wake: &Receiver<Wake>,
    seconds: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut h = handle.lock();
    h.send(ParamUpdate::gain_ramp(0.0, seconds))?;
    h.send_noise(NoiseUpdate {
        gain: Some(0.0),
        smooth: Some(seconds / 5.0),
        color: None,
    })?;
    drop(h);
    // A second Ctrl+C cuts the fade short.
    if wait(wake, remaining(Instant::now(), seconds as f64 + 0.1))? {
        log::info!("fade interrupted");
    }
    Ok(())
}

fn tone_command(args: ToneArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = BackendConfig::load_or_default(args.config.as_deref())?;
    let (wake_tx, wake) = wake_channel()?;
    let (handle, stop_tx, worker) = start_stream(&config, wake_tx)?;

    {
        let mut h = handle.lock();
        h.send(ParamUpdate {
            freq1_left: Some(args.left),
            freq1_right: Some(args.right),
            iso_enabled: Some(args.iso),
            interleave_ms: Some(args.interleave_ms),
            gain: Some(args.gain),
            gain_smooth: Some(args.fade),
            ..ParamUpdate::default()
        })?;
        if args.noise > 0.0 {
            h.send_noise(NoiseUpdate {
                gain: Some(args.noise),
                smooth: Some(args.fade / 5.0),
                color: None,
            })?;
        }
    }

    println!(
        "Playing {:.2} Hz / {:.2} Hz (beat {:.2} Hz)... press Ctrl+C to stop",
        args.left,
        args.right,
        (args.right - args.left).abs()
    );
    wait(&wake, Duration::MAX)?;
    println!("Fading out...");
    fade_out(&handle, &wake, args.fade)?;
    let _ = stop_tx.send(());
    let _ = worker.join();
    Ok(())
}

fn play_command(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = BackendConfig::load_or_default(args.config.as_deref())?;
    let script = SessionScript::load(&args.path)?;
    let (wake_tx, wake) = wake_channel()?;
    let (handle, stop_tx, worker) = start_stream(&config, wake_tx)?;

    println!("Playing {}... press Ctrl+C to stop", args.path);
    let start = Instant::now();
    let mut stopped_early = false;
    for event in &script.events {
        if wait(&wake, remaining(start, event.at))? {
            stopped_early = true;
            break;
        }
        let mut h = handle.lock();
        if let Some(params) = event.params {
            log::debug!("{:.2}s: {:?}", event.at, params);
            if let Err(e) = h.send(params) {
                log::warn!("event at {:.2}s dropped: {e}", event.at);
            }
        }
        if let Some(noise) = event.noise {
            if let Err(e) = h.send_noise(noise) {
                log::warn!("noise event at {:.2}s dropped: {e}", event.at);
            }
        }
    }

    if !stopped_early {
        stopped_early = wait(&wake, remaining(start, script.total_seconds()))?;
    }
    if stopped_early {
        println!("Fading out...");
        fade_out(&handle, &wake, config.gain_smooth)?;
    }
    let _ = stop_tx.send(());
    let _ = worker.join();
    let elapsed = start.elapsed().as_secs_f32();
    println!("Session finished after {:.2}s", elapsed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_saturates_instead_of_panicking() {
        let now = Instant::now();
        assert_eq!(remaining(now, 1e300), Duration::MAX);
        assert_eq!(remaining(now, f64::INFINITY), Duration::MAX);
        assert_eq!(remaining(now, -5.0), Duration::ZERO);
        assert_eq!(remaining(now, f64::NAN), Duration::ZERO);
        assert!(remaining(now, 60.0) <= Duration::from_secs(60));
    }

    #[test]
    fn stream_failure_ends_the_wait_with_an_error() {
        let (tx, rx) = unbounded();
        tx.send(Wake::StreamFailed(EngineError::Device("no output device".into())))
            .unwrap();
        let err = wait(&rx, Duration::MAX).unwrap_err();
        assert!(err.to_string().contains("no output device"));

        tx.send(Wake::Interrupted).unwrap();
        assert!(wait(&rx, Duration::MAX).unwrap());
        assert!(!wait(&rx, Duration::from_millis(1)).unwrap());
    }
}
