//! `run` command
//!
//! Drives a [`SleepTimer`] against a [`MemoryPlayer`] and reads control
//! commands from stdin until the timer is idle again.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::args::RunArgs;
use crate::config::{ConfigLoader, LullabyConfig, Validator};
use crate::error::{ConfigError, LullabyError};
use crate::observability::{EventEmitter, init_metrics};
use crate::playback::{MemoryPlayer, PlayStateObserver, PlaybackControl};
use crate::shake::ShakeSignal;
use crate::timer::{SleepTimer, TimerPhase};

/// A line read from stdin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Emit a shake
    Shake,
    /// Cancel the countdown
    Cancel,
    /// Start over with the configured duration
    Restart,
    /// Pause the player
    Pause,
    /// Resume the player
    Play,
    /// Print the remaining time and phase
    Status,
    /// Cancel and exit
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shake" | "s" => Ok(Self::Shake),
            "cancel" | "c" => Ok(Self::Cancel),
            "restart" | "r" => Ok(Self::Restart),
            "pause" => Ok(Self::Pause),
            "play" => Ok(Self::Play),
            "status" | "?" => Ok(Self::Status),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("unknown command '{other}'")),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Idle,
    Quit,
    Interrupted,
}

/// Resolves the effective configuration: file (or defaults), then flags.
///
/// # Errors
///
/// Returns a config error if the file fails to load or the merged
/// configuration is invalid.
pub fn resolve_config(args: &RunArgs) -> Result<LullabyConfig, LullabyError> {
    let mut config = match &args.config {
        Some(path) => {
            info!(config = %path.display(), "loading configuration");
            let loaded = ConfigLoader::with_defaults().load(path)?;
            for warning in &loaded.warnings {
                warn!(
                    location = warning.location.as_deref().unwrap_or("<unknown>"),
                    "{}",
                    warning.message
                );
            }
            loaded.config
        }
        None => LullabyConfig::default(),
    };

    let timer = &mut config.sleep_timer;
    if let Some(duration) = args.duration {
        timer.duration = duration;
    }
    if let Some(fade_out) = args.fade_out {
        timer.fade_out = fade_out;
    }
    if let Some(window) = args.shake_window {
        timer.shake_reset_window = window;
    }
    if args.events_file.is_some() || args.metrics_port.is_some() {
        let obs = config.observability.get_or_insert_with(Default::default);
        if let Some(path) = &args.events_file {
            obs.events_file = Some(path.clone());
        }
        if let Some(port) = args.metrics_port {
            obs.metrics_port = Some(port);
        }
    }

    let result = Validator::new().validate(&config);
    if result.has_errors() {
        return Err(ConfigError::ValidationError {
            path: "command line".to_string(),
            errors: result.errors,
        }
        .into());
    }
    Ok(config)
}

/// Run the sleep timer interactively.
///
/// # Errors
///
/// Returns a config error for an invalid configuration, an I/O error if
/// the events file or metrics listener cannot be opened, or a timer error
/// if the timer rejects its settings.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), LullabyError> {
    let config = resolve_config(args)?;
    let observability = config.observability.clone().unwrap_or_default();

    if let Some(port) = observability.metrics_port {
        init_metrics(Some(port))?;
        info!(port, "Prometheus metrics endpoint started");
    }

    let player = Arc::new(MemoryPlayer::playing());
    let shake = ShakeSignal::shared();

    let mut builder = SleepTimer::builder(player.clone(), shake.clone())
        .config(config.sleep_timer.clone())
        .play_state(player.clone());
    let events = match &observability.events_file {
        Some(path) => Some(Arc::new(EventEmitter::from_file(path)?)),
        None => None,
    };
    if let Some(events) = &events {
        builder = builder.events(Arc::clone(events));
    }
    let timer = builder.build()?;

    timer.set_enabled(true)?;
    println!(
        "sleep timer set for {}",
        humantime::format_duration(timer.configured_duration())
    );

    let outcome = drive(&timer, &player, &shake, cancel).await?;
    match outcome {
        Outcome::Idle => println!("sleep timer finished"),
        Outcome::Quit => println!("sleep timer stopped"),
        Outcome::Interrupted => println!("interrupted, sleep timer cancelled"),
    }
    info!(
        commands = player.commands().len(),
        state = %player.play_state(),
        "player at exit"
    );
    if let Some(events) = &events {
        info!(count = events.event_count(), "event stream written");
    }
    Ok(())
}

async fn drive(
    timer: &SleepTimer,
    player: &Arc<MemoryPlayer>,
    shake: &ShakeSignal,
    cancel: CancellationToken,
) -> Result<Outcome, LullabyError> {
    let mut phase = timer.phase();
    let mut lines = Some(BufReader::new(tokio::io::stdin()).lines());

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                timer.cancel();
                return Ok(Outcome::Interrupted);
            }
            _ = phase.wait_for(|p| *p == TimerPhase::Idle) => return Ok(Outcome::Idle),
            line = next_line(&mut lines) => {
                let Some(line) = line else { continue };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => {
                        timer.cancel();
                        return Ok(Outcome::Quit);
                    }
                    Ok(command) => apply(command, timer, player, shake)?,
                    Err(message) => warn!("{message}"),
                }
            }
        }
    }
}

fn apply(
    command: Command,
    timer: &SleepTimer,
    player: &MemoryPlayer,
    shake: &ShakeSignal,
) -> Result<(), LullabyError> {
    match command {
        Command::Shake => shake.shake(),
        Command::Cancel => timer.cancel(),
        Command::Restart => timer.set_enabled(true)?,
        Command::Pause => player.pause(),
        Command::Play => player.play(),
        Command::Status => println!(
            "{} left, {}, player {} at {} volume {:.2}",
            humantime::format_duration(timer.remaining()),
            *timer.phase().borrow(),
            player.play_state(),
            humantime::format_duration(whole_millis(player.position())),
            player.volume(),
        ),
        Command::Quit => {}
    }
    Ok(())
}

/// Next stdin line. Pends forever once stdin is closed.
async fn next_line(lines: &mut Option<Lines<BufReader<Stdin>>>) -> Option<String> {
    let Some(reader) = lines.as_mut() else {
        return std::future::pending().await;
    };
    match reader.next_line().await {
        Ok(Some(line)) => Some(line),
        Ok(None) => {
            *lines = None;
            None
        }
        Err(e) => {
            warn!(error = %e, "stdin closed");
            *lines = None;
            None
        }
    }
}

/// Truncates to whole milliseconds for display.
fn whole_millis(d: Duration) -> Duration {
    Duration::from_millis(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
