// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{crate_version, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scoregen::audio::{AudioFormat, ChannelSink};
use scoregen::config::EngineConfig;
use scoregen::live::LiveController;
use scoregen::params::{normalize, RawParameters};
use scoregen::render;
use scoregen::sequencer::{pattern, Lane};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A parametric procedural music engine."
)]
struct Cli {
    /// Path to an engine config file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

/// Musical controls shared by the subcommands. Out-of-range values are corrected.
#[derive(Args)]
struct Controls {
    /// Tempo in beats per minute.
    #[arg(short, long, default_value_t = 90.0)]
    tempo: f32,
    /// Key as a pitch class, 0 = C.
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    key: i32,
    /// Use the natural minor scale.
    #[arg(long)]
    minor: bool,
    /// Mood, 0.0 (calm) to 1.0 (tense).
    #[arg(short, long, default_value_t = 0.5)]
    mood: f32,
    /// Rhythm density, 0.0 to 1.0.
    #[arg(short, long, default_value_t = 0.5)]
    rhythm: f32,
    /// Pattern index.
    #[arg(short, long, default_value_t = 0)]
    pattern: i32,
    /// Percussion level, 0.0 to 1.0.
    #[arg(long, default_value_t = 0.5)]
    percussion: f32,
}

impl Controls {
    fn raw(&self, duration_secs: f32) -> RawParameters {
        RawParameters {
            duration_secs,
            tempo_bpm: self.tempo,
            key_index: self.key,
            is_minor: self.minor,
            mood: self.mood,
            rhythm_density: self.rhythm,
            pattern_id: self.pattern,
            percussion_level: self.percussion,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Renders audio offline and prints a summary.
    Render {
        /// Length in seconds.
        #[arg(short, long, default_value_t = 10.0)]
        duration: f32,
        #[command(flatten)]
        controls: Controls,
        /// Writes raw little-endian 16-bit stereo PCM to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Runs a live session, sweeping the mood once per second.
    Live {
        /// How long to run, in seconds. Ctrl-C stops early.
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,
        #[command(flatten)]
        controls: Controls,
    },
    /// Lists the available patterns.
    Patterns {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::deserialize(path)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Render {
            duration,
            controls,
            output,
        } => {
            let snapshot = normalize(&controls.raw(duration));
            let (buffer, report) =
                render::generate_with_report(&snapshot, &config.render_settings());

            println!("Rendered {}", snapshot);
            println!(
                "- {} frames ({:?}), {}",
                buffer.frames(),
                AudioFormat::ENGINE.duration_of(buffer.frames()),
                AudioFormat::ENGINE
            );
            println!("- {} events, seed {:#018x}", report.events, report.seed);
            println!("- peak {}", buffer.peak());
            for lane in Lane::ALL {
                println!("- {:?} energy {:.2}", lane, report.lane_energy(lane));
            }

            if let Some(output) = output {
                fs::write(&output, buffer.to_le_bytes())?;
                println!("Wrote {}", output.display());
            }
        }
        Commands::Live { seconds, controls } => {
            let (sink, receiver) = ChannelSink::bounded(4);
            let live = Arc::new(LiveController::new(
                Arc::new(sink),
                config.live_settings()?,
                normalize(&controls.raw(0.0)),
            ));

            // Stand-in for an audio device: drains chunks at playback speed.
            let playing = Arc::new(AtomicBool::new(true));
            let consumer = {
                let playing = playing.clone();
                thread::spawn(move || {
                    let mut frames = 0usize;
                    while playing.load(Ordering::Relaxed) {
                        if let Some(chunk) = receiver.recv_timeout(Duration::from_millis(100)) {
                            frames += chunk.frames();
                            spin_sleep::sleep(AudioFormat::ENGINE.duration_of(chunk.frames()));
                        }
                    }
                    frames
                })
            };

            live.start()?;
            let sweep = async {
                for second in 0..seconds {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    let mood = (second as f32 * 0.1).sin().abs();
                    let snapshot = normalize(&RawParameters {
                        mood,
                        ..controls.raw(0.0)
                    });
                    live.update(snapshot);
                }
            };
            tokio::select! {
                _ = sweep => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }

            live.stop();
            playing.store(false, Ordering::Relaxed);
            let frames = consumer.join().map_err(|_| "consumer thread panicked")?;
            println!(
                "Played {:?} of audio",
                AudioFormat::ENGINE.duration_of(frames)
            );
            if let Some(e) = live.take_error() {
                return Err(e.into());
            }
        }
        Commands::Patterns {} => {
            println!("Patterns (count: {}):", pattern::all().len());
            for (index, pattern) in pattern::all().iter().enumerate() {
                let grid: String = (0..16u64)
                    .map(|step| {
                        if pattern.is_active(step, 0.0) {
                            'X'
                        } else if pattern.is_active(step, 1.0) {
                            'x'
                        } else {
                            '.'
                        }
                    })
                    .collect();
                println!(
                    "- {:2} {:<10} {} contour {:?}",
                    index, pattern.name, grid, pattern.contour
                );
            }
        }
    }

    Ok(())
}
