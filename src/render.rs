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

//! Offline rendering.
//!
//! A render is a single synchronous pass: seed, harmony, the full timeline, then the
//! full buffer. Nothing in it reads the clock or an unseeded random source, so the same
//! snapshot always produces the same samples.

use std::time::Instant;

use tracing::{info, span, Level};

use crate::audio::{AudioFormat, SampleBuffer};
use crate::params::ParameterSnapshot;
use crate::sequencer::event::LANE_COUNT;
use crate::sequencer::{generate_timeline, Lane};
use crate::synth::{Synthesizer, DEFAULT_MAX_VOICES};
use crate::theory::{choose_harmony, derive_seed, resolve_scale};

/// Tunables for an offline render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    pub max_voices: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            max_voices: DEFAULT_MAX_VOICES,
        }
    }
}

/// What a render produced besides the audio.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderReport {
    /// The seed derived from the snapshot.
    pub seed: u64,
    /// Number of events in the timeline.
    pub events: usize,
    /// Energy each lane bus produced, indexed by `Lane as usize`.
    pub lane_energy: [f64; LANE_COUNT],
}

impl RenderReport {
    pub fn lane_energy(&self, lane: Lane) -> f64 {
        self.lane_energy[lane as usize]
    }
}

/// Renders `snapshot.duration_secs()` of audio with default settings.
pub fn generate(snapshot: &ParameterSnapshot) -> SampleBuffer {
    generate_with_report(snapshot, &RenderSettings::default()).0
}

/// Renders `snapshot.duration_secs()` of audio and reports on the render.
pub fn generate_with_report(
    snapshot: &ParameterSnapshot,
    settings: &RenderSettings,
) -> (SampleBuffer, RenderReport) {
    let span = span!(Level::INFO, "render");
    let _enter = span.enter();

    let start = Instant::now();
    let frames = AudioFormat::ENGINE.frames_for_secs(snapshot.duration_secs());
    let seed = derive_seed(snapshot);
    let scale = resolve_scale(snapshot.key(), snapshot.mode());
    let harmony = choose_harmony(&scale, snapshot.mood(), seed);
    let events = generate_timeline(snapshot, &harmony, 0, frames as u64);

    let mut synth = Synthesizer::new(settings.max_voices, seed, snapshot.mood());
    let buffer = synth.render(&events, frames);

    info!(
        frames,
        events = events.len(),
        seed,
        elapsed = ?start.elapsed(),
        "Rendered {}",
        snapshot
    );

    let report = RenderReport {
        seed,
        events: events.len(),
        lane_energy: Lane::ALL.map(|lane| synth.lane_energy(lane)),
    };
    (buffer, report)
}
