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

//! Musical control parameters.
//!
//! Raw values from the host are validated exactly once, here, into an immutable
//! [`ParameterSnapshot`]. Nothing downstream re-checks ranges.

use std::fmt;

use serde::Deserialize;

use crate::sequencer::pattern::{PatternId, PATTERN_COUNT};

/// Slowest tempo the engine will play.
pub const MIN_TEMPO_BPM: f32 = 20.0;

/// Fastest tempo the engine will play.
pub const MAX_TEMPO_BPM: f32 = 300.0;

/// Longest offline render, in seconds.
pub const MAX_DURATION_SECS: f32 = 600.0;

const DEFAULT_TEMPO_BPM: f32 = 90.0;
const DEFAULT_SCALAR: f32 = 0.5;

/// Major or natural minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScaleMode {
    Major,
    Minor,
}

impl ScaleMode {
    pub fn from_is_minor(is_minor: bool) -> ScaleMode {
        if is_minor {
            ScaleMode::Minor
        } else {
            ScaleMode::Major
        }
    }
}

impl fmt::Display for ScaleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleMode::Major => write!(f, "major"),
            ScaleMode::Minor => write!(f, "minor"),
        }
    }
}

/// Parameters exactly as the host supplied them. Any value is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawParameters {
    /// Render length in seconds (offline only).
    pub duration_secs: f32,
    /// Tempo in beats per minute.
    pub tempo_bpm: f32,
    /// Pitch class of the key, 0 = C.
    pub key_index: i32,
    /// Minor instead of major.
    pub is_minor: bool,
    /// Harmonic tension and brightness.
    pub mood: f32,
    /// Note subdivision and syncopation.
    pub rhythm_density: f32,
    /// Index into the pattern table.
    pub pattern_id: i32,
    /// Percussion gain and hit density.
    pub percussion_level: f32,
}

impl Default for RawParameters {
    fn default() -> Self {
        RawParameters {
            duration_secs: 0.0,
            tempo_bpm: DEFAULT_TEMPO_BPM,
            key_index: 0,
            is_minor: false,
            mood: DEFAULT_SCALAR,
            rhythm_density: DEFAULT_SCALAR,
            pattern_id: 0,
            percussion_level: DEFAULT_SCALAR,
        }
    }
}

/// A fully validated, immutable set of musical controls. Only obtainable through
/// [`normalize`], so every field is within its declared domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    duration_secs: f32,
    tempo_bpm: f32,
    key: u8,
    mode: ScaleMode,
    mood: f32,
    rhythm_density: f32,
    pattern: PatternId,
    percussion_level: f32,
}

impl ParameterSnapshot {
    pub fn duration_secs(&self) -> f32 {
        self.duration_secs
    }

    pub fn tempo_bpm(&self) -> f32 {
        self.tempo_bpm
    }

    /// Pitch class of the key, 0-11.
    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    pub fn mood(&self) -> f32 {
        self.mood
    }

    pub fn rhythm_density(&self) -> f32 {
        self.rhythm_density
    }

    pub fn pattern(&self) -> PatternId {
        self.pattern
    }

    pub fn percussion_level(&self) -> f32 {
        self.percussion_level
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        normalize(&RawParameters::default())
    }
}

impl fmt::Display for ParameterSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1} BPM, key {} {}, mood {:.2}, rhythm {:.2}, pattern {}, percussion {:.2}",
            self.tempo_bpm,
            self.key,
            self.mode,
            self.mood,
            self.rhythm_density,
            self.pattern.index(),
            self.percussion_level
        )
    }
}

/// Clamps raw host parameters into a usable snapshot. Never fails: out-of-range values
/// are corrected and non-finite values fall back to defaults.
pub fn normalize(raw: &RawParameters) -> ParameterSnapshot {
    ParameterSnapshot {
        duration_secs: clamp_or(raw.duration_secs, 0.0, MAX_DURATION_SECS, 0.0),
        tempo_bpm: clamp_or(
            raw.tempo_bpm,
            MIN_TEMPO_BPM,
            MAX_TEMPO_BPM,
            DEFAULT_TEMPO_BPM,
        ),
        key: raw.key_index.rem_euclid(12) as u8,
        mode: ScaleMode::from_is_minor(raw.is_minor),
        mood: unit_scalar(raw.mood),
        rhythm_density: unit_scalar(raw.rhythm_density),
        pattern: pattern_or_default(raw.pattern_id),
        percussion_level: unit_scalar(raw.percussion_level),
    }
}

fn unit_scalar(value: f32) -> f32 {
    clamp_or(value, 0.0, 1.0, DEFAULT_SCALAR)
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

fn pattern_or_default(pattern_id: i32) -> PatternId {
    usize::try_from(pattern_id)
        .ok()
        .filter(|index| *index < PATTERN_COUNT)
        .and_then(PatternId::new)
        .unwrap_or_default()
}
