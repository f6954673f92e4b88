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
use std::{path::Path, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

use crate::live::{LiveSettings, DEFAULT_CHUNK_FRAMES, DEFAULT_SINK_TIMEOUT};
use crate::params::{normalize, ParameterSnapshot, RawParameters};
use crate::render::RenderSettings;
use crate::synth::DEFAULT_MAX_VOICES;

use super::error::ConfigError;

/// Smallest chunk the live loop will render.
const MIN_CHUNK_FRAMES: usize = 64;

/// A YAML representation of the engine configuration. Every field is optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct EngineConfig {
    /// Frames per live chunk (default: 1024).
    chunk_frames: Option<usize>,

    /// Global voice limit (default: 32).
    max_voices: Option<usize>,

    /// How long a live push may block before the session aborts (default: 2s).
    sink_timeout: Option<String>,

    /// Pace live generation to real time (default: false).
    realtime: Option<bool>,

    /// Raise the live generation thread's priority (default: false).
    thread_priority: Option<bool>,

    /// Parameters a live session starts with before any update.
    live_defaults: Option<RawParameters>,
}

impl EngineConfig {
    /// Parse the engine configuration from a file.
    pub fn deserialize(path: &Path) -> Result<EngineConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<EngineConfig>()?)
    }

    /// Returns the live chunk size in frames.
    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
            .unwrap_or(DEFAULT_CHUNK_FRAMES)
            .max(MIN_CHUNK_FRAMES)
    }

    /// Returns the global voice limit.
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }

    /// Returns the sink timeout.
    pub fn sink_timeout(&self) -> Result<Duration, ConfigError> {
        match &self.sink_timeout {
            Some(value) => Ok(DurationString::from_string(value.clone())
                .map_err(|e| ConfigError::InvalidDuration {
                    field: "sink_timeout",
                    value: value.clone(),
                    reason: e.to_string(),
                })?
                .into()),
            None => Ok(DEFAULT_SINK_TIMEOUT),
        }
    }

    pub fn realtime(&self) -> bool {
        self.realtime.unwrap_or(false)
    }

    pub fn thread_priority(&self) -> bool {
        self.thread_priority.unwrap_or(false)
    }

    /// Returns the normalized live defaults.
    pub fn live_defaults(&self) -> ParameterSnapshot {
        normalize(&self.live_defaults.unwrap_or_default())
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            max_voices: self.max_voices(),
        }
    }

    pub fn live_settings(&self) -> Result<LiveSettings, ConfigError> {
        Ok(LiveSettings {
            chunk_frames: self.chunk_frames(),
            max_voices: self.max_voices(),
            sink_timeout: self.sink_timeout()?,
            realtime: self.realtime(),
            thread_priority: self.thread_priority(),
        })
    }
}
