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

//! The host-facing entry points.
//!
//! Hosts pass plain numbers; they are normalized here, once, and nothing past this
//! boundary sees an unvalidated value. Out-of-range input is corrected, never rejected.

use std::sync::Arc;

use tracing::info;

use crate::audio::OutputSink;
use crate::config::EngineConfig;
use crate::live::{LiveController, LiveError, LiveSettings, SessionState};
use crate::params::{normalize, ParameterSnapshot, RawParameters};
use crate::render::{self, RenderSettings};

/// Version of the entry-point contract below. Bumped whenever a signature or the PCM
/// format changes.
pub const ENGINE_API_VERSION: u32 = 1;

/// An engine instance: offline rendering plus one live controller bound to a sink.
pub struct Engine {
    render_settings: RenderSettings,
    live: LiveController,
}

impl Engine {
    /// Creates an engine with default settings.
    pub fn new(sink: Arc<dyn OutputSink>) -> Engine {
        Engine::with_settings(
            sink,
            RenderSettings::default(),
            LiveSettings::default(),
            ParameterSnapshot::default(),
        )
    }

    /// Creates an engine from a loaded configuration.
    pub fn from_config(
        sink: Arc<dyn OutputSink>,
        config: &EngineConfig,
    ) -> Result<Engine, crate::config::ConfigError> {
        Ok(Engine::with_settings(
            sink,
            config.render_settings(),
            config.live_settings()?,
            config.live_defaults(),
        ))
    }

    pub fn with_settings(
        sink: Arc<dyn OutputSink>,
        render_settings: RenderSettings,
        live_settings: LiveSettings,
        live_defaults: ParameterSnapshot,
    ) -> Engine {
        info!(api_version = ENGINE_API_VERSION, "Engine created");
        Engine {
            render_settings,
            live: LiveController::new(sink, live_settings, live_defaults),
        }
    }

    /// Renders `duration_secs` of audio and returns it as interleaved little-endian
    /// 16-bit stereo PCM at 44.1 kHz.
    #[allow(clippy::too_many_arguments)]
    pub fn generate_audio(
        &self,
        duration_secs: f32,
        tempo_bpm: f32,
        key_index: i32,
        is_minor: bool,
        mood: f32,
        rhythm_density: f32,
        pattern_id: i32,
        percussion_level: f32,
    ) -> Vec<u8> {
        let snapshot = normalize(&RawParameters {
            duration_secs,
            tempo_bpm,
            key_index,
            is_minor,
            mood,
            rhythm_density,
            pattern_id,
            percussion_level,
        });
        render::generate_with_report(&snapshot, &self.render_settings)
            .0
            .to_le_bytes()
    }

    /// Starts live generation with the last known parameters. Succeeds without doing
    /// anything if a session is already running.
    pub fn start_live_mode(&self) -> Result<(), LiveError> {
        self.live.start()
    }

    /// Submits new parameters to the running session. Returns false, and changes
    /// nothing, if live mode is not running.
    #[allow(clippy::too_many_arguments)]
    pub fn update_live_params(
        &self,
        tempo_bpm: f32,
        key_index: i32,
        is_minor: bool,
        mood: f32,
        rhythm_density: f32,
        pattern_id: i32,
        percussion_level: f32,
    ) -> bool {
        self.live.update(normalize(&RawParameters {
            duration_secs: 0.0,
            tempo_bpm,
            key_index,
            is_minor,
            mood,
            rhythm_density,
            pattern_id,
            percussion_level,
        }))
    }

    /// Stops live generation. Always succeeds.
    pub fn stop_live_mode(&self) {
        self.live.stop();
    }

    pub fn is_live(&self) -> bool {
        self.live.state() == SessionState::Running
    }

    /// The live controller, for hosts that need its finer-grained state.
    pub fn live(&self) -> &LiveController {
        &self.live
    }
}
