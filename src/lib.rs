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

//! A parametric procedural music engine.
//!
//! Eight musical controls (tempo, key, mode, mood, rhythm density, pattern, percussion
//! level and, offline, duration) drive a deterministic pipeline: scale and harmony,
//! a tempo-locked event timeline, and a voice synthesizer producing 16-bit stereo PCM at
//! 44.1 kHz. Audio is rendered either offline in one call or continuously in a live
//! session whose parameters can change at every chunk boundary.

pub mod audio;
pub mod config;
pub mod engine;
pub mod live;
pub mod params;
pub mod playsync;
pub mod render;
pub mod sequencer;
pub mod synth;
pub mod theory;
#[cfg(test)]
mod testutil;

pub use engine::{Engine, ENGINE_API_VERSION};
pub use params::{normalize, ParameterSnapshot, RawParameters};
