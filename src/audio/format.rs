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

use std::{fmt, time::Duration};

/// Output sample rate of the engine in Hz.
pub const SAMPLE_RATE: u32 = 44100;

/// Number of interleaved output channels.
pub const CHANNELS: u16 = 2;

/// Bits per output sample.
pub const BITS_PER_SAMPLE: u16 = 16;

/// The fixed PCM format produced by the engine. This is not a runtime parameter: every
/// buffer that crosses the engine boundary is in this format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u16,
    /// Bits per sample (signed integer PCM)
    pub bits_per_sample: u16,
}

impl AudioFormat {
    /// The engine's output format (44.1kHz, stereo, 16-bit signed).
    pub const ENGINE: AudioFormat = AudioFormat {
        sample_rate: SAMPLE_RATE,
        channels: CHANNELS,
        bits_per_sample: BITS_PER_SAMPLE,
    };

    /// Size of one interleaved frame in bytes.
    pub const fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Number of frames covering the given duration, rounded to the nearest frame.
    pub fn frames_for_secs(&self, seconds: f32) -> usize {
        if !seconds.is_finite() || seconds <= 0.0 {
            return 0;
        }
        (f64::from(seconds) * f64::from(self.sample_rate)).round() as usize
    }

    /// Wall-clock duration of the given number of frames.
    pub fn duration_of(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        AudioFormat::ENGINE
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Hz, {} channels, {}-bit int",
            self.sample_rate, self.channels, self.bits_per_sample
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_format() {
        let format = AudioFormat::default();
        assert_eq!(format.sample_rate, 44100);
        assert_eq!(format.channels, 2);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(format.bytes_per_frame(), 4);
    }

    #[test]
    fn test_frames_for_secs() {
        let format = AudioFormat::ENGINE;
        assert_eq!(format.frames_for_secs(0.5), 22050);
        assert_eq!(format.frames_for_secs(1.0), 44100);
        assert_eq!(format.frames_for_secs(5.0), 220500);
        assert_eq!(format.frames_for_secs(0.0), 0);
        assert_eq!(format.frames_for_secs(-1.0), 0);
        assert_eq!(format.frames_for_secs(f32::NAN), 0);
    }

    #[test]
    fn test_duration_of() {
        let format = AudioFormat::ENGINE;
        assert_eq!(format.duration_of(44100), Duration::from_secs(1));
        assert_eq!(format.duration_of(0), Duration::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", AudioFormat::ENGINE),
            "44100Hz, 2 channels, 16-bit int"
        );
    }
}
