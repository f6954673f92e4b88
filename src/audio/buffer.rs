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

use super::format::AudioFormat;

/// Interleaved 16-bit PCM frames in the engine's fixed output format. This is the only
/// artifact that crosses the engine boundary outward.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleBuffer {
    /// Interleaved samples (L, R, L, R, ...).
    samples: Vec<i16>,
}

impl SampleBuffer {
    /// Creates a silent buffer of the given number of frames.
    pub fn silence(frames: usize) -> SampleBuffer {
        SampleBuffer {
            samples: vec![0; frames * AudioFormat::ENGINE.channels as usize],
        }
    }

    /// Wraps interleaved samples. The length must be a whole number of frames.
    pub fn from_interleaved(samples: Vec<i16>) -> SampleBuffer {
        debug_assert_eq!(samples.len() % AudioFormat::ENGINE.channels as usize, 0);
        SampleBuffer { samples }
    }

    /// Number of frames in the buffer.
    pub fn frames(&self) -> usize {
        self.samples.len() / AudioFormat::ENGINE.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The interleaved samples.
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Samples of a single channel, de-interleaved.
    pub fn channel(&self, channel: usize) -> Vec<i16> {
        self.samples
            .iter()
            .skip(channel)
            .step_by(AudioFormat::ENGINE.channels as usize)
            .copied()
            .collect()
    }

    /// Appends another buffer's frames to this one.
    pub fn extend(&mut self, other: &SampleBuffer) {
        self.samples.extend_from_slice(&other.samples);
    }

    /// Serializes the buffer as little-endian signed 16-bit PCM bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 2);
        for sample in &self.samples {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
        bytes
    }

    /// The largest absolute sample value in the buffer.
    pub fn peak(&self) -> u16 {
        self.samples
            .iter()
            .map(|s| s.unsigned_abs())
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence() {
        let buffer = SampleBuffer::silence(10);
        assert_eq!(buffer.frames(), 10);
        assert_eq!(buffer.samples().len(), 20);
        assert_eq!(buffer.peak(), 0);
    }

    #[test]
    fn test_channels_and_bytes() {
        let buffer = SampleBuffer::from_interleaved(vec![1, -1, 256, -256]);
        assert_eq!(buffer.frames(), 2);
        assert_eq!(buffer.channel(0), vec![1, 256]);
        assert_eq!(buffer.channel(1), vec![-1, -256]);
        assert_eq!(
            buffer.to_le_bytes(),
            vec![0x01, 0x00, 0xff, 0xff, 0x00, 0x01, 0x00, 0xff]
        );
        assert_eq!(buffer.peak(), 256);
    }

    #[test]
    fn test_peak_of_minimum_sample() {
        let buffer = SampleBuffer::from_interleaved(vec![i16::MIN, 0]);
        assert_eq!(buffer.peak(), 32768);
    }

    #[test]
    fn test_extend() {
        let mut first = SampleBuffer::from_interleaved(vec![1, 2]);
        first.extend(&SampleBuffer::from_interleaved(vec![3, 4]));
        assert_eq!(first.samples(), &[1, 2, 3, 4]);
    }
}
