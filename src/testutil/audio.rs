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

use crate::audio::{SampleBuffer, CHANNELS};

/// Calculate RMS (Root Mean Square) of 16-bit samples, normalized to 0.0-1.0.
pub fn rms(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&x| {
            let x = f64::from(x) / f64::from(i16::MAX);
            x * x
        })
        .sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// RMS of every channel over the frames `start..end`, clamped to the buffer.
pub fn window_rms(buffer: &SampleBuffer, start: usize, end: usize) -> f64 {
    let channels = CHANNELS as usize;
    let end = end.min(buffer.frames());
    let start = start.min(end);
    rms(&buffer.samples()[start * channels..end * channels])
}

/// Autocorrelation of a buffer's onset envelope at `lag` hops of `hop` frames.
///
/// The envelope is the RMS of each hop; onsets are its half-wave rectified rise from one
/// hop to the next. A rhythm with period `lag` hops scores higher at that lag than at
/// lags off the period.
pub fn onset_autocorrelation(buffer: &SampleBuffer, hop: usize, lag: usize) -> f64 {
    let hops = buffer.frames() / hop.max(1);
    let envelope: Vec<f64> = (0..hops)
        .map(|i| window_rms(buffer, i * hop, (i + 1) * hop))
        .collect();
    let onsets: Vec<f64> = envelope
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect();
    if lag >= onsets.len() {
        return 0.0;
    }

    let pairs = onsets.len() - lag;
    onsets
        .iter()
        .zip(&onsets[lag..])
        .map(|(a, b)| a * b)
        .sum::<f64>()
        / pairs as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms() {
        assert_eq!(rms(&[]), 0.0);
        assert_eq!(rms(&[0, 0, 0]), 0.0);
        assert!((rms(&[i16::MAX, -i16::MAX]) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_rms_clamps() {
        let buffer = SampleBuffer::from_interleaved(vec![0, 0, i16::MAX, i16::MAX]);
        assert_eq!(window_rms(&buffer, 0, 1), 0.0);
        assert!((window_rms(&buffer, 1, 100) - 1.0).abs() < 1e-9);
        assert_eq!(window_rms(&buffer, 5, 10), 0.0);
    }

    #[test]
    fn test_onset_autocorrelation_finds_period() {
        // A click train: 10 loud frames every 40 frames.
        let samples: Vec<i16> = (0..400)
            .flat_map(|frame| {
                let level = if frame % 40 < 10 { i16::MAX } else { 0 };
                [level, level]
            })
            .collect();
        let buffer = SampleBuffer::from_interleaved(samples);

        let on_period = onset_autocorrelation(&buffer, 10, 4);
        assert!(on_period > 0.0);
        assert!(on_period > onset_autocorrelation(&buffer, 10, 2));
        assert!(on_period > onset_autocorrelation(&buffer, 10, 3));
        assert_eq!(onset_autocorrelation(&buffer, 10, 100), 0.0);
    }
}
