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
//! Bus processing and the stereo master stage.

use crate::audio::CHANNELS;
use crate::sequencer::event::LANE_COUNT;
use crate::sequencer::Lane;

use super::effects::{soft_limit, Echo, OnePole, Shimmer, StereoStage};
use super::voice::LaneFrame;

/// Lowpass coefficient per lane bus, indexed by `Lane as usize`.
const LANE_FILTERS: [f32; LANE_COUNT] = [0.2, 0.1, 0.25, 1.0];

/// Echo delay shared by the melody and percussion buses (0.12 s).
const ECHO_DELAY_SAMPLES: usize = 5292;

const PERCUSSION_ECHO_WET: f32 = 0.3;
const ECHO_FEEDBACK: f32 = 0.3;

/// Right channel delay of the stereo stage.
const STEREO_SHIFT_SAMPLES: usize = 200;
const PAN_DEPTH: f32 = 0.4;

const MASTER_GAIN: f32 = 0.8;

/// Mixes per-lane voice output into a stereo frame.
///
/// Every filter, echo line and LFO lives here and keeps its state for the life of the
/// mixer, so consecutive chunks join without a seam.
#[derive(Debug, Clone)]
pub struct Mixer {
    filters: [OnePole; LANE_COUNT],
    melody_echo: Echo,
    percussion_echo: Echo,
    shimmer: Shimmer,
    stereo: StereoStage,
    /// Sum of squared bus output per lane since creation.
    energy: [f64; LANE_COUNT],
}

impl Mixer {
    /// Creates a mixer. `seed` drives the shimmer noise.
    pub fn new(seed: u64, mood: f32) -> Self {
        let mut mixer = Self {
            filters: LANE_FILTERS.map(OnePole::new),
            melody_echo: Echo::new(ECHO_DELAY_SAMPLES, 0.0, ECHO_FEEDBACK),
            percussion_echo: Echo::new(ECHO_DELAY_SAMPLES, PERCUSSION_ECHO_WET, ECHO_FEEDBACK),
            shimmer: Shimmer::new(seed, 0.0),
            stereo: StereoStage::new(STEREO_SHIFT_SAMPLES, PAN_DEPTH, 0.0),
            energy: [0.0; LANE_COUNT],
        };
        mixer.set_mood(mood);
        mixer
    }

    /// Applies the mood-dependent effect amounts. Echo and shimmer are absent at mood 0.
    pub fn set_mood(&mut self, mood: f32) {
        let mood = mood.clamp(0.0, 1.0);
        self.melody_echo.set_wet(0.4 * mood);
        self.shimmer.set_level(0.06 * mood);
        self.stereo.set_speed(0.00015 + 0.0001 * mood);
    }

    /// Processes one frame of lane sums into a limited stereo frame in [-1, 1].
    pub fn process_frame(&mut self, lanes: LaneFrame) -> [f32; CHANNELS as usize] {
        let mut buses = [0.0f32; LANE_COUNT];
        for (index, (bus, filter)) in buses.iter_mut().zip(self.filters.iter_mut()).enumerate() {
            *bus = filter.process(lanes[index]);
        }
        buses[Lane::Melody as usize] = self.melody_echo.process(buses[Lane::Melody as usize]);
        buses[Lane::Percussion as usize] =
            self.percussion_echo.process(buses[Lane::Percussion as usize]);

        for (energy, bus) in self.energy.iter_mut().zip(buses.iter()) {
            *energy += f64::from(*bus) * f64::from(*bus);
        }

        let mono = (buses.iter().sum::<f32>() + self.shimmer.next()) * MASTER_GAIN;
        self.stereo.process(mono).map(soft_limit)
    }

    /// Accumulated energy of a lane bus.
    pub fn lane_energy(&self, lane: Lane) -> f64 {
        self.energy[lane as usize]
    }
}

/// Converts a sample in [-1, 1] to signed 16-bit PCM, saturating out-of-range input.
pub fn quantize(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(-1.0), -i16::MAX);
        assert_eq!(quantize(5.0), i16::MAX);
        assert_eq!(quantize(-5.0), -i16::MAX);
        assert_eq!(quantize(f32::NAN), 0);
        assert_eq!(quantize(0.5), 16384);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut mixer = Mixer::new(1, 0.0);
        for _ in 0..10_000 {
            assert_eq!(mixer.process_frame([0.0; LANE_COUNT]), [0.0, 0.0]);
        }
        for lane in Lane::ALL {
            assert_eq!(mixer.lane_energy(lane), 0.0);
        }
    }

    #[test]
    fn test_output_is_limited() {
        let mut mixer = Mixer::new(1, 1.0);
        for _ in 0..10_000 {
            let [left, right] = mixer.process_frame([10.0; LANE_COUNT]);
            assert!(left.abs() <= 1.0 && right.abs() <= 1.0);
            assert!(quantize(left) >= -i16::MAX && quantize(right) >= -i16::MAX);
        }
    }

    #[test]
    fn test_energy_tracks_lanes() {
        let mut mixer = Mixer::new(1, 0.5);
        let mut lanes = [0.0; LANE_COUNT];
        lanes[Lane::Bass as usize] = 0.5;
        for _ in 0..1000 {
            mixer.process_frame(lanes);
        }
        assert!(mixer.lane_energy(Lane::Bass) > 0.0);
        assert_eq!(mixer.lane_energy(Lane::Percussion), 0.0);
        assert_eq!(mixer.lane_energy(Lane::Melody), 0.0);
    }
}
