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
use std::f64::consts::TAU;

use crate::audio::SAMPLE_RATE;
use crate::sequencer::Lane;

/// Basic periodic waveforms. Phase is in cycles, 0.0 to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Saw,
    Triangle,
}

impl Waveform {
    pub fn sample(&self, phase: f64) -> f32 {
        let phase = phase.fract();
        let value = match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Saw => 2.0 * phase - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        };
        value as f32
    }
}

/// One waveform at a multiple of the note frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Partial {
    pub waveform: Waveform,
    pub ratio: f64,
    pub weight: f32,
}

/// The partial mix and gain for a melodic lane at a given mood.
#[derive(Debug, Clone, PartialEq)]
pub struct Timbre {
    pub partials: Vec<Partial>,
    pub gain: f32,
}

impl Timbre {
    /// Higher mood adds saw brightness to the melody and removes the soft octave triangle.
    pub fn for_lane(lane: Lane, mood: f32) -> Timbre {
        let mood = mood.clamp(0.0, 1.0);
        match lane {
            Lane::Melody => Timbre {
                partials: vec![
                    Partial {
                        waveform: Waveform::Sine,
                        ratio: 1.0,
                        weight: 0.7,
                    },
                    Partial {
                        waveform: Waveform::Saw,
                        ratio: 1.0,
                        weight: 0.3 * (0.3 + 0.7 * mood),
                    },
                    Partial {
                        waveform: Waveform::Triangle,
                        ratio: 2.0,
                        weight: 0.2 * (1.0 - mood),
                    },
                ],
                gain: 0.4 + 0.4 * mood,
            },
            Lane::Bass => Timbre {
                partials: vec![Partial {
                    waveform: Waveform::Sine,
                    ratio: 1.0,
                    weight: 1.0,
                }],
                gain: 0.3,
            },
            Lane::Arp | Lane::Percussion => Timbre {
                partials: vec![Partial {
                    waveform: Waveform::Triangle,
                    ratio: 1.0,
                    weight: 1.0,
                }],
                gain: 0.12,
            },
        }
    }
}

/// A bank of phase accumulators playing a [`Timbre`] at one frequency.
#[derive(Debug, Clone)]
pub struct Oscillator {
    partials: Vec<Partial>,
    phases: Vec<f64>,
    increment: f64,
}

impl Oscillator {
    pub fn new(frequency: f32, timbre: &Timbre) -> Oscillator {
        Oscillator {
            partials: timbre.partials.clone(),
            phases: vec![0.0; timbre.partials.len()],
            increment: f64::from(frequency) / f64::from(SAMPLE_RATE),
        }
    }

    pub fn next(&mut self) -> f32 {
        let mut value = 0.0;
        for (partial, phase) in self.partials.iter().zip(self.phases.iter_mut()) {
            value += partial.waveform.sample(*phase) * partial.weight;
            *phase = (*phase + self.increment * partial.ratio).fract();
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waveform_shapes() {
        assert!(Waveform::Sine.sample(0.0).abs() < 1e-6);
        assert!((Waveform::Sine.sample(0.25) - 1.0).abs() < 1e-6);
        assert_eq!(Waveform::Saw.sample(0.0), -1.0);
        assert_eq!(Waveform::Saw.sample(0.5), 0.0);
        assert_eq!(Waveform::Triangle.sample(0.0), -1.0);
        assert_eq!(Waveform::Triangle.sample(0.5), 1.0);
        assert_eq!(Waveform::Triangle.sample(0.25), 0.0);
    }

    #[test]
    fn test_oscillator_period() {
        let timbre = Timbre::for_lane(Lane::Bass, 0.0);
        // 441 Hz repeats every 100 samples.
        let mut oscillator = Oscillator::new(441.0, &timbre);
        let first: Vec<f32> = (0..100).map(|_| oscillator.next()).collect();
        let second: Vec<f32> = (0..100).map(|_| oscillator.next()).collect();
        for (a, b) in first.iter().zip(second.iter()) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_mood_brightens_melody() {
        let calm = Timbre::for_lane(Lane::Melody, 0.0);
        let tense = Timbre::for_lane(Lane::Melody, 1.0);
        assert!(tense.partials[1].weight > calm.partials[1].weight);
        assert_eq!(tense.partials[2].weight, 0.0);
        assert!(tense.gain > calm.gain);
    }
}
