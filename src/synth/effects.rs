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

//! Stateful per-sample processors used by the mixer. All of them carry their state
//! across chunk boundaries.

use std::f32::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};

/// One-pole lowpass filter. `coefficient` is the fraction of the distance to the input
/// covered per sample, 0.0 to 1.0.
#[derive(Debug, Clone)]
pub struct OnePole {
    coefficient: f32,
    state: f32,
}

impl OnePole {
    pub fn new(coefficient: f32) -> OnePole {
        OnePole {
            coefficient: coefficient.clamp(0.0, 1.0),
            state: 0.0,
        }
    }

    pub fn process(&mut self, input: f32) -> f32 {
        self.state += self.coefficient * (input - self.state);
        self.state
    }
}

/// A fixed-length sample delay.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    index: usize,
}

impl DelayLine {
    pub fn new(delay_samples: usize) -> DelayLine {
        DelayLine {
            buffer: vec![0.0; delay_samples.max(1)],
            index: 0,
        }
    }

    /// The sample the next call to [`DelayLine::process`] will return.
    pub fn peek(&self) -> f32 {
        self.buffer[self.index]
    }

    /// Writes `input` and returns the sample written `delay_samples` calls ago.
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.index];
        self.buffer[self.index] = input;
        self.index = (self.index + 1) % self.buffer.len();
        delayed
    }
}

/// Feedback echo. Output is the dry signal plus `wet` times the delayed signal.
#[derive(Debug, Clone)]
pub struct Echo {
    line: DelayLine,
    wet: f32,
    feedback: f32,
}

impl Echo {
    pub fn new(delay_samples: usize, wet: f32, feedback: f32) -> Echo {
        Echo {
            line: DelayLine::new(delay_samples),
            wet,
            feedback: feedback.clamp(0.0, 0.95),
        }
    }

    pub fn set_wet(&mut self, wet: f32) {
        self.wet = wet;
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.line.peek();
        self.line.process(input + delayed * self.feedback);
        input + delayed * self.wet
    }
}

/// Slow sine LFO. `speed` is in radians per sample.
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    speed: f32,
}

impl Lfo {
    pub fn new(speed: f32) -> Lfo {
        Lfo { phase: 0.0, speed }
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn next(&mut self) -> f32 {
        let value = self.phase.sin();
        self.phase = (self.phase + self.speed) % TAU;
        value
    }
}

/// Filtered noise bed whose level breathes with an LFO.
#[derive(Debug, Clone)]
pub struct Shimmer {
    noise: StdRng,
    lfo: Lfo,
    filter: OnePole,
    level: f32,
}

impl Shimmer {
    pub fn new(seed: u64, level: f32) -> Shimmer {
        Shimmer {
            noise: StdRng::seed_from_u64(seed),
            lfo: Lfo::new(0.00005),
            filter: OnePole::new(0.15),
            level,
        }
    }

    pub fn set_level(&mut self, level: f32) {
        self.level = level;
    }

    pub fn next(&mut self) -> f32 {
        let noise = self.noise.gen_range(-1.0f32..=1.0);
        let swell = 0.5 + 0.5 * self.lfo.next();
        self.filter.process(noise * swell * self.level)
    }
}

/// Auto-pan over a stereo pair, with the right channel delayed a few milliseconds.
#[derive(Debug, Clone)]
pub struct StereoStage {
    lfo: Lfo,
    depth: f32,
    shift: DelayLine,
}

impl StereoStage {
    pub fn new(shift_samples: usize, depth: f32, speed: f32) -> StereoStage {
        StereoStage {
            lfo: Lfo::new(speed),
            depth,
            shift: DelayLine::new(shift_samples),
        }
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.lfo.set_speed(speed);
    }

    pub fn process(&mut self, input: f32) -> [f32; 2] {
        let pan = self.depth * self.lfo.next();
        let left = input * (1.0 - pan.max(0.0));
        let right = self.shift.process(input) * (1.0 + pan.min(0.0));
        [left, right]
    }
}

/// Smooth saturation into [-1, 1]. Large inputs reach the bounds exactly.
pub fn soft_limit(sample: f32) -> f32 {
    sample.tanh()
}
