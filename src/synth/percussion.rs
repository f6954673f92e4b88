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

//! Synthesized drum hits. Noise comes from a generator seeded per hit, so a hit sounds
//! the same every time the same timeline is rendered.

use std::f32::consts::TAU;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::audio::SAMPLE_RATE;
use crate::sequencer::PercussionVoice;

use super::effects::OnePole;

const KICK_FREQUENCY: f32 = 100.0;
const SNARE_FREQUENCY: f32 = 180.0;

/// One percussion hit in progress.
#[derive(Debug, Clone)]
pub struct Drum {
    voice: PercussionVoice,
    elapsed: u64,
    length: u64,
    phase: f32,
    noise: StdRng,
    filter: OnePole,
}

impl Drum {
    pub fn new(voice: PercussionVoice, length: u64, seed: u64) -> Drum {
        Drum {
            voice,
            elapsed: 0,
            length: length.max(1),
            phase: 0.0,
            noise: StdRng::seed_from_u64(seed),
            filter: OnePole::new(0.2),
        }
    }

    pub fn voice(&self) -> PercussionVoice {
        self.voice
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.length
    }

    pub fn next(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }
        let t = self.elapsed as f32 / SAMPLE_RATE as f32;
        self.elapsed += 1;

        match self.voice {
            PercussionVoice::Kick => {
                // Pitch sweeps down from the base frequency.
                let frequency = KICK_FREQUENCY * (-15.0 * t).exp();
                self.phase = (self.phase + frequency / SAMPLE_RATE as f32) % 1.0;
                (self.phase * TAU).sin() * (-30.0 * t).exp()
            }
            PercussionVoice::Snare => {
                self.phase = (self.phase + SNARE_FREQUENCY / SAMPLE_RATE as f32) % 1.0;
                let tone = (self.phase * TAU).sin() * 0.3;
                let noise = self.noise.gen_range(-1.0f32..=1.0) * 0.7;
                self.filter.process((tone + noise) * (-40.0 * t).exp())
            }
            PercussionVoice::Hat => {
                self.noise.gen_range(-1.0f32..=1.0) * (-100.0 * t).exp() * 0.6
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(voice: PercussionVoice, seed: u64) -> Vec<f32> {
        let mut drum = Drum::new(voice, 2000, seed);
        (0..2000).map(|_| drum.next()).collect()
    }

    #[test]
    fn test_hits_are_deterministic() {
        for voice in [
            PercussionVoice::Kick,
            PercussionVoice::Snare,
            PercussionVoice::Hat,
        ] {
            assert_eq!(render(voice, 7), render(voice, 7));
        }
        assert_ne!(
            render(PercussionVoice::Hat, 7),
            render(PercussionVoice::Hat, 8)
        );
    }

    #[test]
    fn test_hits_decay() {
        for voice in [
            PercussionVoice::Kick,
            PercussionVoice::Snare,
            PercussionVoice::Hat,
        ] {
            let samples = render(voice, 3);
            let head: f32 = samples[..200].iter().map(|s| s.abs()).sum();
            let tail: f32 = samples[1800..].iter().map(|s| s.abs()).sum();
            assert!(head > tail, "{:?} did not decay", voice);
            assert!(samples.iter().all(|s| s.abs() <= 1.0));
        }
    }

    #[test]
    fn test_finished_hit_is_silent() {
        let mut drum = Drum::new(PercussionVoice::Kick, 10, 0);
        for _ in 0..10 {
            drum.next();
        }
        assert!(drum.is_finished());
        assert_eq!(drum.next(), 0.0);
    }
}
