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

//! ADSR envelopes that fit entirely inside a note's duration.

/// Longest attack, in samples (10 ms).
const MAX_ATTACK: u64 = 441;

/// Shortest attack, in samples.
const MIN_ATTACK: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Attack,
    Decay,
    Sustain,
    Release,
    Done,
}

/// A linear ADSR envelope over a fixed number of samples. The release stage ends
/// exactly at the note's duration, so the note is silent from then on.
#[derive(Debug, Clone)]
pub struct Envelope {
    attack: u64,
    decay: u64,
    release: u64,
    sustain: f32,
    total: u64,
    elapsed: u64,
}

impl Envelope {
    /// Envelope for a note of `duration` samples. Sustain level rises with mood.
    pub fn for_note(duration: u64, mood: f32) -> Envelope {
        let total = duration.max(1);
        Envelope {
            attack: (total / 10).clamp(MIN_ATTACK, MAX_ATTACK),
            decay: (total / 10).max(1),
            release: (total / 5).max(1),
            sustain: 0.7 + 0.2 * mood.clamp(0.0, 1.0),
            total,
            elapsed: 0,
        }
    }

    pub fn stage(&self) -> Stage {
        let t = self.elapsed;
        if t >= self.total {
            Stage::Done
        } else if t >= self.release_start() {
            Stage::Release
        } else if t < self.attack {
            Stage::Attack
        } else if t < self.attack + self.decay {
            Stage::Decay
        } else {
            Stage::Sustain
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.total
    }

    /// Returns the current level and advances one sample.
    pub fn next(&mut self) -> f32 {
        let level = self.level_at(self.elapsed);
        self.elapsed = self.elapsed.saturating_add(1);
        level
    }

    fn release_start(&self) -> u64 {
        self.total.saturating_sub(self.release)
    }

    fn level_at(&self, t: u64) -> f32 {
        if t >= self.total {
            return 0.0;
        }
        let release_start = self.release_start();
        if t >= release_start {
            let remaining = (self.total - t) as f32 / self.release as f32;
            return self.held_level(release_start) * remaining;
        }
        self.held_level(t)
    }

    fn held_level(&self, t: u64) -> f32 {
        if t < self.attack {
            t as f32 / self.attack as f32
        } else if t < self.attack + self.decay {
            let progress = (t - self.attack) as f32 / self.decay as f32;
            1.0 - (1.0 - self.sustain) * progress
        } else {
            self.sustain
        }
    }
}

/// A short linear fade to silence, used when a voice is cut or stolen.
#[derive(Debug, Clone)]
pub struct Fade {
    remaining: u64,
    total: u64,
}

impl Fade {
    pub fn new(samples: u64) -> Fade {
        let total = samples.max(1);
        Fade {
            remaining: total,
            total,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    pub fn next(&mut self) -> f32 {
        let level = self.remaining as f32 / self.total as f32;
        self.remaining = self.remaining.saturating_sub(1);
        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_in_order() {
        let mut envelope = Envelope::for_note(10_000, 0.0);
        let mut stages = vec![envelope.stage()];
        for _ in 0..10_000 {
            envelope.next();
            let stage = envelope.stage();
            if stages.last() != Some(&stage) {
                stages.push(stage);
            }
        }
        assert_eq!(
            stages,
            vec![
                Stage::Attack,
                Stage::Decay,
                Stage::Sustain,
                Stage::Release,
                Stage::Done
            ]
        );
        assert!(envelope.is_finished());
        assert_eq!(envelope.next(), 0.0);
    }

    #[test]
    fn test_levels() {
        let mut envelope = Envelope::for_note(10_000, 0.5);
        let levels: Vec<f32> = (0..10_000).map(|_| envelope.next()).collect();
        assert_eq!(levels[0], 0.0);
        assert!(levels.iter().all(|level| (0.0..=1.0).contains(level)));
        // Attack peaks at 441 samples, then decays to a sustain of 0.8.
        assert!((levels[441] - 1.0).abs() < 1e-6);
        assert!((levels[5000] - 0.8).abs() < 1e-6);
        assert!(levels[9999] < 0.001);
    }

    #[test]
    fn test_short_note_is_bounded() {
        let mut envelope = Envelope::for_note(20, 1.0);
        let levels: Vec<f32> = (0..20).map(|_| envelope.next()).collect();
        assert!(levels.iter().all(|level| (0.0..=1.0).contains(level)));
        assert!(envelope.is_finished());
    }

    #[test]
    fn test_fade() {
        let mut fade = Fade::new(4);
        let levels: Vec<f32> = (0..4).map(|_| fade.next()).collect();
        assert_eq!(levels, vec![1.0, 0.75, 0.5, 0.25]);
        assert!(fade.is_finished());
    }
}
