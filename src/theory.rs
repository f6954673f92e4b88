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

//! Scales, chord progressions, and note choices.
//!
//! Everything here is a pure function of a snapshot and a seed. Random choices come from
//! `StdRng` seeded from the parameters (never from the clock), and per-step choices are
//! keyed on the absolute grid step so a continuation chunk makes exactly the choices a
//! single long render would have made.

use rand::{distributions::WeightedIndex, prelude::Distribution, rngs::StdRng, Rng, SeedableRng};

use crate::params::{ParameterSnapshot, ScaleMode};
use crate::sequencer::event::Lane;

/// Semitone offsets of the major scale.
pub const MAJOR_SCALE: [i32; 7] = [0, 2, 4, 5, 7, 9, 11];

/// Semitone offsets of the natural minor scale.
pub const MINOR_SCALE: [i32; 7] = [0, 2, 3, 5, 7, 8, 10];

/// Bars in a generated chord progression before it repeats.
pub const PROGRESSION_BARS: usize = 4;

/// MIDI note of the root of key 0 (C4).
const ROOT_MIDI_NOTE: i32 = 60;

/// Degree weights favoured at low mood: tonic, subdominant, dominant and relative minor.
const CONSONANT_WEIGHTS: [f32; 7] = [1.0, 0.2, 0.3, 0.8, 0.9, 0.7, 0.1];

/// Degree weights favoured at high mood: supertonic, mediant and leading tone.
const TENSE_WEIGHTS: [f32; 7] = [0.3, 0.8, 0.7, 0.4, 0.6, 0.5, 0.9];

/// A resolved scale in a concrete key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    key: u8,
    mode: ScaleMode,
    offsets: [i32; 7],
}

impl Scale {
    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    /// Ordered semitone offsets of the scale degrees from the key root.
    pub fn offsets(&self) -> &[i32; 7] {
        &self.offsets
    }

    /// MIDI note for a scale degree. Degrees outside 0-6 wrap into neighbouring octaves,
    /// and `octave` shifts the result further.
    pub fn midi_note(&self, degree: i32, octave: i32) -> u8 {
        let degree_octave = degree.div_euclid(7);
        let offset = self.offsets[degree.rem_euclid(7) as usize];
        let note = ROOT_MIDI_NOTE
            + i32::from(self.key)
            + offset
            + 12 * (degree_octave + octave);
        note.clamp(0, 127) as u8
    }
}

/// Resolves the scale for a key and mode.
pub fn resolve_scale(key: u8, mode: ScaleMode) -> Scale {
    Scale {
        key: key % 12,
        mode,
        offsets: match mode {
            ScaleMode::Major => MAJOR_SCALE,
            ScaleMode::Minor => MINOR_SCALE,
        },
    }
}

/// Equal-tempered frequency of a MIDI note (A4 = 440 Hz).
pub fn midi_to_frequency(note: u8) -> f32 {
    440.0 * 2f32.powf((f32::from(note) - 69.0) / 12.0)
}

/// Derives the render seed from the musical parameters. Duration is left out so that a
/// longer render of the same parameters starts with the same music.
pub fn derive_seed(snapshot: &ParameterSnapshot) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mode = match snapshot.mode() {
        ScaleMode::Major => 0u32,
        ScaleMode::Minor => 1u32,
    };
    let words = [
        snapshot.tempo_bpm().to_bits(),
        u32::from(snapshot.key()),
        mode,
        snapshot.mood().to_bits(),
        snapshot.rhythm_density().to_bits(),
        snapshot.pattern().index() as u32,
        snapshot.percussion_level().to_bits(),
    ];

    let mut hash = FNV_OFFSET;
    for word in words {
        for byte in word.to_le_bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Selection weights for each scale degree at the given mood, interpolated from the
/// consonant table (mood 0) to the tense table (mood 1).
pub fn degree_weights(mood: f32) -> [f32; 7] {
    let mood = mood.clamp(0.0, 1.0);
    let mut weights = [0.0; 7];
    for (i, weight) in weights.iter_mut().enumerate() {
        *weight = CONSONANT_WEIGHTS[i] + (TENSE_WEIGHTS[i] - CONSONANT_WEIGHTS[i]) * mood;
    }
    weights
}

/// Harmonic choices for a render: a chord progression and the probabilities that shape
/// individual notes.
#[derive(Debug, Clone, PartialEq)]
pub struct Harmony {
    scale: Scale,
    /// Chord root degree for each bar of the progression.
    progression: Vec<i32>,
    /// Chance that a melody note is raised a chromatic semitone.
    chromatic_probability: f32,
    /// Chance that a melody note leaps an octave up or down.
    leap_probability: f32,
    seed: u64,
}

impl Harmony {
    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn progression(&self) -> &[i32] {
        &self.progression
    }

    pub fn chromatic_probability(&self) -> f32 {
        self.chromatic_probability
    }

    /// Chord root degree for an absolute bar number.
    pub fn chord_root(&self, bar: u64) -> i32 {
        self.progression[(bar % self.progression.len() as u64) as usize]
    }

    /// A generator keyed on the seed, the absolute grid step and the lane.
    pub fn step_rng(&self, step: u64, lane: Lane) -> StdRng {
        let lane_salt = lane as u64 + 1;
        StdRng::seed_from_u64(splitmix64(
            self.seed ^ splitmix64(step) ^ lane_salt.wrapping_mul(0x9e37_79b9_7f4a_7c15),
        ))
    }

    /// Melody note for a contour degree played on `step` within `bar`.
    pub fn melody_note(&self, step: u64, bar: u64, contour_degree: i32) -> u8 {
        let mut rng = self.step_rng(step, Lane::Melody);
        let octave = if rng.gen::<f32>() < self.leap_probability {
            if rng.gen_bool(0.5) {
                1
            } else {
                -1
            }
        } else {
            0
        };
        let note = self
            .scale
            .midi_note(self.chord_root(bar) + contour_degree, octave);
        if rng.gen::<f32>() < self.chromatic_probability {
            note.saturating_add(1).min(127)
        } else {
            note
        }
    }

    /// Bass note for a bar: the chord root two octaves down.
    pub fn bass_note(&self, bar: u64) -> u8 {
        self.scale.midi_note(self.chord_root(bar), -2)
    }

    /// Arpeggio note: cycles root, third, fifth and octave of the bar's chord, one
    /// octave up.
    pub fn arp_note(&self, step: u64, bar: u64) -> u8 {
        const CHORD_TONES: [i32; 4] = [0, 2, 4, 7];
        let tone = CHORD_TONES[(step % CHORD_TONES.len() as u64) as usize];
        self.scale.midi_note(self.chord_root(bar) + tone, 1)
    }
}

/// Draws a chord progression for the scale, biased by mood. Bar 0 is always the tonic.
pub fn choose_harmony(scale: &Scale, mood: f32, seed: u64) -> Harmony {
    let mood = mood.clamp(0.0, 1.0);
    let weights = degree_weights(mood);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut progression = vec![0; PROGRESSION_BARS];
    if let Ok(distribution) = WeightedIndex::new(weights) {
        for root in progression.iter_mut().skip(1) {
            *root = distribution.sample(&mut rng) as i32;
        }
    }

    Harmony {
        scale: scale.clone(),
        progression,
        chromatic_probability: 0.25 * mood,
        leap_probability: 0.15 + 0.35 * mood,
        seed,
    }
}

fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{normalize, RawParameters};

    #[test]
    fn test_resolve_scale() {
        let c_major = resolve_scale(0, ScaleMode::Major);
        assert_eq!(c_major.offsets(), &MAJOR_SCALE);
        assert_eq!(c_major.midi_note(0, 0), 60);
        assert_eq!(c_major.midi_note(2, 0), 64);
        assert_eq!(c_major.midi_note(7, 0), 72);
        assert_eq!(c_major.midi_note(-1, 0), 59);
        assert_eq!(c_major.midi_note(0, -2), 36);

        let a_minor = resolve_scale(9, ScaleMode::Minor);
        assert_eq!(a_minor.offsets(), &MINOR_SCALE);
        assert_eq!(a_minor.midi_note(0, 0), 69);
        assert_eq!(a_minor.midi_note(2, 0), 72);
    }

    #[test]
    fn test_midi_to_frequency() {
        assert!((midi_to_frequency(69) - 440.0).abs() < 1e-3);
        assert!((midi_to_frequency(60) - 261.63).abs() < 0.01);
        assert!((midi_to_frequency(81) - 880.0).abs() < 1e-2);
    }

    #[test]
    fn test_seed_is_stable_and_parameter_sensitive() {
        let a = normalize(&RawParameters::default());
        let b = normalize(&RawParameters {
            mood: 0.9,
            ..RawParameters::default()
        });
        let longer = normalize(&RawParameters {
            duration_secs: 30.0,
            ..RawParameters::default()
        });
        assert_eq!(derive_seed(&a), derive_seed(&a));
        assert_ne!(derive_seed(&a), derive_seed(&b));
        assert_eq!(derive_seed(&a), derive_seed(&longer));
    }

    #[test]
    fn test_degree_weights_interpolate() {
        assert_eq!(degree_weights(0.0), CONSONANT_WEIGHTS);
        assert_eq!(degree_weights(1.0), TENSE_WEIGHTS);
        let mid = degree_weights(0.5);
        assert!((mid[0] - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_harmony_is_deterministic() {
        let scale = resolve_scale(0, ScaleMode::Major);
        let a = choose_harmony(&scale, 0.3, 1234);
        let b = choose_harmony(&scale, 0.3, 1234);
        assert_eq!(a, b);
        assert_eq!(a.progression().len(), PROGRESSION_BARS);
        assert_eq!(a.progression()[0], 0);
        assert_eq!(a.melody_note(17, 1, 2), b.melody_note(17, 1, 2));
    }

    #[test]
    fn test_low_mood_has_no_chromatic_notes() {
        let scale = resolve_scale(0, ScaleMode::Major);
        let harmony = choose_harmony(&scale, 0.0, 99);
        assert_eq!(harmony.chromatic_probability(), 0.0);

        // Every melody note stays in C major.
        for step in 0..256 {
            let note = harmony.melody_note(step, step / 16, 1);
            let pitch_class = i32::from(note % 12);
            assert!(MAJOR_SCALE.contains(&pitch_class), "note {} out of key", note);
        }
    }

    #[test]
    fn test_mood_biases_progression() {
        let scale = resolve_scale(0, ScaleMode::Major);
        let tense_degrees = [1, 2, 6];
        let count_tense = |mood: f32| -> usize {
            (0..200u64)
                .map(|seed| choose_harmony(&scale, mood, seed))
                .flat_map(|h| h.progression().to_vec())
                .filter(|degree| tense_degrees.contains(degree))
                .count()
        };
        assert!(count_tense(1.0) > count_tense(0.0));
    }

    #[test]
    fn test_bass_and_arp_follow_chord() {
        let scale = resolve_scale(0, ScaleMode::Major);
        let harmony = choose_harmony(&scale, 0.0, 7);
        // Bar 0 is the tonic.
        assert_eq!(harmony.bass_note(0), 36);
        assert_eq!(harmony.arp_note(0, 0), 72);
        assert_eq!(harmony.arp_note(1, 0), 76);
        assert_eq!(harmony.arp_note(2, 0), 79);
        assert_eq!(harmony.arp_note(3, 0), 84);
    }
}
