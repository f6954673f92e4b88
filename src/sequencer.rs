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

//! Expands a pattern into a tempo-locked timeline of events.
//!
//! The grid is a sequence of sixteenth-note steps counted from the start of the render.
//! Onsets are computed from a tempo anchor (a sample index paired with the grid position
//! at that sample), so a tempo change only moves the anchor and the grid stays continuous
//! across it. Each step is emitted exactly once, by whichever span contains its onset.

pub mod event;
pub mod pattern;

use rand::Rng;

use crate::audio::SAMPLE_RATE;
use crate::params::ParameterSnapshot;
use crate::theory::Harmony;

pub use event::{EventKind, Lane, MusicalEvent, PercussionVoice};
pub use pattern::{PatternId, STEPS_PER_BAR, STEPS_PER_BEAT};

/// Fraction of the gap to the next note that a melody note sounds for.
const MELODY_LEGATO: f64 = 0.9;

/// Fraction of two beats that a bass note sounds for.
const BASS_LEGATO: f64 = 0.95;

/// Bass notes land every this many steps (every other beat).
const BASS_INTERVAL_STEPS: u64 = 8;

/// Shortest percussion hit, in samples.
const MIN_HIT_SAMPLES: u64 = 400;

/// Samples in one grid step at the given tempo.
pub fn samples_per_step(tempo_bpm: f32) -> f64 {
    f64::from(SAMPLE_RATE) * 60.0 / f64::from(tempo_bpm) / STEPS_PER_BEAT as f64
}

/// Produces events for consecutive spans of samples.
#[derive(Debug, Clone)]
pub struct Sequencer {
    snapshot: ParameterSnapshot,
    harmony: Harmony,
    /// Sample index of the tempo anchor.
    anchor_sample: u64,
    /// Grid position (in steps) at the anchor sample.
    anchor_position: f64,
    /// First step whose events have not been emitted.
    next_step: u64,
    /// First sample of the next span.
    position: u64,
}

impl Sequencer {
    /// Creates a sequencer at sample 0.
    pub fn new(snapshot: ParameterSnapshot, harmony: Harmony) -> Sequencer {
        Sequencer::starting_at(snapshot, harmony, 0)
    }

    /// Creates a sequencer whose first span starts at `start_sample`, as though it had
    /// been running at constant tempo since sample 0.
    pub fn starting_at(
        snapshot: ParameterSnapshot,
        harmony: Harmony,
        start_sample: u64,
    ) -> Sequencer {
        let mut sequencer = Sequencer {
            snapshot,
            harmony,
            anchor_sample: 0,
            anchor_position: 0.0,
            next_step: 0,
            position: start_sample,
        };
        let mut step = (start_sample as f64 / sequencer.samples_per_step()).floor() as u64;
        while step > 0 && sequencer.onset(step - 1) >= start_sample {
            step -= 1;
        }
        while sequencer.onset(step) < start_sample {
            step += 1;
        }
        sequencer.next_step = step;
        sequencer
    }

    pub fn snapshot(&self) -> &ParameterSnapshot {
        &self.snapshot
    }

    pub fn harmony(&self) -> &Harmony {
        &self.harmony
    }

    pub fn samples_per_step(&self) -> f64 {
        samples_per_step(self.snapshot.tempo_bpm())
    }

    /// First sample of the next span.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// First step that has not been emitted yet.
    pub fn next_step(&self) -> u64 {
        self.next_step
    }

    /// Grid position, in steps, at the start of the next span.
    pub fn grid_position(&self) -> f64 {
        self.grid_position_at(self.position)
    }

    /// Grid position, in steps, at an absolute sample index.
    pub fn grid_position_at(&self, sample: u64) -> f64 {
        let offset = sample as f64 - self.anchor_sample as f64;
        self.anchor_position + offset / self.samples_per_step()
    }

    /// Switches to new parameters at the current position. The grid position is carried
    /// over so the rhythm continues without a jump.
    pub fn retune(&mut self, snapshot: ParameterSnapshot, harmony: Harmony) {
        self.anchor_position = self.grid_position();
        self.anchor_sample = self.position;
        self.snapshot = snapshot;
        self.harmony = harmony;
    }

    /// Emits every event whose onset falls in the next `length` samples and advances the
    /// position past them. Events are in non-decreasing onset order.
    pub fn generate(&mut self, length: u64) -> Vec<MusicalEvent> {
        let start = self.position;
        let end = start + length;
        let mut events = Vec::new();

        loop {
            let onset = self.onset(self.next_step);
            if onset >= end {
                break;
            }
            self.emit_step(self.next_step, onset.max(start), &mut events);
            self.next_step += 1;
        }

        self.position = end;
        events
    }

    fn onset(&self, step: u64) -> u64 {
        let offset = ((step as f64 - self.anchor_position) * self.samples_per_step()).round();
        (self.anchor_sample as f64 + offset).max(0.0) as u64
    }

    fn emit_step(&self, step: u64, onset: u64, events: &mut Vec<MusicalEvent>) {
        let sps = self.samples_per_step();
        let density = self.snapshot.rhythm_density();
        let pattern = pattern::pattern(self.snapshot.pattern());
        let bar = step / STEPS_PER_BAR;
        let slot = step % STEPS_PER_BAR;
        let on_beat = slot % STEPS_PER_BEAT == 0;

        if pattern.is_active(step, density) {
            let bar_start = step - slot;
            let note_index = (bar_start..step)
                .filter(|s| pattern.is_active(*s, density))
                .count();
            let degree = pattern.contour[note_index % pattern.contour.len()];
            let gap = pattern.steps_to_next_active(step, density) as f64;
            events.push(MusicalEvent {
                onset,
                duration: (gap * sps * MELODY_LEGATO).round() as u64,
                kind: EventKind::Note {
                    lane: Lane::Melody,
                    midi_note: self.harmony.melody_note(step, bar, degree),
                },
                velocity: if on_beat { 1.0 } else { 0.75 },
                step,
            });
        }

        if step % BASS_INTERVAL_STEPS == 0 {
            events.push(MusicalEvent {
                onset,
                duration: (BASS_INTERVAL_STEPS as f64 * sps * BASS_LEGATO).round() as u64,
                kind: EventKind::Note {
                    lane: Lane::Bass,
                    midi_note: self.harmony.bass_note(bar),
                },
                velocity: 0.8,
                step,
            });
        }

        events.push(MusicalEvent {
            onset,
            duration: (sps * MELODY_LEGATO).round() as u64,
            kind: EventKind::Note {
                lane: Lane::Arp,
                midi_note: self.harmony.arp_note(step, bar),
            },
            velocity: if on_beat { 0.7 } else { 0.5 },
            step,
        });

        self.emit_percussion(step, onset, events);
    }

    fn emit_percussion(&self, step: u64, onset: u64, events: &mut Vec<MusicalEvent>) {
        let level = self.snapshot.percussion_level();
        if level <= 0.0 {
            return;
        }

        let pattern = pattern::pattern(self.snapshot.pattern());
        let slot = step % STEPS_PER_BAR;
        let hit_length = ((STEPS_PER_BEAT as f64 * self.samples_per_step() / 3.0).round() as u64)
            .max(MIN_HIT_SAMPLES);
        let mut rng = self.harmony.step_rng(step, Lane::Percussion);
        let ghost_roll: f32 = rng.gen();
        let hat_roll: f32 = rng.gen();

        let hit = match slot {
            0 | 8 => Some((PercussionVoice::Kick, 1.0)),
            4 | 12 => Some((PercussionVoice::Snare, 0.8)),
            14 if ghost_roll < 0.5 * level => Some((PercussionVoice::Snare, 0.4)),
            _ if slot % STEPS_PER_BEAT != 0
                && pattern.is_active(step, self.snapshot.rhythm_density())
                && hat_roll < level =>
            {
                Some((PercussionVoice::Hat, 0.5))
            }
            _ => None,
        };

        if let Some((voice, gain)) = hit {
            events.push(MusicalEvent {
                onset,
                duration: hit_length,
                kind: EventKind::Hit(voice),
                velocity: gain * level,
                step,
            });
        }
    }
}

/// Generates the events for `length` samples starting at `start_sample`, assuming the
/// snapshot's tempo has held since sample 0.
pub fn generate_timeline(
    snapshot: &ParameterSnapshot,
    harmony: &Harmony,
    start_sample: u64,
    length: u64,
) -> Vec<MusicalEvent> {
    Sequencer::starting_at(*snapshot, harmony.clone(), start_sample).generate(length)
}
