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

//! The state owned by a live session's generation thread.
//!
//! A [`Generator`] turns the current snapshot into fixed-size chunks. It is a plain
//! synchronous object: the session loop drives it, and tests can drive it directly.

use tracing::debug;

use crate::audio::SampleBuffer;
use crate::params::ParameterSnapshot;
use crate::sequencer::Sequencer;
use crate::synth::Synthesizer;
use crate::theory::{choose_harmony, derive_seed, resolve_scale, Harmony};

use super::slot::PendingSlot;

/// One chunk and where it sits on the rhythmic grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedChunk {
    pub audio: SampleBuffer,
    /// Grid position, in steps, at the first frame.
    pub grid_start: f64,
    /// Grid position, in steps, just after the last frame.
    pub grid_end: f64,
    /// Whether a pending update was applied at the start of this chunk.
    pub retuned: bool,
}

/// Produces consecutive chunks, applying parameter updates only between them.
#[derive(Debug)]
pub struct Generator {
    sequencer: Sequencer,
    synth: Synthesizer,
    chunk_frames: usize,
    chunks: u64,
}

impl Generator {
    pub fn new(snapshot: ParameterSnapshot, chunk_frames: usize, max_voices: usize) -> Generator {
        let seed = derive_seed(&snapshot);
        Generator {
            sequencer: Sequencer::new(snapshot, harmony_for(&snapshot, seed)),
            synth: Synthesizer::new(max_voices, seed, snapshot.mood()),
            chunk_frames: chunk_frames.max(1),
            chunks: 0,
        }
    }

    /// The snapshot currently being played.
    pub fn snapshot(&self) -> &ParameterSnapshot {
        self.sequencer.snapshot()
    }

    /// Grid position, in steps, at the start of the next chunk.
    pub fn grid_position(&self) -> f64 {
        self.sequencer.grid_position()
    }

    pub fn chunk_frames(&self) -> usize {
        self.chunk_frames
    }

    /// Chunks produced so far.
    pub fn chunks(&self) -> u64 {
        self.chunks
    }

    /// Switches to a new snapshot. The grid continues from its current position and
    /// sounding voices ring out; only new events use the new settings.
    pub fn apply(&mut self, snapshot: ParameterSnapshot) {
        let harmony = harmony_for(&snapshot, derive_seed(&snapshot));
        debug!(chunk = self.chunks, "Applying {}", snapshot);
        self.sequencer.retune(snapshot, harmony);
        self.synth.set_mood(snapshot.mood());
    }

    /// Applies the pending update, if any, then renders one chunk.
    pub fn next_chunk(&mut self, pending: &PendingSlot) -> GeneratedChunk {
        let retuned = match pending.take() {
            Some(snapshot) => {
                self.apply(snapshot);
                true
            }
            None => false,
        };

        let grid_start = self.sequencer.grid_position();
        let events = self.sequencer.generate(self.chunk_frames as u64);
        let audio = self.synth.render(&events, self.chunk_frames);
        self.chunks += 1;

        GeneratedChunk {
            audio,
            grid_start,
            grid_end: self.sequencer.grid_position(),
            retuned,
        }
    }
}

fn harmony_for(snapshot: &ParameterSnapshot, seed: u64) -> Harmony {
    let scale = resolve_scale(snapshot.key(), snapshot.mode());
    choose_harmony(&scale, snapshot.mood(), seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{normalize, RawParameters};
    use crate::render;
    use crate::sequencer::STEPS_PER_BAR;
    use crate::synth::DEFAULT_MAX_VOICES;

    fn snapshot(raw: RawParameters) -> ParameterSnapshot {
        normalize(&raw)
    }

    #[test]
    fn test_chunks_are_fixed_size() {
        let pending = PendingSlot::new();
        let mut generator = Generator::new(ParameterSnapshot::default(), 512, DEFAULT_MAX_VOICES);
        for _ in 0..5 {
            assert_eq!(generator.next_chunk(&pending).audio.frames(), 512);
        }
        assert_eq!(generator.chunks(), 5);
    }

    #[test]
    fn test_steady_session_matches_offline_render() {
        let params = snapshot(RawParameters {
            duration_secs: 1.0,
            tempo_bpm: 128.0,
            percussion_level: 0.8,
            ..RawParameters::default()
        });
        let pending = PendingSlot::new();
        let mut generator = Generator::new(params, 1024, DEFAULT_MAX_VOICES);

        let mut joined = SampleBuffer::default();
        while joined.frames() < 44100 {
            joined.extend(&generator.next_chunk(&pending).audio);
        }
        let offline = render::generate(&params);
        assert_eq!(&joined.samples()[..offline.samples().len()], offline.samples());
    }

    #[test]
    fn test_grid_phase_is_continuous_across_updates() {
        let pending = PendingSlot::new();
        let mut generator = Generator::new(ParameterSnapshot::default(), 1024, DEFAULT_MAX_VOICES);

        let mut previous_end = generator.grid_position();
        for chunk in 0..120 {
            match chunk {
                30 => {
                    pending.offer(snapshot(RawParameters {
                        tempo_bpm: 160.0,
                        pattern_id: 4,
                        ..RawParameters::default()
                    }));
                }
                75 => {
                    pending.offer(snapshot(RawParameters {
                        tempo_bpm: 71.0,
                        is_minor: true,
                        ..RawParameters::default()
                    }));
                }
                _ => {}
            }

            let generated = generator.next_chunk(&pending);
            assert_eq!(generated.retuned, chunk == 30 || chunk == 75);
            assert_eq!(
                generated.grid_start % STEPS_PER_BAR as f64,
                previous_end % STEPS_PER_BAR as f64,
                "phase jump at chunk {}",
                chunk
            );
            assert!(generated.grid_end > generated.grid_start);
            previous_end = generated.grid_end;
        }
        assert_eq!(generator.snapshot().tempo_bpm(), 71.0);
    }

    #[test]
    fn test_rapid_updates_coalesce() {
        let first = snapshot(RawParameters::default());
        let updates = [
            snapshot(RawParameters {
                tempo_bpm: 100.0,
                mood: 0.1,
                ..RawParameters::default()
            }),
            snapshot(RawParameters {
                tempo_bpm: 140.0,
                pattern_id: 3,
                ..RawParameters::default()
            }),
            snapshot(RawParameters {
                tempo_bpm: 180.0,
                key_index: 7,
                mood: 0.9,
                percussion_level: 1.0,
                ..RawParameters::default()
            }),
        ];

        let pending = PendingSlot::new();
        let mut coalesced = Generator::new(first, 1024, DEFAULT_MAX_VOICES);
        coalesced.next_chunk(&pending);
        for update in updates {
            pending.offer(update);
        }
        let after_updates = coalesced.next_chunk(&pending);
        assert!(after_updates.retuned);
        assert_eq!(coalesced.snapshot(), &updates[2]);
        assert_eq!(pending.superseded(), 2);

        // The chunk is exactly what the last update alone would have produced.
        let direct_slot = PendingSlot::new();
        let mut direct = Generator::new(first, 1024, DEFAULT_MAX_VOICES);
        direct.next_chunk(&direct_slot);
        direct_slot.offer(updates[2]);
        assert_eq!(direct.next_chunk(&direct_slot), after_updates);
    }
}
