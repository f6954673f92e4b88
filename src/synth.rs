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

//! Renders event timelines into PCM.
//!
//! A [`Synthesizer`] owns every voice and effect. It is meant to live for a whole render
//! or live session and be fed consecutive spans: voices that ring past the end of one
//! span keep sounding in the next, and effect tails carry over.

pub mod effects;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod percussion;
pub mod voice;

use std::collections::VecDeque;

use tracing::trace;

use crate::audio::{SampleBuffer, CHANNELS};
use crate::sequencer::{EventKind, Lane, MusicalEvent};
use crate::theory::midi_to_frequency;

use envelope::Envelope;
use mixer::{quantize, Mixer};
use oscillator::{Oscillator, Timbre};
use percussion::Drum;
use voice::{Voice, VoiceGroup, VoiceManager};

/// Default global voice limit.
pub const DEFAULT_MAX_VOICES: usize = 32;

const MELODY_VOICE_LIMIT: usize = 8;
const ARP_VOICE_LIMIT: usize = 4;

/// Turns events into audio, one span at a time.
#[derive(Debug)]
pub struct Synthesizer {
    voices: VoiceManager,
    mixer: Mixer,
    /// Events handed in whose onset lies beyond the spans rendered so far.
    pending: VecDeque<MusicalEvent>,
    /// Absolute sample index of the next frame.
    position: u64,
    mood: f32,
    seed: u64,
    melody_timbre: Timbre,
}

impl Synthesizer {
    /// Creates a synthesizer at sample 0.
    pub fn new(max_voices: usize, seed: u64, mood: f32) -> Synthesizer {
        let mut voices = VoiceManager::new(max_voices);
        voices.set_group_limit(VoiceGroup::Melody, MELODY_VOICE_LIMIT);
        voices.set_group_limit(VoiceGroup::Arp, ARP_VOICE_LIMIT);
        Synthesizer {
            voices,
            mixer: Mixer::new(seed, mood),
            pending: VecDeque::new(),
            position: 0,
            mood,
            seed,
            melody_timbre: Timbre::for_lane(Lane::Melody, mood),
        }
    }

    /// Changes the mood used for new notes and for the effect amounts. Voices already
    /// sounding keep their timbre.
    pub fn set_mood(&mut self, mood: f32) {
        self.mood = mood;
        self.mixer.set_mood(mood);
        self.melody_timbre = Timbre::for_lane(Lane::Melody, mood);
    }

    /// Absolute sample index of the next frame to be rendered.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Voices currently sounding, including ones fading out.
    pub fn active_voices(&self) -> usize {
        self.voices.active_count()
    }

    /// Total energy a lane's bus has produced so far.
    pub fn lane_energy(&self, lane: Lane) -> f64 {
        self.mixer.lane_energy(lane)
    }

    /// Renders the next `length` frames. Each event starts on the frame matching its
    /// onset; events already in the past start on the first frame, and events beyond the
    /// span are held for a later call.
    pub fn render(&mut self, events: &[MusicalEvent], length: usize) -> SampleBuffer {
        self.pending.extend(events.iter().copied());
        self.pending
            .make_contiguous()
            .sort_by_key(|event| event.onset);

        let mut samples = Vec::with_capacity(length * CHANNELS as usize);
        for _ in 0..length {
            let now = self.position;
            while self.pending.front().is_some_and(|event| event.onset <= now) {
                if let Some(event) = self.pending.pop_front() {
                    self.trigger(&event, now);
                }
            }

            let frame = self.mixer.process_frame(self.voices.next_frame());
            samples.extend(frame.map(quantize));
            self.position += 1;
        }

        SampleBuffer::from_interleaved(samples)
    }

    fn trigger(&mut self, event: &MusicalEvent, now: u64) {
        let voice = match event.kind {
            EventKind::Note { lane, midi_note } => {
                let timbre = match lane {
                    Lane::Melody => self.melody_timbre.clone(),
                    _ => Timbre::for_lane(lane, self.mood),
                };
                let group = match lane {
                    Lane::Melody => VoiceGroup::Melody,
                    Lane::Bass => VoiceGroup::Bass,
                    Lane::Arp | Lane::Percussion => VoiceGroup::Arp,
                };
                Voice::tone(
                    group,
                    now,
                    Oscillator::new(midi_to_frequency(midi_note), &timbre),
                    Envelope::for_note(event.duration, self.mood),
                    timbre.gain * event.velocity,
                )
            }
            EventKind::Hit(voice) => {
                let seed = self.seed ^ event.step.wrapping_mul(0x2545_f491_4f6c_dd1d);
                Voice::drum(now, Drum::new(voice, event.duration, seed), event.velocity)
            }
        };
        trace!(event = %event, "Trigger");
        self.voices.add_voice(voice);
    }
}
