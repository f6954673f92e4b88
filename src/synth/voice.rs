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

//! Voice management for the synthesizer.
//!
//! Handles voice allocation, retriggering, and stealing. A stolen or cut voice is not
//! dropped on the spot: it fades out over a few milliseconds so it never clicks.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::sequencer::event::LANE_COUNT;
use crate::sequencer::{Lane, PercussionVoice};

use super::envelope::{Envelope, Fade};
use super::oscillator::Oscillator;
use super::percussion::Drum;

/// Samples over which a cut or stolen voice fades out.
pub const STEAL_FADE_SAMPLES: u64 = 64;

/// What happens to sounding voices of the same group when a new one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetriggerBehavior {
    /// The previous voice in the group is cut.
    Cut,
    /// Voices overlap, up to the group limit.
    Polyphonic,
}

/// Voices are limited and retriggered per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceGroup {
    Melody,
    Bass,
    Arp,
    Drum(PercussionVoice),
}

impl VoiceGroup {
    pub fn lane(&self) -> Lane {
        match self {
            VoiceGroup::Melody => Lane::Melody,
            VoiceGroup::Bass => Lane::Bass,
            VoiceGroup::Arp => Lane::Arp,
            VoiceGroup::Drum(_) => Lane::Percussion,
        }
    }

    pub fn retrigger(&self) -> RetriggerBehavior {
        match self {
            VoiceGroup::Melody | VoiceGroup::Arp => RetriggerBehavior::Polyphonic,
            VoiceGroup::Bass | VoiceGroup::Drum(_) => RetriggerBehavior::Cut,
        }
    }
}

/// The sound-producing part of a voice.
#[derive(Debug, Clone)]
pub enum VoiceSource {
    Tone {
        oscillator: Oscillator,
        envelope: Envelope,
    },
    Drum(Drum),
}

/// Mutable state of one sounding note or hit.
#[derive(Debug, Clone)]
pub struct Voice {
    id: u64,
    group: VoiceGroup,
    /// Absolute sample index at which the voice started.
    started_at: u64,
    source: VoiceSource,
    gain: f32,
    fade: Option<Fade>,
}

impl Voice {
    /// A melodic voice.
    pub fn tone(
        group: VoiceGroup,
        started_at: u64,
        oscillator: Oscillator,
        envelope: Envelope,
        gain: f32,
    ) -> Voice {
        Voice {
            id: 0,
            group,
            started_at,
            source: VoiceSource::Tone {
                oscillator,
                envelope,
            },
            gain,
            fade: None,
        }
    }

    /// A percussion voice.
    pub fn drum(started_at: u64, drum: Drum, gain: f32) -> Voice {
        Voice {
            id: 0,
            group: VoiceGroup::Drum(drum.voice()),
            started_at,
            source: VoiceSource::Drum(drum),
            gain,
            fade: None,
        }
    }

    pub fn group(&self) -> VoiceGroup {
        self.group
    }

    pub fn is_finished(&self) -> bool {
        if self.fade.as_ref().is_some_and(Fade::is_finished) {
            return true;
        }
        match &self.source {
            VoiceSource::Tone { envelope, .. } => envelope.is_finished(),
            VoiceSource::Drum(drum) => drum.is_finished(),
        }
    }

    fn begin_fade(&mut self) {
        if self.fade.is_none() {
            self.fade = Some(Fade::new(STEAL_FADE_SAMPLES));
        }
    }

    /// Returns the next sample and advances.
    pub fn next(&mut self) -> f32 {
        let raw = match &mut self.source {
            VoiceSource::Tone {
                oscillator,
                envelope,
            } => oscillator.next() * envelope.next(),
            VoiceSource::Drum(drum) => drum.next(),
        };
        let fade = self.fade.as_mut().map_or(1.0, Fade::next);
        raw * self.gain * fade
    }
}

/// Per-lane mono mix of one frame, indexed by `Lane as usize`.
pub type LaneFrame = [f32; LANE_COUNT];

/// Manages active voices.
pub struct VoiceManager {
    /// Voices that are playing normally.
    voices: Vec<Voice>,
    /// Voices that were cut or stolen and are fading out.
    fading: Vec<Voice>,
    /// Global maximum voices limit.
    max_voices: usize,
    /// Per-group voice limits.
    group_limits: HashMap<VoiceGroup, usize>,
    next_id: u64,
}

impl VoiceManager {
    /// Creates a new voice manager.
    pub fn new(max_voices: usize) -> Self {
        Self {
            voices: Vec::new(),
            fading: Vec::new(),
            max_voices: max_voices.max(1),
            group_limits: HashMap::new(),
            next_id: 1,
        }
    }

    /// Sets the voice limit for a group.
    pub fn set_group_limit(&mut self, group: VoiceGroup, limit: usize) {
        self.group_limits.insert(group, limit.max(1));
    }

    /// Adds a new voice, cutting or stealing older voices as the group's retrigger
    /// behavior and the limits require. Returns how many voices were cut or stolen.
    pub fn add_voice(&mut self, mut voice: Voice) -> usize {
        voice.id = self.next_id;
        self.next_id += 1;
        let group = voice.group;
        let mut stopped = 0;

        match group.retrigger() {
            RetriggerBehavior::Cut => {
                stopped += self.stop_where(|v| v.group == group);
            }
            RetriggerBehavior::Polyphonic => {
                if let Some(&limit) = self.group_limits.get(&group) {
                    let count = self.voices.iter().filter(|v| v.group == group).count();
                    if count >= limit {
                        if let Some(oldest) = self.oldest(|v| v.group == group) {
                            stopped += self.stop_where(|v| v.id == oldest);
                            debug!(group = ?group, limit, "Group voice limit reached, stealing oldest");
                        }
                    }
                }
            }
        }

        if self.voices.len() >= self.max_voices {
            if let Some(oldest) = self.oldest(|_| true) {
                stopped += self.stop_where(|v| v.id == oldest);
                warn!(
                    max_voices = self.max_voices,
                    "Global voice limit reached, stealing oldest"
                );
            }
        }

        self.voices.push(voice);
        stopped
    }

    /// Mixes one frame of every voice into per-lane sums and drops finished voices.
    pub fn next_frame(&mut self) -> LaneFrame {
        let mut frame = [0.0; LANE_COUNT];
        for voice in self.voices.iter_mut().chain(self.fading.iter_mut()) {
            frame[voice.group.lane() as usize] += voice.next();
        }
        self.voices.retain(|v| !v.is_finished());
        self.fading.retain(|v| !v.is_finished());
        frame
    }

    /// Returns the current number of voices, including ones fading out.
    pub fn active_count(&self) -> usize {
        self.voices.len() + self.fading.len()
    }

    /// Returns the number of voices playing normally.
    pub fn playing_count(&self) -> usize {
        self.voices.len()
    }

    fn oldest(&self, filter: impl Fn(&Voice) -> bool) -> Option<u64> {
        self.voices
            .iter()
            .filter(|v| filter(v))
            .min_by_key(|v| (v.started_at, v.id))
            .map(|v| v.id)
    }

    fn stop_where(&mut self, filter: impl Fn(&Voice) -> bool) -> usize {
        let mut stopped = 0;
        let mut index = 0;
        while index < self.voices.len() {
            if filter(&self.voices[index]) {
                let mut voice = self.voices.swap_remove(index);
                voice.begin_fade();
                self.fading.push(voice);
                stopped += 1;
            } else {
                index += 1;
            }
        }
        stopped
    }
}

impl std::fmt::Debug for VoiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceManager")
            .field("active_voices", &self.voices.len())
            .field("fading_voices", &self.fading.len())
            .field("max_voices", &self.max_voices)
            .finish()
    }
}
