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
use std::fmt;

/// The voice lane an event belongs to. Onsets within a lane never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lane {
    Melody,
    Bass,
    Arp,
    Percussion,
}

/// Number of lanes.
pub const LANE_COUNT: usize = 4;

impl Lane {
    pub const ALL: [Lane; LANE_COUNT] = [Lane::Melody, Lane::Bass, Lane::Arp, Lane::Percussion];
}

/// The percussion voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PercussionVoice {
    Kick,
    Snare,
    Hat,
}

/// What an event plays.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// A pitched note on a melodic lane.
    Note { lane: Lane, midi_note: u8 },
    /// A percussion hit.
    Hit(PercussionVoice),
}

/// A timestamped instruction for the synthesizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MusicalEvent {
    /// Absolute sample index at which the event starts.
    pub onset: u64,
    /// Length in samples.
    pub duration: u64,
    /// What to play.
    pub kind: EventKind,
    /// Gain, 0.0 to 1.0.
    pub velocity: f32,
    /// Absolute grid step the event was generated from.
    pub step: u64,
}

impl MusicalEvent {
    pub fn lane(&self) -> Lane {
        match self.kind {
            EventKind::Note { lane, .. } => lane,
            EventKind::Hit(_) => Lane::Percussion,
        }
    }

    pub fn is_percussion(&self) -> bool {
        matches!(self.kind, EventKind::Hit(_))
    }
}

impl fmt::Display for MusicalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::Note { lane, midi_note } => write!(
                f,
                "{:?} note {} @{} for {} (vel {:.2})",
                lane, midi_note, self.onset, self.duration, self.velocity
            ),
            EventKind::Hit(voice) => write!(
                f,
                "{:?} @{} for {} (vel {:.2})",
                voice, self.onset, self.duration, self.velocity
            ),
        }
    }
}
