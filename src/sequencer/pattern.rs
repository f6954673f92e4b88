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

//! The fixed pattern table.
//!
//! A pattern is a one-bar rhythmic template on a 16-step grid plus a four-degree melodic
//! contour. Each slot carries a density level: level 1 slots form the sparse variant and
//! are always played, levels 2-4 join progressively as rhythm density rises, and level 0
//! slots are never played. Every pattern plays on every beat at any density.

/// Beats in one bar.
pub const BEATS_PER_BAR: u64 = 4;

/// Grid steps per beat (sixteenth notes).
pub const STEPS_PER_BEAT: u64 = 4;

/// Grid steps in one bar.
pub const STEPS_PER_BAR: u64 = BEATS_PER_BAR * STEPS_PER_BEAT;

/// Number of patterns in the table.
pub const PATTERN_COUNT: usize = 12;

/// Rhythm density at which a slot of each level starts playing.
const LEVEL_THRESHOLDS: [f32; 5] = [f32::INFINITY, 0.0, 0.3, 0.6, 0.85];

/// A validated index into the pattern table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PatternId(usize);

impl PatternId {
    /// Returns the id if it names a pattern in the table.
    pub fn new(index: usize) -> Option<PatternId> {
        (index < PATTERN_COUNT).then_some(PatternId(index))
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// A rhythmic template and melodic contour.
#[derive(Debug)]
pub struct Pattern {
    /// A short human-readable name.
    pub name: &'static str,
    /// Scale degrees, relative to the current chord root, cycled by successive notes.
    pub contour: [i32; 4],
    /// Density level of each grid slot in the bar.
    pub slots: [u8; STEPS_PER_BAR as usize],
}

impl Pattern {
    /// Whether the slot at `step` (any absolute step index) plays at the given density.
    pub fn is_active(&self, step: u64, density: f32) -> bool {
        let level = self.slots[(step % STEPS_PER_BAR) as usize] as usize;
        density >= LEVEL_THRESHOLDS[level.min(LEVEL_THRESHOLDS.len() - 1)]
    }

    /// Number of steps from `step` to the next slot that plays at the given density.
    pub fn steps_to_next_active(&self, step: u64, density: f32) -> u64 {
        (1..=STEPS_PER_BAR)
            .find(|distance| self.is_active(step + distance, density))
            .unwrap_or(STEPS_PER_BAR)
    }

    /// How many slots of the bar play at the given density.
    pub fn active_slots(&self, density: f32) -> usize {
        (0..STEPS_PER_BAR)
            .filter(|step| self.is_active(*step, density))
            .count()
    }
}

/// Returns the pattern for a validated id.
pub fn pattern(id: PatternId) -> &'static Pattern {
    &PATTERNS[id.index()]
}

/// All patterns in table order.
pub fn all() -> &'static [Pattern] {
    &PATTERNS
}

static PATTERNS: [Pattern; PATTERN_COUNT] = [
    Pattern {
        name: "steady",
        contour: [0, 2, 4, 5],
        slots: [1, 0, 4, 0, 1, 0, 2, 0, 1, 0, 4, 0, 1, 3, 2, 0],
    },
    Pattern {
        name: "descent",
        contour: [5, 3, 2, 0],
        slots: [1, 0, 3, 0, 1, 0, 3, 0, 1, 0, 3, 0, 1, 0, 3, 0],
    },
    Pattern {
        name: "offbeat",
        contour: [0, 4, 6, 3],
        slots: [1, 0, 2, 4, 1, 0, 2, 0, 1, 0, 2, 4, 1, 0, 2, 3],
    },
    Pattern {
        name: "gallop",
        contour: [6, 5, 3, 2],
        slots: [1, 0, 2, 2, 1, 0, 3, 3, 1, 0, 2, 2, 1, 0, 4, 4],
    },
    Pattern {
        name: "syncopated",
        contour: [1, 3, 5, 6],
        slots: [1, 0, 0, 2, 1, 0, 2, 0, 1, 3, 0, 2, 1, 0, 4, 0],
    },
    Pattern {
        name: "lilt",
        contour: [6, 4, 1, 0],
        slots: [1, 0, 0, 2, 1, 0, 0, 2, 1, 0, 0, 3, 1, 0, 4, 0],
    },
    Pattern {
        name: "clave",
        contour: [2, 5, 1, 4],
        slots: [1, 0, 0, 2, 1, 0, 2, 0, 1, 0, 3, 0, 1, 2, 0, 0],
    },
    Pattern {
        name: "rolling",
        contour: [0, 3, 6, 4],
        slots: [1, 4, 2, 4, 1, 4, 2, 4, 1, 4, 2, 4, 1, 3, 2, 3],
    },
    Pattern {
        name: "push",
        contour: [4, 1, 2, 6],
        slots: [1, 0, 3, 2, 1, 0, 0, 2, 1, 0, 3, 2, 1, 0, 4, 2],
    },
    Pattern {
        name: "sparse",
        contour: [3, 0, 5, 2],
        slots: [1, 0, 0, 0, 1, 0, 4, 0, 1, 0, 0, 0, 1, 0, 3, 0],
    },
    Pattern {
        name: "bounce",
        contour: [1, 6, 4, 2],
        slots: [1, 3, 0, 2, 1, 3, 0, 2, 1, 3, 0, 2, 1, 4, 4, 2],
    },
    Pattern {
        name: "drive",
        contour: [4, 2, 0, 3],
        slots: [1, 2, 2, 3, 1, 2, 2, 3, 1, 2, 2, 3, 1, 2, 4, 3],
    },
];
