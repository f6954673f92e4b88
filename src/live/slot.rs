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
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::params::ParameterSnapshot;

/// Single-slot handoff of the latest parameter snapshot from the control path to the
/// generation thread. A new offer replaces any snapshot not yet taken, so updates
/// coalesce and never queue up.
#[derive(Debug, Default)]
pub struct PendingSlot {
    slot: Mutex<Option<ParameterSnapshot>>,
    superseded: AtomicU64,
}

impl PendingSlot {
    pub fn new() -> PendingSlot {
        PendingSlot::default()
    }

    /// Stores `snapshot` as the pending update. Returns true if it replaced one that was
    /// never applied.
    pub fn offer(&self, snapshot: ParameterSnapshot) -> bool {
        let replaced = self.slot.lock().replace(snapshot).is_some();
        if replaced {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// Takes the pending update, leaving the slot empty.
    pub fn take(&self) -> Option<ParameterSnapshot> {
        self.slot.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// How many offers were replaced before being applied.
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{normalize, RawParameters};

    fn with_tempo(tempo_bpm: f32) -> ParameterSnapshot {
        normalize(&RawParameters {
            tempo_bpm,
            ..RawParameters::default()
        })
    }

    #[test]
    fn test_latest_offer_wins() {
        let slot = PendingSlot::new();
        assert!(!slot.is_pending());
        assert!(!slot.offer(with_tempo(100.0)));
        assert!(slot.offer(with_tempo(110.0)));
        assert!(slot.offer(with_tempo(120.0)));
        assert!(slot.is_pending());
        assert_eq!(slot.superseded(), 2);

        assert_eq!(slot.take(), Some(with_tempo(120.0)));
        assert_eq!(slot.take(), None);
        assert!(!slot.is_pending());
    }
}
