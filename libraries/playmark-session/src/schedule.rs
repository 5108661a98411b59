//! Deferred actions
//!
//! The state machine never sleeps. Anything that must happen later (the
//! advance after a track ends, the next play command after a gap, the two
//! halves of a noise interaction) is recorded here with an absolute
//! deadline. The driver sleeps until [`Schedule::next_deadline_ms`] and then
//! asks the machine to run whatever is due; tests do the same by moving a
//! manual clock.

use playmark_core::NoisePlan;
use std::collections::BTreeMap;

/// One step of a noise interaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseStep {
    /// Pause or dip the volume
    Begin(NoisePlan),
    /// Undo a pause
    Resume,
    /// Undo a dip
    RestoreVolume { level: u8 },
}

/// Work the machine performs once its deadline passes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScheduledAction {
    /// Move past a track that is about to end
    Advance { track_index: u32 },
    /// Issue the play command for a track after its gap
    PlayTrack { track_index: u32, gap_ms: u64 },
    /// Noise interaction step
    Noise { track_index: u32, step: NoiseStep },
}

impl ScheduledAction {
    /// Steps that undo a transient change and must run even after completion
    pub fn is_restore(&self) -> bool {
        matches!(
            self,
            Self::Noise {
                step: NoiseStep::Resume | NoiseStep::RestoreVolume { .. },
                ..
            }
        )
    }
}

/// Deadline-ordered action queue
///
/// Actions with equal deadlines run in insertion order.
#[derive(Debug, Default)]
pub struct Schedule {
    entries: BTreeMap<(i64, u64), ScheduledAction>,
    next_seq: u64,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action for `due_at_ms`
    pub fn push(&mut self, due_at_ms: i64, action: ScheduledAction) {
        self.entries.insert((due_at_ms, self.next_seq), action);
        self.next_seq += 1;
    }

    /// Earliest deadline
    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Remove and return every action due at or before `now_ms`, in order
    pub fn take_due(&mut self, now_ms: i64) -> Vec<ScheduledAction> {
        let later = self.entries.split_off(&(now_ms.saturating_add(1), 0));
        let due = std::mem::replace(&mut self.entries, later);
        due.into_values().collect()
    }

    /// Keep only actions matching the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&ScheduledAction) -> bool) {
        self.entries.retain(|_, action| keep(action));
    }

    /// Drop every pending action
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pending actions in deadline order
    pub fn iter(&self) -> impl Iterator<Item = (i64, &ScheduledAction)> {
        self.entries.iter().map(|((due, _), action)| (*due, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playmark_core::NoiseKind;

    #[test]
    fn due_actions_come_out_in_deadline_order() {
        let mut schedule = Schedule::new();
        schedule.push(300, ScheduledAction::Advance { track_index: 3 });
        schedule.push(100, ScheduledAction::Advance { track_index: 1 });
        schedule.push(200, ScheduledAction::Advance { track_index: 2 });

        assert_eq!(schedule.next_deadline_ms(), Some(100));

        let due = schedule.take_due(200);
        assert_eq!(
            due,
            vec![
                ScheduledAction::Advance { track_index: 1 },
                ScheduledAction::Advance { track_index: 2 },
            ]
        );
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.next_deadline_ms(), Some(300));
    }

    #[test]
    fn equal_deadlines_keep_insertion_order() {
        let mut schedule = Schedule::new();
        schedule.push(50, ScheduledAction::PlayTrack { track_index: 2, gap_ms: 0 });
        schedule.push(50, ScheduledAction::Advance { track_index: 2 });

        let due = schedule.take_due(50);
        assert!(matches!(due[0], ScheduledAction::PlayTrack { .. }));
        assert!(matches!(due[1], ScheduledAction::Advance { .. }));
        assert!(schedule.is_empty());
    }

    #[test]
    fn nothing_due_before_deadline() {
        let mut schedule = Schedule::new();
        schedule.push(1_000, ScheduledAction::Advance { track_index: 1 });
        assert!(schedule.take_due(999).is_empty());
        assert_eq!(schedule.len(), 1);
    }

    #[test]
    fn retain_keeps_restores() {
        let plan = NoisePlan {
            kind: NoiseKind::VolumeDip,
            offset_ms: 10,
            hold_ms: 10,
            dip_factor: 0.5,
        };
        let mut schedule = Schedule::new();
        schedule.push(1, ScheduledAction::Advance { track_index: 1 });
        schedule.push(
            2,
            ScheduledAction::Noise {
                track_index: 1,
                step: NoiseStep::Begin(plan),
            },
        );
        schedule.push(
            3,
            ScheduledAction::Noise {
                track_index: 1,
                step: NoiseStep::RestoreVolume { level: 70 },
            },
        );
        schedule.push(
            4,
            ScheduledAction::Noise {
                track_index: 1,
                step: NoiseStep::Resume,
            },
        );

        schedule.retain(ScheduledAction::is_restore);

        let remaining: Vec<_> = schedule.iter().map(|(due, _)| due).collect();
        assert_eq!(remaining, vec![3, 4]);

        schedule.clear();
        assert!(schedule.is_empty());
        assert_eq!(schedule.next_deadline_ms(), None);
    }
}
