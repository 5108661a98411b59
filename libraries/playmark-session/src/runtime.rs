//! Mutable per-session state
//!
//! Owned exclusively by the state machine. Everything else gets a snapshot.

use playmark_core::PlaylistRef;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Live state of one session
#[derive(Debug, Clone)]
pub struct SessionRuntime {
    pub(crate) session_id: Uuid,
    pub(crate) current_track_index: u32,
    pub(crate) started_at_ms: Option<i64>,
    pub(crate) tracks_completed: BTreeSet<u32>,
    pub(crate) current_position_ms: u64,
    pub(crate) current_duration_ms: u64,
    pub(crate) is_playing: bool,
    pub(crate) completion_code: Option<String>,
    pub(crate) aborted: bool,
    pub(crate) last_playing: Option<(u32, u64)>,
    pub(crate) noise_applied: bool,
    pub(crate) observed_ratios: BTreeMap<u32, f64>,
    pub(crate) early_finish_signaled: bool,
    pub(crate) advance_scheduled_for: Option<u32>,
    pub(crate) saved_playlist: Option<PlaylistRef>,
}

impl SessionRuntime {
    /// Runtime for a session that just issued its first play command
    pub(crate) fn started(session_id: Uuid, now_ms: i64) -> Self {
        Self {
            session_id,
            current_track_index: 1,
            started_at_ms: Some(now_ms),
            tracks_completed: BTreeSet::new(),
            current_position_ms: 0,
            current_duration_ms: 0,
            is_playing: false,
            completion_code: None,
            aborted: false,
            last_playing: None,
            noise_applied: false,
            observed_ratios: BTreeMap::new(),
            early_finish_signaled: false,
            advance_scheduled_for: None,
            saved_playlist: None,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// 1-based; 0 before start, past the order length once exhausted
    pub fn current_track_index(&self) -> u32 {
        self.current_track_index
    }

    pub fn started_at_ms(&self) -> Option<i64> {
        self.started_at_ms
    }

    /// Indices of tracks that met the listened ratio
    pub fn tracks_completed(&self) -> &BTreeSet<u32> {
        &self.tracks_completed
    }

    pub fn current_position_ms(&self) -> u64 {
        self.current_position_ms
    }

    pub fn current_duration_ms(&self) -> u64 {
        self.current_duration_ms
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn completion_code(&self) -> Option<&str> {
        self.completion_code.as_deref()
    }

    pub fn is_completed(&self) -> bool {
        self.completion_code.is_some()
    }

    /// Ended without a code because the login expired
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Completed or aborted; nothing moves the session after this
    pub fn is_finished(&self) -> bool {
        self.is_completed() || self.aborted
    }

    pub fn noise_applied(&self) -> bool {
        self.noise_applied
    }

    pub fn saved_playlist(&self) -> Option<&PlaylistRef> {
        self.saved_playlist.as_ref()
    }

    /// Highest ratio seen for a track
    pub fn observed_ratio(&self, track_index: u32) -> Option<f64> {
        self.observed_ratios.get(&track_index).copied()
    }

    /// Milliseconds since start; 0 before start or if the clock went backwards
    pub fn elapsed_ms(&self, now_ms: i64) -> u64 {
        self.started_at_ms
            .map_or(0, |started| u64::try_from(now_ms - started).unwrap_or(0))
    }

    pub(crate) fn all_tracks_done(&self, track_count: u32) -> bool {
        self.tracks_completed.len() == track_count as usize
    }

    pub(crate) fn record_ratio(&mut self, track_index: u32, ratio: f64) {
        let entry = self.observed_ratios.entry(track_index).or_insert(0.0);
        if ratio > *entry {
            *entry = ratio;
        }
    }

    /// Insert into the completed set; returns true when newly added
    pub(crate) fn mark_track_completed(&mut self, track_index: u32) -> bool {
        self.tracks_completed.insert(track_index)
    }

    /// Check-and-set on the completion code
    ///
    /// Returns false (and keeps the existing code) when already completed.
    pub(crate) fn claim_completion(&mut self, code: String) -> bool {
        if self.completion_code.is_some() {
            return false;
        }
        self.completion_code = Some(code);
        true
    }

    /// Observed ratio for each of the first `track_count` tracks, 0 when never seen
    pub(crate) fn per_track_ratios(&self, track_count: u32) -> Vec<f64> {
        (1..=track_count)
            .map(|i| self.observed_ratio(i).unwrap_or(0.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_first_track() {
        let rt = SessionRuntime::started(Uuid::nil(), 1_000);
        assert_eq!(rt.current_track_index(), 1);
        assert_eq!(rt.started_at_ms(), Some(1_000));
        assert!(!rt.is_completed());
        assert!(!rt.is_finished());
        assert!(rt.tracks_completed().is_empty());
    }

    #[test]
    fn aborted_session_is_finished_without_code() {
        let mut rt = SessionRuntime::started(Uuid::nil(), 0);
        rt.aborted = true;
        assert!(rt.is_finished());
        assert!(rt.is_aborted());
        assert!(!rt.is_completed());
    }

    #[test]
    fn elapsed_never_negative() {
        let rt = SessionRuntime::started(Uuid::nil(), 10_000);
        assert_eq!(rt.elapsed_ms(12_500), 2_500);
        assert_eq!(rt.elapsed_ms(9_000), 0);
    }

    #[test]
    fn completion_is_claimed_once() {
        let mut rt = SessionRuntime::started(Uuid::nil(), 0);
        assert!(rt.claim_completion("PM-AAAAAA".into()));
        assert!(!rt.claim_completion("PM-BBBBBB".into()));
        assert_eq!(rt.completion_code(), Some("PM-AAAAAA"));
    }

    #[test]
    fn observed_ratio_keeps_maximum() {
        let mut rt = SessionRuntime::started(Uuid::nil(), 0);
        rt.record_ratio(1, 0.4);
        rt.record_ratio(1, 0.9);
        rt.record_ratio(1, 0.2);
        assert_eq!(rt.observed_ratio(1), Some(0.9));
        assert_eq!(rt.per_track_ratios(3), vec![0.9, 0.0, 0.0]);
    }

    #[test]
    fn marking_twice_reports_once() {
        let mut rt = SessionRuntime::started(Uuid::nil(), 0);
        assert!(rt.mark_track_completed(2));
        assert!(!rt.mark_track_completed(2));
        assert!(!rt.all_tracks_done(3));
        rt.mark_track_completed(1);
        rt.mark_track_completed(3);
        assert!(rt.all_tracks_done(3));
    }
}
