//! Session state machine
//!
//! One [`SessionStateMachine`] owns one session. It draws the parameters,
//! sequences playback, folds player ticks into the runtime, decides when the
//! session is complete and reports milestones to telemetry and the UI.
//!
//! The machine is a plain value driven through `&mut self`. It never sleeps
//! and never spawns: deferred work goes into a [`Schedule`] and time is read
//! through the injected [`Clock`], so tests can step through a whole session
//! by calling [`SessionStateMachine::run_due_actions`],
//! [`SessionStateMachine::check_completion`] and
//! [`SessionStateMachine::tick_elapsed`] directly.

use crate::adapter::PlayerEventHandler;
use crate::checks::PeriodicChecks;
use crate::error::{Result, SessionError};
use crate::runtime::SessionRuntime;
use crate::schedule::{NoiseStep, Schedule, ScheduledAction};
use crate::signals::{Severity, SessionSignal, SignalSink};
use playmark_core::{
    ApiError, Clock, NoiseKind, NoisePlan, PlaybackDevice, PlaybackTick, PlaylistRef,
    SessionConfig, StreamingApi, TelemetryEnvelope, TelemetryEvent, TelemetrySink, TrackCatalog,
    Visibility,
};
use playmark_policy::SessionRandomizer;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Tick position, relative to the end of the track, at which an advance is scheduled
pub const TRACK_END_WINDOW_MS: u64 = 1_000;

/// Observable session state
///
/// `EarlyFinishEligible` is derived from the runtime, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    EarlyFinishEligible,
    Completed,
    /// Ended without a code; the login expired
    Aborted,
}

impl SessionState {
    /// Running, with or without the early-finish affordance
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running | Self::EarlyFinishEligible)
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub session_id: Option<Uuid>,
    pub current_track_index: u32,
    pub track_count: u32,
    pub tracks_completed: Vec<u32>,
    pub elapsed_ms: u64,
    pub duration_ms: u64,
    pub early_finish_threshold_ms: u64,
    pub completion_code: Option<String>,
    pub saved_playlist: Option<PlaylistRef>,
}

/// Collaborators injected into the machine
#[derive(Clone)]
pub struct SessionDeps {
    pub api: Arc<dyn StreamingApi>,
    pub device: Arc<dyn PlaybackDevice>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub clock: Arc<dyn Clock>,
}

impl SessionDeps {
    fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    fn emit(&self, session_id: Uuid, event: TelemetryEvent) {
        trace!(event = event.name(), "Telemetry");
        self.telemetry
            .emit(TelemetryEnvelope::new(session_id, self.now_ms(), event));
    }

    /// Move playback to the device and start the first track
    async fn begin_playback(
        &self,
        device_id: &str,
        track_uri: &str,
    ) -> playmark_core::Result<()> {
        self.api.transfer_playback(device_id).await?;
        self.api.play(device_id, track_uri).await
    }

    /// Apply the first half of a noise interaction and return the step that undoes it
    async fn begin_noise(&self, plan: &NoisePlan) -> playmark_core::Result<NoiseStep> {
        match plan.kind {
            NoiseKind::PauseResume => {
                self.device.pause().await?;
                Ok(NoiseStep::Resume)
            }
            NoiseKind::VolumeDip => {
                let level = self.device.volume().await?;
                self.device.set_volume(dipped_volume(level, plan.dip_factor)).await?;
                Ok(NoiseStep::RestoreVolume { level })
            }
        }
    }

    async fn end_noise(&self, step: NoiseStep) -> playmark_core::Result<()> {
        match step {
            NoiseStep::Resume => self.device.resume().await,
            NoiseStep::RestoreVolume { level } => self.device.set_volume(level).await,
            NoiseStep::Begin(_) => Ok(()),
        }
    }

    async fn create_session_playlist(
        &self,
        name: &str,
        track_uris: &[String],
    ) -> playmark_core::Result<PlaylistRef> {
        let user = self.api.current_user().await?;
        let playlist = self
            .api
            .create_playlist(&user.id, name, Visibility::Private)
            .await?;
        self.api.add_tracks(&playlist.id, track_uris).await?;
        Ok(playlist)
    }
}

/// Volume after a dip, rounded and kept within 0-100
pub fn dipped_volume(level: u8, factor: f64) -> u8 {
    (f64::from(level) * factor).round().clamp(0.0, 100.0) as u8
}

/// Lifecycle of one listening session
pub struct SessionStateMachine {
    catalog: TrackCatalog,
    randomizer: Box<dyn SessionRandomizer>,
    deps: SessionDeps,
    signals: SignalSink,
    device_id: Option<String>,
    config: Option<SessionConfig>,
    runtime: Option<SessionRuntime>,
    schedule: Schedule,
    checks: Option<PeriodicChecks>,
}

impl SessionStateMachine {
    pub fn new(
        catalog: TrackCatalog,
        randomizer: Box<dyn SessionRandomizer>,
        deps: SessionDeps,
        signals: SignalSink,
    ) -> Self {
        Self {
            catalog,
            randomizer,
            deps,
            signals,
            device_id: None,
            config: None,
            runtime: None,
            schedule: Schedule::new(),
            checks: None,
        }
    }

    // ===== Observation =====

    pub fn state(&self) -> SessionState {
        let (Some(config), Some(runtime)) = (&self.config, &self.runtime) else {
            return SessionState::Idle;
        };
        if runtime.is_completed() {
            return SessionState::Completed;
        }
        if runtime.is_aborted() {
            return SessionState::Aborted;
        }
        if Self::eligible(config, runtime, self.deps.now_ms()) {
            SessionState::EarlyFinishEligible
        } else {
            SessionState::Running
        }
    }

    /// Drawn parameters, once started
    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn runtime(&self) -> Option<&SessionRuntime> {
        self.runtime.as_ref()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Pending deferred actions
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Tokens for the periodic checks, once started
    pub fn periodic_checks(&self) -> Option<&PeriodicChecks> {
        self.checks.as_ref()
    }

    /// Current time on the injected clock
    pub fn now_ms(&self) -> i64 {
        self.deps.now_ms()
    }

    /// Deadline of the earliest pending action
    pub fn next_deadline_ms(&self) -> Option<i64> {
        self.schedule.next_deadline_ms()
    }

    pub fn status(&self) -> SessionStatus {
        let now = self.deps.now_ms();
        let state = self.state();
        let config = self.config.as_ref();
        let runtime = self.runtime.as_ref();

        SessionStatus {
            state,
            session_id: runtime.map(SessionRuntime::session_id),
            current_track_index: runtime.map_or(0, SessionRuntime::current_track_index),
            track_count: config.map_or(0, SessionConfig::track_count),
            tracks_completed: runtime
                .map(|rt| rt.tracks_completed().iter().copied().collect())
                .unwrap_or_default(),
            elapsed_ms: runtime.map_or(0, |rt| rt.elapsed_ms(now)),
            duration_ms: config.map_or(0, |c| c.duration_ms),
            early_finish_threshold_ms: config.map_or(0, |c| c.early_finish_threshold_ms),
            completion_code: runtime.and_then(|rt| rt.completion_code().map(str::to_string)),
            saved_playlist: runtime.and_then(|rt| rt.saved_playlist().cloned()),
        }
    }

    fn eligible(config: &SessionConfig, runtime: &SessionRuntime, now_ms: i64) -> bool {
        runtime.all_tracks_done(config.track_count())
            && runtime.elapsed_ms(now_ms) >= config.early_finish_threshold_ms
    }

    // ===== Start =====

    /// Draw a session and start playing its first track
    ///
    /// Nothing is committed unless both the playback transfer and the first
    /// play command succeed; on failure the machine stays idle and a later
    /// call draws a fresh session.
    ///
    /// # Errors
    /// `DeviceNotReady` before the player reported a device, `AlreadyStarted`
    /// when a session exists, or the API error that aborted the start.
    pub async fn start(&mut self) -> Result<Uuid> {
        if self.runtime.is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        let device_id = self.device_id.clone().ok_or(SessionError::DeviceNotReady)?;

        let config = match self.randomizer.session_config(&self.catalog) {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Failed to draw session config");
                self.signals
                    .message(Severity::Error, format!("Could not start session: {e}"));
                return Err(e.into());
            }
        };
        if !config.satisfies_invariants() {
            error!(?config, "Drawn session config violates its invariants");
            return Err(SessionError::InvalidConfig);
        }
        let first = config.track(1).cloned().ok_or(SessionError::InvalidConfig)?;

        info!(
            device_id = %device_id,
            duration_ms = config.duration_ms,
            early_finish_threshold_ms = config.early_finish_threshold_ms,
            min_track_ratio = config.min_track_ratio,
            "Starting session"
        );

        if let Err(e) = self.deps.begin_playback(&device_id, &first.uri).await {
            error!(error = %e, "Session start failed");
            let text = if e.is_fatal() {
                e.to_string()
            } else {
                format!("Could not start session: {e}")
            };
            self.signals.message(Severity::Error, text);
            return Err(e.into());
        }

        let session_id = Uuid::new_v4();
        let now = self.deps.now_ms();

        self.deps.emit(
            session_id,
            TelemetryEvent::SessionStarted {
                duration_ms: config.duration_ms,
                min_track_ratio: config.min_track_ratio,
                early_finish_threshold_ms: config.early_finish_threshold_ms,
                track_order: config.track_uris(),
                show_save_button: config.show_save_button,
            },
        );
        self.deps.emit(
            session_id,
            TelemetryEvent::TrackStarted {
                track_index: 1,
                track_uri: first.uri.clone(),
                gap_ms: 0,
            },
        );

        self.signals.send(SessionSignal::Started {
            session_id,
            duration_ms: config.duration_ms,
            early_finish_threshold_ms: config.early_finish_threshold_ms,
            min_track_ratio: config.min_track_ratio,
            track_count: config.track_count(),
        });
        if config.show_save_button {
            self.signals.send(SessionSignal::SaveAvailable {
                playlist_name: config.playlist_name.clone(),
            });
        }

        self.runtime = Some(SessionRuntime::started(session_id, now));
        self.config = Some(config);
        self.checks = Some(PeriodicChecks::new());

        info!(session_id = %session_id, "Session started");
        Ok(session_id)
    }

    // ===== Track sequencing =====

    /// Move to the next track in the order
    ///
    /// Past the last track playback is exhausted: no play command is issued
    /// and completion is still decided by [`Self::check_completion`].
    pub async fn advance_track(&mut self) -> Result<()> {
        let (Some(config), Some(runtime)) = (self.config.as_ref(), self.runtime.as_mut()) else {
            return Err(SessionError::NotRunning);
        };
        if runtime.is_finished() {
            debug!("Advance after session end ignored");
            return Ok(());
        }

        let ended = runtime.current_track_index;
        if let Some(track) = config.track(ended) {
            self.deps.emit(
                runtime.session_id,
                TelemetryEvent::TrackEnded {
                    track_index: ended,
                    track_uri: track.uri.clone(),
                    position_ms: runtime.current_position_ms,
                    duration_ms: runtime.current_duration_ms,
                },
            );
        }

        runtime.current_track_index = ended.saturating_add(1);
        let next = runtime.current_track_index;

        if config.track(next).is_none() {
            info!(track_index = next, "Playback exhausted");
            return Ok(());
        }

        let gap_ms =
            u64::try_from(self.randomizer.inter_track_gap().as_millis()).unwrap_or(u64::MAX);
        let now = self.deps.now_ms();
        let track_start = now.saturating_add_unsigned(gap_ms);

        if !runtime.noise_applied {
            if let Some(plan) = self.randomizer.noise_plan() {
                runtime.noise_applied = true;
                let due = track_start.saturating_add_unsigned(plan.offset_ms);
                debug!(track_index = next, kind = plan.kind.as_str(), due, "Noise scheduled");
                self.schedule.push(
                    due,
                    ScheduledAction::Noise {
                        track_index: next,
                        step: NoiseStep::Begin(plan),
                    },
                );
            }
        }

        if gap_ms == 0 {
            self.play_track(next, 0).await;
        } else {
            debug!(track_index = next, gap_ms, "Next track after gap");
            self.schedule.push(
                track_start,
                ScheduledAction::PlayTrack {
                    track_index: next,
                    gap_ms,
                },
            );
        }
        Ok(())
    }

    /// Issue the play command for a track; failures are reported, not retried
    async fn play_track(&mut self, track_index: u32, gap_ms: u64) {
        let (Some(config), Some(runtime)) = (self.config.as_ref(), self.runtime.as_ref()) else {
            return;
        };
        let Some(track) = config.track(track_index) else {
            return;
        };
        let session_id = runtime.session_id;

        let result = match self.device_id.as_deref() {
            Some(device_id) => self.deps.api.play(device_id, &track.uri).await,
            None => Err(ApiError::DeviceNotFound("no device is ready".to_string())),
        };

        match result {
            Ok(()) => {
                info!(track_index, uri = %track.uri, gap_ms, "Playing track");
                self.deps.emit(
                    session_id,
                    TelemetryEvent::TrackStarted {
                        track_index,
                        track_uri: track.uri.clone(),
                        gap_ms,
                    },
                );
            }
            Err(e) => {
                warn!(track_index, uri = %track.uri, error = %e, "Play command failed");
                self.deps.emit(
                    session_id,
                    TelemetryEvent::PlaybackFailed {
                        track_index,
                        message: e.to_string(),
                    },
                );
                self.report_failure(&e, format!("Could not play track {track_index}: {e}"));
            }
        }
    }

    // ===== Deferred actions =====

    /// Run every scheduled action whose deadline has passed
    pub async fn run_due_actions(&mut self) {
        let now = self.deps.now_ms();
        for action in self.schedule.take_due(now) {
            self.run_action(action).await;
        }
    }

    async fn run_action(&mut self, action: ScheduledAction) {
        match action {
            ScheduledAction::Advance { track_index } => {
                if !self.is_current(track_index) {
                    debug!(track_index, "Stale advance dropped");
                    return;
                }
                if let Err(e) = self.advance_track().await {
                    warn!(error = %e, "Scheduled advance failed");
                }
            }
            ScheduledAction::PlayTrack { track_index, gap_ms } => {
                if !self.is_current(track_index) {
                    debug!(track_index, "Stale play dropped");
                    return;
                }
                self.play_track(track_index, gap_ms).await;
            }
            ScheduledAction::Noise { track_index, step } => {
                self.run_noise_step(track_index, step).await;
            }
        }
    }

    /// Session still running and on `track_index`
    fn is_current(&self, track_index: u32) -> bool {
        self.runtime
            .as_ref()
            .is_some_and(|rt| !rt.is_finished() && rt.current_track_index == track_index)
    }

    async fn run_noise_step(&mut self, track_index: u32, step: NoiseStep) {
        let Some(runtime) = self.runtime.as_ref() else {
            return;
        };
        let session_id = runtime.session_id;

        match step {
            NoiseStep::Begin(plan) => {
                if !self.is_current(track_index) {
                    debug!(track_index, "Stale noise dropped");
                    return;
                }
                match self.deps.begin_noise(&plan).await {
                    Ok(undo) => {
                        info!(
                            track_index,
                            kind = plan.kind.as_str(),
                            hold_ms = plan.hold_ms,
                            "Noise injected"
                        );
                        let due = self.deps.now_ms().saturating_add_unsigned(plan.hold_ms);
                        self.schedule.push(
                            due,
                            ScheduledAction::Noise {
                                track_index,
                                step: undo,
                            },
                        );
                        self.deps.emit(
                            session_id,
                            TelemetryEvent::NoiseInjected {
                                track_index,
                                kind: plan.kind,
                            },
                        );
                    }
                    Err(e) => {
                        warn!(track_index, error = %e, "Noise injection failed");
                        self.report_failure(&e, format!("Playback hiccup: {e}"));
                    }
                }
            }
            undo => {
                if let Err(e) = self.deps.end_noise(undo).await {
                    warn!(track_index, error = %e, "Noise restore failed");
                    self.report_failure(&e, format!("Playback hiccup: {e}"));
                }
            }
        }
    }

    // ===== Completion =====

    /// Completion check, run periodically
    ///
    /// Completes the session once the full duration has elapsed and every
    /// track met its ratio; before that, surfaces the early-finish affordance
    /// once the threshold has passed. Returns the code when this call
    /// completed the session.
    pub fn check_completion(&mut self) -> Option<String> {
        let now = self.deps.now_ms();
        let config = self.config.as_ref()?;
        let runtime = self.runtime.as_mut()?;
        if runtime.is_finished() {
            return None;
        }
        if !runtime.all_tracks_done(config.track_count()) {
            return None;
        }

        let elapsed_ms = runtime.elapsed_ms(now);
        if elapsed_ms >= config.duration_ms {
            return self.complete(false);
        }

        if elapsed_ms >= config.early_finish_threshold_ms && !runtime.early_finish_signaled {
            runtime.early_finish_signaled = true;
            info!(elapsed_ms, "Early finish available");
            self.deps.emit(
                runtime.session_id,
                TelemetryEvent::EarlyFinishAvailable { elapsed_ms },
            );
            self.signals.send(SessionSignal::EarlyFinishAvailable);
        }
        None
    }

    /// User-triggered completion
    ///
    /// Returns the existing code, without a second event, when the session is
    /// already complete. Once the full duration has passed the completion is
    /// reported as a regular one.
    ///
    /// # Errors
    /// `NotRunning` before start or after an abort, `NotEligible` until every
    /// track met its ratio and the early-finish threshold passed.
    pub fn finish_early(&mut self) -> Result<String> {
        let now = self.deps.now_ms();
        let (Some(config), Some(runtime)) = (self.config.as_ref(), self.runtime.as_ref()) else {
            return Err(SessionError::NotRunning);
        };
        if let Some(code) = runtime.completion_code() {
            return Ok(code.to_string());
        }
        if runtime.is_aborted() {
            return Err(SessionError::NotRunning);
        }
        if !Self::eligible(config, runtime, now) {
            return Err(SessionError::NotEligible);
        }
        let early = runtime.elapsed_ms(now) < config.duration_ms;
        self.complete(early).ok_or(SessionError::NotRunning)
    }

    /// Terminal transition, guarded by the completion code
    fn complete(&mut self, early: bool) -> Option<String> {
        let now = self.deps.now_ms();
        let config = self.config.as_ref()?;
        let runtime = self.runtime.as_mut()?;
        if runtime.is_finished() {
            return None;
        }

        let code = self.randomizer.completion_code();
        if !runtime.claim_completion(code.clone()) {
            return None;
        }

        if let Some(checks) = &self.checks {
            checks.cancel_all();
        }
        self.schedule.retain(ScheduledAction::is_restore);

        let elapsed_ms = runtime.elapsed_ms(now);
        self.deps.emit(
            runtime.session_id,
            TelemetryEvent::SessionCompleted {
                elapsed_ms,
                track_order: config.track_uris(),
                per_track_ratios: runtime.per_track_ratios(config.track_count()),
                completion_code: code.clone(),
                early,
            },
        );
        self.signals.send(SessionSignal::Completed {
            code: code.clone(),
            early,
        });

        info!(
            session_id = %runtime.session_id,
            code = %code,
            elapsed_ms,
            early,
            "Session completed"
        );
        Some(code)
    }

    /// Report a failed call; an expired login ends the session
    fn report_failure(&mut self, err: &ApiError, text: String) {
        if err.is_fatal() {
            self.abort(&err.to_string());
        } else {
            self.signals.message(Severity::Warning, text);
        }
    }

    /// Terminal transition for a session that can no longer talk to the service
    ///
    /// Stops the periodic checks and drops every pending action, restores
    /// included, since none of them can succeed without a login. The listener
    /// is always asked to sign in again; a finished session keeps its state.
    fn abort(&mut self, reason: &str) {
        self.signals.send(SessionSignal::ReauthRequired {
            message: reason.to_string(),
        });

        let now = self.deps.now_ms();
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        if runtime.is_finished() {
            return;
        }
        runtime.aborted = true;

        if let Some(checks) = &self.checks {
            checks.cancel_all();
        }
        self.schedule.clear();

        let elapsed_ms = runtime.elapsed_ms(now);
        error!(session_id = %runtime.session_id, elapsed_ms, reason, "Session aborted");
        self.deps.emit(
            runtime.session_id,
            TelemetryEvent::SessionAborted {
                elapsed_ms,
                reason: reason.to_string(),
            },
        );
    }

    /// Elapsed-time tick, run once per second
    pub fn tick_elapsed(&self) {
        let (Some(config), Some(runtime)) = (&self.config, &self.runtime) else {
            return;
        };
        if runtime.is_finished() {
            return;
        }
        let elapsed_ms = runtime.elapsed_ms(self.deps.now_ms());
        self.signals.send(SessionSignal::Elapsed {
            elapsed_ms,
            remaining_ms: config.duration_ms.saturating_sub(elapsed_ms),
        });
    }

    // ===== Save playlist =====

    /// Save the session's tracks as a private playlist
    ///
    /// Only offered when the session drew the save button. A successful save
    /// is remembered and returned again on later calls.
    ///
    /// # Errors
    /// `NotRunning` before start, `SaveUnavailable` when the button was not
    /// drawn, or the API error (also surfaced as a warning).
    pub async fn save_playlist(&mut self) -> Result<PlaylistRef> {
        let (Some(config), Some(runtime)) = (self.config.as_ref(), self.runtime.as_ref()) else {
            return Err(SessionError::NotRunning);
        };
        if !config.show_save_button {
            return Err(SessionError::SaveUnavailable);
        }
        if let Some(playlist) = runtime.saved_playlist() {
            return Ok(playlist.clone());
        }

        let session_id = runtime.session_id;
        let result = self
            .deps
            .create_session_playlist(&config.playlist_name, &config.track_uris())
            .await;

        match result {
            Ok(playlist) => {
                info!(playlist_id = %playlist.id, name = %playlist.name, "Playlist saved");
                self.deps.emit(
                    session_id,
                    TelemetryEvent::PlaylistSaved {
                        playlist_id: playlist.id.clone(),
                    },
                );
                self.signals.send(SessionSignal::PlaylistSaved {
                    playlist: playlist.clone(),
                });
                if let Some(runtime) = self.runtime.as_mut() {
                    runtime.saved_playlist = Some(playlist.clone());
                }
                Ok(playlist)
            }
            Err(e) => {
                warn!(error = %e, "Saving playlist failed");
                self.report_failure(&e, format!("Could not save playlist: {e}"));
                Err(e.into())
            }
        }
    }
}

impl PlayerEventHandler for SessionStateMachine {
    fn set_device(&mut self, device_id: String) {
        info!(device_id = %device_id, "Playback device ready");
        self.device_id = Some(device_id);
    }

    fn clear_device(&mut self, device_id: &str) {
        if self.device_id.as_deref() != Some(device_id) {
            return;
        }
        warn!(device_id, "Playback device went offline");
        self.device_id = None;
        if self.state().is_running() {
            self.signals
                .message(Severity::Warning, "Playback device went offline");
        }
    }

    /// Fold a tick into the runtime
    ///
    /// Ticks are the truth about what is playing: one naming a track other
    /// than the current one only updates the mirrored fields.
    fn on_tick(&mut self, tick: PlaybackTick) {
        let (Some(config), Some(runtime)) = (self.config.as_ref(), self.runtime.as_mut()) else {
            return;
        };

        runtime.current_position_ms = tick.position_ms;
        runtime.current_duration_ms = tick.duration_ms;
        runtime.is_playing = !tick.paused;

        if runtime.is_finished() {
            return;
        }
        let index = runtime.current_track_index;
        let Some(current) = config.track(index) else {
            return;
        };
        if !current.matches(&tick.current_track_id) {
            trace!(
                track_index = index,
                reported = %tick.current_track_id,
                "Tick for another track"
            );
            return;
        }

        let ratio = tick.progress_ratio();
        runtime.record_ratio(index, ratio);
        if ratio >= config.min_track_ratio && runtime.mark_track_completed(index) {
            info!(track_index = index, ratio, "Track listened");
        }

        let percent = (ratio * 100.0).round().clamp(0.0, 100.0) as u8;
        self.signals.send(SessionSignal::TrackProgress {
            track_index: index,
            percent,
        });

        let played_up_to = runtime
            .last_playing
            .filter(|(track, _)| *track == index)
            .map(|(_, position)| position);
        runtime.last_playing = (!tick.paused).then_some((index, tick.position_ms));

        let near_end = tick.duration_ms > 0
            && tick.position_ms >= tick.duration_ms.saturating_sub(TRACK_END_WINDOW_MS);
        // Polls can miss the final second; a listened track that went from
        // playing to paused at zero has ended
        let rolled_over = tick.paused
            && tick.position_ms == 0
            && played_up_to.is_some_and(|position| position > 0)
            && runtime.tracks_completed.contains(&index);
        let ended = (near_end && runtime.is_playing) || rolled_over;
        if ended && runtime.advance_scheduled_for != Some(index) {
            runtime.advance_scheduled_for = Some(index);
            let delay_ms =
                u64::try_from(self.randomizer.advance_delay().as_millis()).unwrap_or(u64::MAX);
            let due = self.deps.now_ms().saturating_add_unsigned(delay_ms);
            debug!(track_index = index, due, "Advance scheduled");
            self.schedule
                .push(due, ScheduledAction::Advance { track_index: index });
        }
    }

    fn report_player_error(&mut self, message: &str, fatal: bool) {
        warn!(player_message = %message, fatal, "Player error");
        if fatal {
            self.abort(message);
        } else {
            self.signals
                .message(Severity::Warning, format!("Player error: {message}"));
        }
    }
}
