//! Shared fakes for session tests
//!
//! Every collaborator records what it was asked to do and can be told to
//! fail, so tests assert on calls instead of mocking expectations up front.

#![allow(dead_code)]

use async_trait::async_trait;
use playmark_core::{
    ApiError, Clock, ManualClock, NoisePlan, PlaybackDevice, PlaybackTick, PlaylistRef,
    SessionConfig, StreamingApi, TelemetryEnvelope, TelemetryEvent, TelemetrySink, TrackCatalog,
    TrackRef, TrackRole, UserProfile, Visibility,
};
use playmark_policy::draw::draw_completion_code;
use playmark_policy::SessionRandomizer;
use playmark_session::{
    PlayerEventHandler, SessionDeps, SessionSignal, SessionStateMachine, SignalSink,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const START_MS: i64 = 1_700_000_000_000;
pub const TRACK_DURATION_MS: u64 = 200_000;
pub const DEVICE_ID: &str = "device-1";

// ===== Fixtures =====

pub fn anchor() -> TrackRef {
    TrackRef::new(TrackRole::Anchor, "anchor0000000000000001", "Anchor")
}

pub fn primary() -> TrackRef {
    TrackRef::new(TrackRole::Primary, "primary000000000000001", "Primary")
}

pub fn filler() -> TrackRef {
    TrackRef::new(TrackRole::Filler, "filler0000000000000001", "Filler")
}

pub fn catalog() -> TrackCatalog {
    TrackCatalog::new(
        anchor(),
        primary(),
        vec![
            filler(),
            TrackRef::new(TrackRole::Filler, "filler0000000000000002", "Filler 2"),
        ],
    )
}

/// 300 s session, ratio 0.8, early finish at 240 s
pub fn session_config() -> SessionConfig {
    SessionConfig {
        duration_ms: 300_000,
        min_track_ratio: 0.8,
        early_finish_threshold_ms: 240_000,
        track_order: vec![anchor(), primary(), filler()],
        show_save_button: false,
        playlist_name: "Quiet Harbor".into(),
    }
}

/// `PM-` followed by six characters from `[0-9A-Z]`
pub fn is_completion_code(code: &str) -> bool {
    code.len() == 9
        && code.starts_with("PM-")
        && code[3..]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
}

// ===== Streaming API =====

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CurrentUser,
    CreatePlaylist {
        owner_id: String,
        name: String,
        visibility: Visibility,
    },
    AddTracks {
        playlist_id: String,
        track_uris: Vec<String>,
    },
    Transfer(String),
    Play {
        device_id: String,
        track_uri: String,
    },
}

#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<ApiCall>>,
    transfer_failure: Mutex<Option<ApiError>>,
    play_failures: Mutex<VecDeque<ApiError>>,
    add_tracks_failure: Mutex<Option<ApiError>>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    /// URIs passed to `play`, in order
    pub fn played(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ApiCall::Play { track_uri, .. } => Some(track_uri),
                _ => None,
            })
            .collect()
    }

    /// Fail every transfer until cleared
    pub fn fail_transfer(&self, err: Option<ApiError>) {
        *self.transfer_failure.lock().unwrap() = err;
    }

    /// Fail the next `play` call
    pub fn fail_next_play(&self, err: ApiError) {
        self.play_failures.lock().unwrap().push_back(err);
    }

    pub fn fail_add_tracks(&self, err: Option<ApiError>) {
        *self.add_tracks_failure.lock().unwrap() = err;
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StreamingApi for FakeApi {
    async fn current_user(&self) -> playmark_core::Result<UserProfile> {
        self.record(ApiCall::CurrentUser);
        Ok(UserProfile {
            id: "listener".into(),
            display_name: Some("Listener".into()),
        })
    }

    async fn create_playlist(
        &self,
        owner_id: &str,
        name: &str,
        visibility: Visibility,
    ) -> playmark_core::Result<PlaylistRef> {
        self.record(ApiCall::CreatePlaylist {
            owner_id: owner_id.into(),
            name: name.into(),
            visibility,
        });
        Ok(PlaylistRef {
            id: "playlist-1".into(),
            name: name.into(),
            uri: Some("spotify:playlist:playlist-1".into()),
        })
    }

    async fn add_tracks(&self, playlist_id: &str, track_uris: &[String]) -> playmark_core::Result<()> {
        self.record(ApiCall::AddTracks {
            playlist_id: playlist_id.into(),
            track_uris: track_uris.to_vec(),
        });
        match self.add_tracks_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn transfer_playback(&self, device_id: &str) -> playmark_core::Result<()> {
        self.record(ApiCall::Transfer(device_id.into()));
        match self.transfer_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn play(&self, device_id: &str, track_uri: &str) -> playmark_core::Result<()> {
        self.record(ApiCall::Play {
            device_id: device_id.into(),
            track_uri: track_uri.into(),
        });
        match self.play_failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// ===== Playback device =====

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Pause,
    Resume,
    Seek(u64),
    Volume,
    SetVolume(u8),
}

pub struct FakeDevice {
    calls: Mutex<Vec<DeviceCall>>,
    volume: Mutex<u8>,
    pause_failure: Mutex<Option<ApiError>>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            volume: Mutex::new(80),
            pause_failure: Mutex::new(None),
        }
    }
}

impl FakeDevice {
    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn current_volume(&self) -> u8 {
        *self.volume.lock().unwrap()
    }

    pub fn fail_pause(&self, err: Option<ApiError>) {
        *self.pause_failure.lock().unwrap() = err;
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PlaybackDevice for FakeDevice {
    async fn pause(&self) -> playmark_core::Result<()> {
        self.record(DeviceCall::Pause);
        match self.pause_failure.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn resume(&self) -> playmark_core::Result<()> {
        self.record(DeviceCall::Resume);
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> playmark_core::Result<()> {
        self.record(DeviceCall::Seek(position_ms));
        Ok(())
    }

    async fn volume(&self) -> playmark_core::Result<u8> {
        self.record(DeviceCall::Volume);
        Ok(self.current_volume())
    }

    async fn set_volume(&self, level: u8) -> playmark_core::Result<()> {
        self.record(DeviceCall::SetVolume(level));
        *self.volume.lock().unwrap() = level;
        Ok(())
    }
}

// ===== Telemetry =====

#[derive(Default)]
pub struct RecordingTelemetry {
    envelopes: Mutex<Vec<TelemetryEnvelope>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.envelopes
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event.clone())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }

    pub fn last(&self, name: &str) -> Option<TelemetryEvent> {
        self.events().into_iter().rev().find(|e| e.name() == name)
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn emit(&self, envelope: TelemetryEnvelope) {
        self.envelopes.lock().unwrap().push(envelope);
    }
}

// ===== Randomizer =====

struct Script {
    config: SessionConfig,
    gaps: VecDeque<Duration>,
    noise: VecDeque<Option<NoisePlan>>,
    advance_delay: Duration,
    rng: StdRng,
    config_draws: usize,
    noise_draws: usize,
}

/// Randomizer returning scripted values
///
/// Clones share the script, so a test keeps one clone after handing the
/// other to the machine. Gaps and noise plans default to "immediate" and
/// "none" once their queues run dry. Codes come from the real code drawer
/// with a fixed seed.
#[derive(Clone)]
pub struct ScriptedRandomizer {
    script: Arc<Mutex<Script>>,
}

impl ScriptedRandomizer {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                config,
                gaps: VecDeque::new(),
                noise: VecDeque::new(),
                advance_delay: Duration::from_millis(500),
                rng: StdRng::seed_from_u64(42),
                config_draws: 0,
                noise_draws: 0,
            })),
        }
    }

    pub fn push_gap(&self, gap: Duration) {
        self.script.lock().unwrap().gaps.push_back(gap);
    }

    pub fn push_noise(&self, plan: Option<NoisePlan>) {
        self.script.lock().unwrap().noise.push_back(plan);
    }

    pub fn config_draws(&self) -> usize {
        self.script.lock().unwrap().config_draws
    }

    pub fn noise_draws(&self) -> usize {
        self.script.lock().unwrap().noise_draws
    }

    pub fn advance_delay_ms(&self) -> i64 {
        self.script.lock().unwrap().advance_delay.as_millis() as i64
    }
}

impl SessionRandomizer for ScriptedRandomizer {
    fn session_config(&mut self, _catalog: &TrackCatalog) -> playmark_policy::Result<SessionConfig> {
        let mut script = self.script.lock().unwrap();
        script.config_draws += 1;
        Ok(script.config.clone())
    }

    fn inter_track_gap(&mut self) -> Duration {
        self.script
            .lock()
            .unwrap()
            .gaps
            .pop_front()
            .unwrap_or(Duration::ZERO)
    }

    fn advance_delay(&mut self) -> Duration {
        self.script.lock().unwrap().advance_delay
    }

    fn noise_plan(&mut self) -> Option<NoisePlan> {
        let mut script = self.script.lock().unwrap();
        script.noise_draws += 1;
        script.noise.pop_front().flatten()
    }

    fn completion_code(&mut self) -> String {
        let mut script = self.script.lock().unwrap();
        draw_completion_code("PM-", &mut script.rng)
    }
}

// ===== Harness =====

pub struct Harness {
    pub machine: SessionStateMachine,
    pub api: Arc<FakeApi>,
    pub device: Arc<FakeDevice>,
    pub telemetry: Arc<RecordingTelemetry>,
    pub clock: ManualClock,
    pub randomizer: ScriptedRandomizer,
    pub signals: mpsc::UnboundedReceiver<SessionSignal>,
}

impl Harness {
    /// Idle machine with no device yet
    pub fn new(config: SessionConfig) -> Self {
        let api = Arc::new(FakeApi::default());
        let device = Arc::new(FakeDevice::default());
        let telemetry = Arc::new(RecordingTelemetry::default());
        let clock = ManualClock::new(START_MS);
        let randomizer = ScriptedRandomizer::new(config);
        let (sink, signals) = SignalSink::channel();

        let deps = SessionDeps {
            api: api.clone(),
            device: device.clone(),
            telemetry: telemetry.clone(),
            clock: Arc::new(clock.clone()),
        };
        let machine =
            SessionStateMachine::new(catalog(), Box::new(randomizer.clone()), deps, sink);

        Self {
            machine,
            api,
            device,
            telemetry,
            clock,
            randomizer,
            signals,
        }
    }

    /// Idle machine whose device is ready
    pub fn ready(config: SessionConfig) -> Self {
        let mut harness = Self::new(config);
        harness.machine.set_device(DEVICE_ID.to_string());
        harness
    }

    /// Machine that already started its session at [`START_MS`]
    pub async fn started(config: SessionConfig) -> Self {
        let mut harness = Self::ready(config);
        harness
            .machine
            .start()
            .await
            .expect("session should start");
        harness
    }

    /// Move the clock to `elapsed_ms` after the session start
    pub fn at(&self, elapsed_ms: i64) {
        self.clock.set(START_MS + elapsed_ms);
    }

    pub fn elapsed_now(&self) -> i64 {
        self.clock.now_ms() - START_MS
    }

    /// Tick for the track at `track_index` in the drawn order
    pub fn tick_for(&self, track_index: u32, position_ms: u64, duration_ms: u64, paused: bool) -> PlaybackTick {
        let track = self
            .machine
            .config()
            .and_then(|c| c.track(track_index))
            .expect("track in order");
        PlaybackTick {
            position_ms,
            duration_ms,
            paused,
            current_track_id: track.id().to_string(),
        }
    }

    /// Playing tick at `ratio` of a [`TRACK_DURATION_MS`] track
    pub fn listen(&mut self, track_index: u32, ratio: f64) {
        let position = (TRACK_DURATION_MS as f64 * ratio).round() as u64;
        let tick = self.tick_for(track_index, position, TRACK_DURATION_MS, false);
        self.machine.on_tick(tick);
    }

    /// Bring every track past the ratio and advance between them
    pub async fn listen_all(&mut self, ratio: f64) {
        let count = self.machine.config().map_or(0, SessionConfig::track_count);
        for index in 1..=count {
            self.listen(index, ratio);
            if index < count {
                self.machine.advance_track().await.expect("advance");
            }
        }
    }

    pub fn drain_signals(&mut self) -> Vec<SessionSignal> {
        let mut out = Vec::new();
        while let Ok(signal) = self.signals.try_recv() {
            out.push(signal);
        }
        out
    }
}
