//! Playmark Session
//!
//! The listening-session state machine and everything around it that is not
//! network plumbing.
//!
//! # Architecture
//!
//! - [`SessionStateMachine`]: owns one session's parameters and runtime.
//!   Every transition is a direct method call, so tests drive time by hand.
//! - [`PlaybackEventAdapter`]: turns player notifications into machine calls.
//! - [`SessionDriver`]: runs the machine on one tokio task, multiplexing
//!   commands, notifications, periodic checks and scheduled actions.
//! - [`SessionSignal`]: what the UI is told, over an unbounded channel.
//!
//! ```text
//! PlayerPoller ──notifications──▶ SessionDriver ──▶ SessionStateMachine
//! SessionHandle ──commands──────▶      │                 │
//!                                      ▼                 ├─▶ StreamingApi / PlaybackDevice
//!                               periodic checks          ├─▶ TelemetrySink
//!                                                        └─▶ SignalSink ──▶ UI
//! ```

#![forbid(unsafe_code)]

pub mod adapter;
mod checks;
mod clock;
mod driver;
mod error;
mod machine;
mod runtime;
mod schedule;
mod signals;

pub use adapter::{PlaybackEventAdapter, PlayerEventHandler};
pub use checks::PeriodicChecks;
pub use clock::TokioClock;
pub use driver::{SessionDriver, SessionHandle, TimingConfig};
pub use error::{Result, SessionError};
pub use machine::{
    dipped_volume, SessionDeps, SessionState, SessionStateMachine, SessionStatus,
    TRACK_END_WINDOW_MS,
};
pub use runtime::SessionRuntime;
pub use schedule::{NoiseStep, Schedule, ScheduledAction};
pub use signals::{SessionSignal, Severity, SignalSink};
