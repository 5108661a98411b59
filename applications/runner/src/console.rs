//! Terminal surface for a running session: stdin commands in, signals out.

use playmark_session::{SessionSignal, SessionStatus, Severity};
use std::fmt::Write as _;
use std::str::FromStr;

/// A line typed by the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Finish,
    Save,
    Status,
    Quit,
    Help,
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        match line.trim().to_ascii_lowercase().as_str() {
            "finish" | "f" => Ok(Self::Finish),
            "save" | "s" => Ok(Self::Save),
            "status" | "st" => Ok(Self::Status),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            "help" | "h" | "?" => Ok(Self::Help),
            other => Err(format!("Unknown command '{other}', type 'help'")),
        }
    }
}

pub const HELP: &str = "Commands: finish (f), save (s), status (st), quit (q)";

/// `m:ss`
pub fn format_ms(ms: u64) -> String {
    let secs = ms / 1_000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// One line per signal; `None` for signals too chatty to print.
pub fn render_signal(signal: &SessionSignal) -> Option<String> {
    let line = match signal {
        SessionSignal::Started {
            session_id,
            duration_ms,
            early_finish_threshold_ms,
            track_count,
            ..
        } => format!(
            "Session {session_id} started: {track_count} tracks, {} total, early finish after {}",
            format_ms(*duration_ms),
            format_ms(*early_finish_threshold_ms)
        ),
        SessionSignal::SaveAvailable { playlist_name } => {
            format!("Type 'save' to keep this session as \"{playlist_name}\"")
        }
        SessionSignal::TrackProgress { .. } => return None,
        SessionSignal::Elapsed {
            elapsed_ms,
            remaining_ms,
        } => {
            // Print every half minute
            if elapsed_ms % 30_000 >= 1_000 {
                return None;
            }
            format!(
                "Elapsed {} (remaining {})",
                format_ms(*elapsed_ms),
                format_ms(*remaining_ms)
            )
        }
        SessionSignal::EarlyFinishAvailable => {
            "You can finish now: type 'finish'".to_string()
        }
        SessionSignal::Completed { code, early } => {
            let how = if *early { "finished early" } else { "complete" };
            format!("Session {how}. Your completion code: {code}")
        }
        SessionSignal::PlaylistSaved { playlist } => {
            format!("Saved playlist \"{}\" ({})", playlist.name, playlist.id)
        }
        SessionSignal::ReauthRequired { message } => {
            format!("Session stopped: {message}. Sign in again and start a new session.")
        }
        SessionSignal::Message { severity, text } => match severity {
            Severity::Info => text.clone(),
            Severity::Warning => format!("warning: {text}"),
            Severity::Error => format!("error: {text}"),
        },
    };
    Some(line)
}

pub fn render_status(status: &SessionStatus) -> String {
    let mut out = format!("State: {:?}", status.state);
    if let Some(id) = status.session_id {
        let _ = write!(
            out,
            "\nSession: {id}\nTrack: {}/{} (completed {:?})\nElapsed: {} of {}",
            status.current_track_index.min(status.track_count),
            status.track_count,
            status.tracks_completed,
            format_ms(status.elapsed_ms),
            format_ms(status.duration_ms),
        );
    }
    if let Some(code) = &status.completion_code {
        let _ = write!(out, "\nCompletion code: {code}");
    }
    if let Some(playlist) = &status.saved_playlist {
        let _ = write!(out, "\nSaved playlist: {}", playlist.name);
    }
    out
}
