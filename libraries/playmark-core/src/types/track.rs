/// Track references and the per-session track catalog
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Role a track plays in the fixed session order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackRole {
    Anchor,
    Primary,
    Filler,
}

impl TrackRole {
    /// Convert to string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anchor => "anchor",
            Self::Primary => "primary",
            Self::Filler => "filler",
        }
    }
}

impl std::fmt::Display for TrackRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A track known to the streaming service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackRef {
    /// Role in the session order
    pub role: TrackRole,

    /// Service URI (e.g. `spotify:track:4uLU6hMCjMI75M1A2tKUQC`)
    pub uri: String,

    /// Display name
    #[serde(default)]
    pub name: String,
}

impl TrackRef {
    /// Create a track reference
    ///
    /// A bare id is expanded to a `spotify:track:` URI.
    pub fn new(role: TrackRole, uri_or_id: impl Into<String>, name: impl Into<String>) -> Self {
        let raw = uri_or_id.into();
        let uri = if raw.contains(':') {
            raw
        } else {
            format!("spotify:track:{raw}")
        };

        Self {
            role,
            uri,
            name: name.into(),
        }
    }

    /// Service id (last URI segment)
    pub fn id(&self) -> &str {
        self.uri.rsplit(':').next().unwrap_or(&self.uri)
    }

    /// Whether a track id or URI reported by the player refers to this track
    pub fn matches(&self, id_or_uri: &str) -> bool {
        self.uri == id_or_uri || self.id() == id_or_uri
    }
}

/// Catalog validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// No filler track to choose from
    #[error("Filler pool is empty")]
    EmptyFillerPool,

    /// The same URI appears in more than one slot
    #[error("Duplicate track in catalog: {0}")]
    DuplicateTrack(String),

    /// A track is configured under the wrong role
    #[error("Track {uri} is configured as {found} but used as {expected}")]
    WrongRole {
        uri: String,
        expected: TrackRole,
        found: TrackRole,
    },
}

/// Tracks available to a session: one anchor, one primary, a filler pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackCatalog {
    /// Anchor track
    pub anchor: TrackRef,

    /// Primary track
    pub primary: TrackRef,

    /// Filler pool; one is drawn uniformly per session
    pub fillers: Vec<TrackRef>,
}

impl TrackCatalog {
    /// Create a catalog
    pub fn new(anchor: TrackRef, primary: TrackRef, fillers: Vec<TrackRef>) -> Self {
        Self {
            anchor,
            primary,
            fillers,
        }
    }

    /// Check roles, a non-empty filler pool, and that no URI repeats
    ///
    /// # Errors
    /// Returns the first violation found
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.fillers.is_empty() {
            return Err(CatalogError::EmptyFillerPool);
        }

        let slots = std::iter::once((&self.anchor, TrackRole::Anchor))
            .chain(std::iter::once((&self.primary, TrackRole::Primary)))
            .chain(self.fillers.iter().map(|t| (t, TrackRole::Filler)));

        let mut seen = HashSet::new();
        for (track, expected) in slots {
            if track.role != expected {
                return Err(CatalogError::WrongRole {
                    uri: track.uri.clone(),
                    expected,
                    found: track.role,
                });
            }
            if !seen.insert(track.uri.as_str()) {
                return Err(CatalogError::DuplicateTrack(track.uri.clone()));
            }
        }

        Ok(())
    }
}
