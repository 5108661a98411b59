//! Playmark - Randomization Policy
//!
//! Every random decision a listening session makes lives here:
//! - Session duration (bounded uniform)
//! - Per-track listened ratio (three-band mixture)
//! - Early-finish threshold (fraction of the duration)
//! - Track order (base order with rare adjacent swaps, random filler)
//! - Save-button visibility, playlist name
//! - Inter-track gaps, noise interactions, completion codes
//!
//! Configuration is validated once, when the policy is built. A bad weight
//! table is a startup error, never a mid-session surprise.
//!
//! # Example
//!
//! ```rust
//! use playmark_core::{TrackCatalog, TrackRef, TrackRole};
//! use playmark_policy::{PolicyConfig, RandomizationPolicy, SessionRandomizer};
//!
//! let catalog = TrackCatalog::new(
//!     TrackRef::new(TrackRole::Anchor, "a", "Anchor"),
//!     TrackRef::new(TrackRole::Primary, "p", "Primary"),
//!     vec![TrackRef::new(TrackRole::Filler, "f", "Filler")],
//! );
//!
//! let mut policy = RandomizationPolicy::seeded(PolicyConfig::default(), 42).unwrap();
//! let session = policy.session_config(&catalog).unwrap();
//!
//! assert_eq!(session.track_order.len(), 3);
//! assert!(session.early_finish_threshold_ms <= session.duration_ms);
//! assert!(policy.completion_code().starts_with("PM-"));
//! ```

mod config;
pub mod draw;
mod error;
pub mod order;
mod policy;

// Public exports
pub use config::{
    GapDistribution, Mixture, NoiseDistribution, PlaylistNaming, PolicyConfig,
    TrackOrderWeights, UniformRange, WeightedBand, WEIGHT_TOLERANCE,
};
pub use error::{PolicyError, Result};
pub use order::OrderPerturbation;
pub use policy::{RandomizationPolicy, SessionRandomizer};
