//! The randomizer the session state machine draws from

use crate::config::PolicyConfig;
use crate::draw::{
    draw_completion_code, draw_duration_ms, draw_early_finish_threshold_ms,
    draw_inter_track_gap, draw_min_track_ratio, draw_noise_plan, draw_playlist_name,
    draw_show_save_button,
};
use crate::error::Result;
use crate::order::order_tracks;
use playmark_core::{NoisePlan, SessionConfig, TrackCatalog};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::debug;

/// Every nondeterministic decision a session makes
///
/// The state machine never touches an RNG directly; tests substitute a
/// scripted implementation to make transitions deterministic.
pub trait SessionRandomizer: Send {
    /// Draw the immutable parameters for a new session
    fn session_config(&mut self, catalog: &TrackCatalog) -> Result<SessionConfig>;

    /// Gap before the next track's play command (zero = immediate)
    fn inter_track_gap(&mut self) -> Duration;

    /// Delay between "track about to end" and the advance
    fn advance_delay(&mut self) -> Duration;

    /// One noise opportunity; `None` when nothing is injected
    fn noise_plan(&mut self) -> Option<NoisePlan>;

    /// Terminal completion code
    fn completion_code(&mut self) -> String;
}

/// Configured distributions sampled with an RNG
pub struct RandomizationPolicy<R = StdRng> {
    config: PolicyConfig,
    rng: R,
}

impl RandomizationPolicy<StdRng> {
    /// Validate the configuration and seed from OS entropy
    pub fn from_entropy(config: PolicyConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Validate the configuration and use a fixed seed
    pub fn seeded(config: PolicyConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomizationPolicy<R> {
    /// Validate the configuration and use the given RNG
    pub fn with_rng(config: PolicyConfig, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    /// The validated configuration
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }
}

impl<R: Rng + Send> SessionRandomizer for RandomizationPolicy<R> {
    fn session_config(&mut self, catalog: &TrackCatalog) -> Result<SessionConfig> {
        catalog.validate()?;

        let rng = &mut self.rng;
        let duration_ms = draw_duration_ms(&self.config, rng);
        let min_track_ratio = draw_min_track_ratio(&self.config, rng);
        let early_finish_threshold_ms =
            draw_early_finish_threshold_ms(&self.config, duration_ms, rng);
        let track_order = order_tracks(catalog, &self.config.track_order, rng)?;
        let show_save_button = draw_show_save_button(&self.config, rng);
        let playlist_name = draw_playlist_name(&self.config.naming, rng);

        debug!(
            duration_ms,
            min_track_ratio,
            early_finish_threshold_ms,
            show_save_button,
            order = ?track_order.iter().map(|t| t.role).collect::<Vec<_>>(),
            "Drew session config"
        );

        Ok(SessionConfig {
            duration_ms,
            min_track_ratio,
            early_finish_threshold_ms,
            track_order,
            show_save_button,
            playlist_name,
        })
    }

    fn inter_track_gap(&mut self) -> Duration {
        draw_inter_track_gap(&self.config.inter_track_gap, &mut self.rng)
    }

    fn advance_delay(&mut self) -> Duration {
        Duration::from_millis(self.config.advance_delay_ms)
    }

    fn noise_plan(&mut self) -> Option<NoisePlan> {
        draw_noise_plan(&self.config.noise, &mut self.rng)
    }

    fn completion_code(&mut self) -> String {
        draw_completion_code(&self.config.completion_code_prefix, &mut self.rng)
    }
}
