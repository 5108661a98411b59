//! Individual draws
//!
//! Each function takes the relevant slice of [`PolicyConfig`] and an RNG, and
//! returns one independent sample. Nothing here reads external state.

use crate::config::{GapDistribution, NoiseDistribution, PlaylistNaming, PolicyConfig};
use playmark_core::{NoiseKind, NoisePlan};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;

/// Characters a completion code is drawn from
pub const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random characters following the prefix
pub const CODE_LENGTH: usize = 6;

/// Total session length
pub fn draw_duration_ms<R: Rng + ?Sized>(config: &PolicyConfig, rng: &mut R) -> u64 {
    config.session_duration_ms.sample(rng)
}

/// Per-track listened ratio, clamped to (0, 1]
pub fn draw_min_track_ratio<R: Rng + ?Sized>(config: &PolicyConfig, rng: &mut R) -> f64 {
    let ratio = config.min_track_ratio.sample(rng);
    ratio.clamp(f64::MIN_POSITIVE, 1.0)
}

/// Early-finish threshold, `duration_ms × r` clamped to `[1, duration_ms]`
pub fn draw_early_finish_threshold_ms<R: Rng + ?Sized>(
    config: &PolicyConfig,
    duration_ms: u64,
    rng: &mut R,
) -> u64 {
    let r = config.early_finish_ratio.sample(rng);
    threshold_from_ratio(duration_ms, r)
}

/// `duration_ms × r`, rounded, never 0 and never past the duration
pub fn threshold_from_ratio(duration_ms: u64, r: f64) -> u64 {
    let raw = (duration_ms as f64 * r).round() as u64;
    raw.clamp(1, duration_ms.max(1))
}

/// Bernoulli draw for the save-playlist button
pub fn draw_show_save_button<R: Rng + ?Sized>(config: &PolicyConfig, rng: &mut R) -> bool {
    rng.gen_bool(config.save_button_probability)
}

/// Gap before the next track; zero with the configured "immediate" probability
pub fn draw_inter_track_gap<R: Rng + ?Sized>(gap: &GapDistribution, rng: &mut R) -> Duration {
    if rng.gen_bool(gap.immediate_probability) {
        return Duration::ZERO;
    }
    Duration::from_millis(gap.range_ms.sample(rng))
}

/// Maybe produce a noise interaction
pub fn draw_noise_plan<R: Rng + ?Sized>(
    noise: &NoiseDistribution,
    rng: &mut R,
) -> Option<NoisePlan> {
    if !rng.gen_bool(noise.probability) {
        return None;
    }

    let kind = if rng.gen_bool(noise.pause_weight) {
        NoiseKind::PauseResume
    } else {
        NoiseKind::VolumeDip
    };

    let hold_ms = match kind {
        NoiseKind::PauseResume => noise.pause_hold_ms.sample(rng),
        NoiseKind::VolumeDip => noise.dip_hold_ms.sample(rng),
    };

    Some(NoisePlan {
        kind,
        offset_ms: noise.offset_ms.sample(rng),
        hold_ms,
        dip_factor: noise.dip_factor.sample(rng),
    })
}

/// "{Adjective} {Noun}"
pub fn draw_playlist_name<R: Rng + ?Sized>(naming: &PlaylistNaming, rng: &mut R) -> String {
    let adjective = naming.adjectives.choose(rng).map_or("Untitled", String::as_str);
    let noun = naming.nouns.choose(rng).map_or("Session", String::as_str);
    format!("{adjective} {noun}")
}

/// Prefix followed by [`CODE_LENGTH`] characters from [`CODE_ALPHABET`]
///
/// Codes are not deduplicated.
pub fn draw_completion_code<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let mut code = String::with_capacity(prefix.len() + CODE_LENGTH);
    code.push_str(prefix);
    for _ in 0..CODE_LENGTH {
        let idx = rng.gen_range(0..CODE_ALPHABET.len());
        code.push(char::from(CODE_ALPHABET[idx]));
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UniformRange;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(threshold_from_ratio(300_000, 0.8), 240_000);
        assert_eq!(threshold_from_ratio(300_000, 1.0), 300_000);
        assert_eq!(threshold_from_ratio(300_000, 1e-9), 1);
        assert_eq!(threshold_from_ratio(10, 2.0), 10);
    }

    #[test]
    fn completion_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = draw_completion_code("PM-", &mut rng);
            assert_eq!(code.len(), 9);
            assert!(code.starts_with("PM-"));
            assert!(code[3..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn certain_immediate_gap_is_zero() {
        let gap = GapDistribution {
            immediate_probability: 1.0,
            range_ms: UniformRange::new(1_000, 2_000),
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(draw_inter_track_gap(&gap, &mut rng), Duration::ZERO);
    }

    #[test]
    fn gap_stays_in_range() {
        let gap = GapDistribution {
            immediate_probability: 0.0,
            range_ms: UniformRange::new(1_000, 2_000),
        };
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..200 {
            let d = draw_inter_track_gap(&gap, &mut rng);
            assert!(d >= Duration::from_millis(1_000) && d <= Duration::from_millis(2_000));
        }
    }

    #[test]
    fn noise_never_drawn_at_zero_probability() {
        let mut noise = PolicyConfig::default().noise;
        noise.probability = 0.0;
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            assert!(draw_noise_plan(&noise, &mut rng).is_none());
        }
    }

    #[test]
    fn noise_kind_follows_pause_weight() {
        let mut noise = PolicyConfig::default().noise;
        noise.probability = 1.0;
        noise.pause_weight = 1.0;
        let mut rng = StdRng::seed_from_u64(4);

        let plan = draw_noise_plan(&noise, &mut rng).unwrap();
        assert_eq!(plan.kind, NoiseKind::PauseResume);
        assert!(plan.hold_ms >= noise.pause_hold_ms.min && plan.hold_ms <= noise.pause_hold_ms.max);

        noise.pause_weight = 0.0;
        let plan = draw_noise_plan(&noise, &mut rng).unwrap();
        assert_eq!(plan.kind, NoiseKind::VolumeDip);
        assert!(plan.dip_factor > 0.0 && plan.dip_factor <= 1.0);
    }

    #[test]
    fn playlist_name_uses_both_lists() {
        let naming = PlaylistNaming {
            adjectives: vec!["Quiet".into()],
            nouns: vec!["Harbor".into()],
        };
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(draw_playlist_name(&naming, &mut rng), "Quiet Harbor");
    }
}
