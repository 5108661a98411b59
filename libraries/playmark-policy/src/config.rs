//! Distribution configuration
//!
//! Every random draw a session makes is described here, either as a uniform
//! range or as a weighted mixture of ranges. The whole structure deserializes
//! from the `[policy]` table of the runner configuration; missing keys fall
//! back to the defaults below.

use crate::error::{PolicyError, Result};
use rand::distributions::uniform::SampleUniform;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tolerance used when checking that weights sum to 1
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Inclusive uniform range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UniformRange<T> {
    pub min: T,
    pub max: T,
}

impl<T> UniformRange<T>
where
    T: SampleUniform + PartialOrd + Copy,
{
    /// Create a range
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }

    /// Draw a value in `[min, max]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        if self.min >= self.max {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl UniformRange<u64> {
    fn validate(&self, name: &'static str, allow_zero: bool) -> Result<()> {
        if self.min > self.max || (!allow_zero && self.min == 0) {
            return Err(PolicyError::InvalidRange {
                name,
                min: self.min as f64,
                max: self.max as f64,
            });
        }
        Ok(())
    }
}

impl UniformRange<f64> {
    /// Ranges of ratios must lie in (0, 1]
    fn validate_ratio(&self, name: &'static str) -> Result<()> {
        let finite = self.min.is_finite() && self.max.is_finite();
        if !finite || self.min <= 0.0 || self.max > 1.0 || self.min > self.max {
            return Err(PolicyError::InvalidRange {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// One band of a mixture distribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedBand {
    /// Label used in logs ("low", "mid", "high")
    pub name: String,
    /// Selection probability
    pub weight: f64,
    /// Sub-range sampled once the band is selected
    pub range: UniformRange<f64>,
}

/// Mixture of ranges with fixed selection weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mixture {
    pub bands: Vec<WeightedBand>,
}

impl Mixture {
    /// Pick a band by weight, then sample inside it
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let band = self.select(rng.gen::<f64>());
        band.map_or(0.0, |b| b.range.sample(rng))
    }

    /// Band selected by a uniform draw `u` in [0, 1)
    ///
    /// Falls back to the last band when rounding leaves `u` past the final
    /// cumulative weight.
    pub fn select(&self, u: f64) -> Option<&WeightedBand> {
        let mut cumulative = 0.0;
        for band in &self.bands {
            cumulative += band.weight;
            if u < cumulative {
                return Some(band);
            }
        }
        self.bands.last()
    }

    fn validate_ratio(&self, name: &'static str) -> Result<()> {
        if self.bands.is_empty() {
            return Err(PolicyError::EmptyMixture(name));
        }
        for band in &self.bands {
            check_probability(name, band.weight)?;
            band.range.validate_ratio(name)?;
        }
        check_sum(name, self.bands.iter().map(|b| b.weight).sum())
    }
}

/// Probabilities for perturbing the base track order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackOrderWeights {
    /// Keep `[anchor, primary, filler]`
    pub keep: f64,
    /// Swap positions 0 and 1
    pub swap_first_pair: f64,
    /// Swap positions 1 and 2
    pub swap_second_pair: f64,
}

impl TrackOrderWeights {
    fn validate(&self) -> Result<()> {
        const NAME: &str = "track_order";
        check_probability(NAME, self.keep)?;
        check_probability(NAME, self.swap_first_pair)?;
        check_probability(NAME, self.swap_second_pair)?;
        check_sum(NAME, self.keep + self.swap_first_pair + self.swap_second_pair)
    }
}

/// Gap between one track's end and the next track's play command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapDistribution {
    /// Probability of playing the next track immediately
    pub immediate_probability: f64,
    /// Gap drawn otherwise
    pub range_ms: UniformRange<u64>,
}

/// Noise injection parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseDistribution {
    /// Chance that an opportunity produces a noise interaction
    pub probability: f64,
    /// Chance that the interaction is a pause rather than a volume dip
    pub pause_weight: f64,
    /// Delay after the track starts
    pub offset_ms: UniformRange<u64>,
    /// Pause length
    pub pause_hold_ms: UniformRange<u64>,
    /// Dip length
    pub dip_hold_ms: UniformRange<u64>,
    /// Fraction of the volume kept during a dip
    pub dip_factor: UniformRange<f64>,
}

/// Word lists for playlist names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistNaming {
    pub adjectives: Vec<String>,
    pub nouns: Vec<String>,
}

/// Every distribution a session draws from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Total session length
    pub session_duration_ms: UniformRange<u64>,
    /// Per-track listened ratio
    pub min_track_ratio: Mixture,
    /// Early-finish threshold as a fraction of the session duration
    pub early_finish_ratio: UniformRange<f64>,
    /// Track order perturbation
    pub track_order: TrackOrderWeights,
    /// Chance that the save-playlist button is shown
    pub save_button_probability: f64,
    /// Inter-track gap
    pub inter_track_gap: GapDistribution,
    /// Delay between "track about to end" and the advance
    pub advance_delay_ms: u64,
    /// Noise injection
    pub noise: NoiseDistribution,
    /// Playlist naming
    pub naming: PlaylistNaming,
    /// Literal prefix of completion codes
    pub completion_code_prefix: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            session_duration_ms: UniformRange::new(480_000, 720_000),
            min_track_ratio: Mixture {
                bands: vec![
                    WeightedBand {
                        name: "low".to_string(),
                        weight: 0.2,
                        range: UniformRange::new(0.30, 0.50),
                    },
                    WeightedBand {
                        name: "mid".to_string(),
                        weight: 0.5,
                        range: UniformRange::new(0.50, 0.75),
                    },
                    WeightedBand {
                        name: "high".to_string(),
                        weight: 0.3,
                        range: UniformRange::new(0.75, 0.95),
                    },
                ],
            },
            early_finish_ratio: UniformRange::new(0.70, 0.90),
            track_order: TrackOrderWeights {
                keep: 0.90,
                swap_first_pair: 0.05,
                swap_second_pair: 0.05,
            },
            save_button_probability: 0.5,
            inter_track_gap: GapDistribution {
                immediate_probability: 0.10,
                range_ms: UniformRange::new(1_500, 6_000),
            },
            advance_delay_ms: 1_200,
            noise: NoiseDistribution {
                probability: 0.35,
                pause_weight: 0.5,
                offset_ms: UniformRange::new(15_000, 60_000),
                pause_hold_ms: UniformRange::new(2_000, 8_000),
                dip_hold_ms: UniformRange::new(3_000, 10_000),
                dip_factor: UniformRange::new(0.30, 0.60),
            },
            naming: PlaylistNaming {
                adjectives: words(&[
                    "Quiet", "Golden", "Midnight", "Velvet", "Electric", "Hazy", "Lucky",
                    "Silver", "Wandering", "Early",
                ]),
                nouns: words(&[
                    "Harbor", "Drive", "Orchard", "Signal", "Lanterns", "Tides", "Rooftops",
                    "Echoes", "Meadow", "Static",
                ]),
            },
            completion_code_prefix: "PM-".to_string(),
        }
    }
}

impl PolicyConfig {
    /// Validate every distribution
    ///
    /// Called when the configuration is loaded; a session never starts from
    /// an invalid policy.
    pub fn validate(&self) -> Result<()> {
        self.session_duration_ms
            .validate("session_duration_ms", false)?;
        self.min_track_ratio.validate_ratio("min_track_ratio")?;
        self.early_finish_ratio.validate_ratio("early_finish_ratio")?;
        self.track_order.validate()?;
        check_probability("save_button", self.save_button_probability)?;

        check_probability(
            "inter_track_gap",
            self.inter_track_gap.immediate_probability,
        )?;
        self.inter_track_gap.range_ms.validate("inter_track_gap", true)?;

        check_probability("noise", self.noise.probability)?;
        check_probability("noise.pause_weight", self.noise.pause_weight)?;
        self.noise.offset_ms.validate("noise.offset_ms", true)?;
        self.noise.pause_hold_ms.validate("noise.pause_hold_ms", true)?;
        self.noise.dip_hold_ms.validate("noise.dip_hold_ms", true)?;
        self.noise.dip_factor.validate_ratio("noise.dip_factor")?;

        if self.naming.adjectives.is_empty() {
            return Err(PolicyError::EmptyWordList("adjectives"));
        }
        if self.naming.nouns.is_empty() {
            return Err(PolicyError::EmptyWordList("nouns"));
        }
        if self.completion_code_prefix.is_empty() {
            return Err(PolicyError::EmptyCodePrefix);
        }

        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(PolicyError::InvalidProbability { name, value });
    }
    Ok(())
}

fn check_sum(name: &'static str, sum: f64) -> Result<()> {
    if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
        return Err(PolicyError::InvalidWeights { name, sum });
    }
    Ok(())
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| (*w).to_string()).collect()
}
