//! Tagging configuration
//!
//! Every knob has a default and can be overridden from the environment:
//!
//! | Variable | Default |
//! |---|---|
//! | `PAPERTAG_MIN_CONFIDENCE` | 0.3 |
//! | `PAPERTAG_MAX_TAGS` | 10 |
//! | `PAPERTAG_WEIGHT_RULE` | 0.5 |
//! | `PAPERTAG_WEIGHT_FREQUENCY` | 0.3 |
//! | `PAPERTAG_WEIGHT_SOURCE` | 0.2 |
//! | `PAPERTAG_BASELINE_TTL_SECS` | 3600 |
//! | `PAPERTAG_BASELINE_TOP_N` | 8 |
//! | `PAPERTAG_ASSIGN_TAGS` | true |
//! | `PAPERTAG_LEXICON` | built-in lexicon |

use crate::classify::StrategyWeights;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_MIN_CONFIDENCE: &str = "PAPERTAG_MIN_CONFIDENCE";
pub const ENV_MAX_TAGS: &str = "PAPERTAG_MAX_TAGS";
pub const ENV_WEIGHT_RULE: &str = "PAPERTAG_WEIGHT_RULE";
pub const ENV_WEIGHT_FREQUENCY: &str = "PAPERTAG_WEIGHT_FREQUENCY";
pub const ENV_WEIGHT_SOURCE: &str = "PAPERTAG_WEIGHT_SOURCE";
pub const ENV_BASELINE_TTL_SECS: &str = "PAPERTAG_BASELINE_TTL_SECS";
pub const ENV_BASELINE_TOP_N: &str = "PAPERTAG_BASELINE_TOP_N";
pub const ENV_ASSIGN_TAGS: &str = "PAPERTAG_ASSIGN_TAGS";
pub const ENV_LEXICON: &str = "PAPERTAG_LEXICON";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggingConfig {
    /// Tags below this combined confidence are dropped
    pub min_confidence: f64,
    /// Maximum tags kept per paper
    pub max_tags: usize,
    pub weights: StrategyWeights,
    /// How long a computed scoring baseline stays valid
    pub baseline_ttl: Duration,
    /// Number of most frequent tags summed into the scoring baseline
    pub baseline_top_n: usize,
    /// When false, ingestion persists papers without tagging them
    pub assign_tags: bool,
    /// Custom YAML lexicon; the built-in lexicon when unset
    pub lexicon_path: Option<PathBuf>,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_tags: 10,
            weights: StrategyWeights::default(),
            baseline_ttl: Duration::from_secs(3600),
            baseline_top_n: 8,
            assign_tags: true,
            lexicon_path: None,
        }
    }
}

impl TaggingConfig {
    /// Defaults overridden by `PAPERTAG_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            min_confidence: parse_or(&lookup, ENV_MIN_CONFIDENCE, defaults.min_confidence)?,
            max_tags: parse_or(&lookup, ENV_MAX_TAGS, defaults.max_tags)?,
            weights: StrategyWeights {
                rule: parse_or(&lookup, ENV_WEIGHT_RULE, defaults.weights.rule)?,
                frequency: parse_or(&lookup, ENV_WEIGHT_FREQUENCY, defaults.weights.frequency)?,
                source: parse_or(&lookup, ENV_WEIGHT_SOURCE, defaults.weights.source)?,
            },
            baseline_ttl: Duration::from_secs(parse_or(
                &lookup,
                ENV_BASELINE_TTL_SECS,
                defaults.baseline_ttl.as_secs(),
            )?),
            baseline_top_n: parse_or(&lookup, ENV_BASELINE_TOP_N, defaults.baseline_top_n)?,
            assign_tags: parse_bool_or(&lookup, ENV_ASSIGN_TAGS, defaults.assign_tags)?,
            lexicon_path: lookup(ENV_LEXICON)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::Invalid(format!(
                "min_confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.max_tags == 0 {
            return Err(ConfigError::Invalid("max_tags must be at least 1".into()));
        }
        if self.baseline_top_n == 0 {
            return Err(ConfigError::Invalid("baseline_top_n must be at least 1".into()));
        }
        let StrategyWeights {
            rule,
            frequency,
            source,
        } = self.weights;
        if [rule, frequency, source]
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err(ConfigError::Invalid(
                "strategy weights must be finite and non-negative".into(),
            ));
        }
        if rule + frequency + source <= 0.0 {
            return Err(ConfigError::Invalid(
                "at least one strategy weight must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::InvalidValue { key, value: raw }),
        },
    }
}

/// "true", "1", "yes", "on" and their negatives, case-insensitive
fn parse_bool_or<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "" => Ok(default),
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = TaggingConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TaggingConfig::default());
        assert_eq!(config.min_confidence, 0.3);
        assert_eq!(config.max_tags, 10);
        assert_eq!(config.baseline_ttl, Duration::from_secs(3600));
        assert_eq!(config.baseline_top_n, 8);
        assert!(config.assign_tags);
        assert!(config.lexicon_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = TaggingConfig::from_lookup(lookup(&[
            (ENV_MIN_CONFIDENCE, "0.45"),
            (ENV_MAX_TAGS, "5"),
            (ENV_WEIGHT_SOURCE, "0"),
            (ENV_BASELINE_TTL_SECS, "60"),
            (ENV_ASSIGN_TAGS, "off"),
            (ENV_LEXICON, "/etc/papertag/lexicon.yaml"),
        ]))
        .unwrap();
        assert_eq!(config.min_confidence, 0.45);
        assert_eq!(config.max_tags, 5);
        assert_eq!(config.weights.source, 0.0);
        assert_eq!(config.weights.rule, 0.5);
        assert_eq!(config.baseline_ttl, Duration::from_secs(60));
        assert!(!config.assign_tags);
        assert_eq!(
            config.lexicon_path,
            Some(PathBuf::from("/etc/papertag/lexicon.yaml"))
        );
    }

    #[test]
    fn test_unparseable_value_is_error() {
        let err = TaggingConfig::from_lookup(lookup(&[(ENV_MAX_TAGS, "ten")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: ENV_MAX_TAGS,
                value: "ten".into()
            }
        );
        assert!(TaggingConfig::from_lookup(lookup(&[(ENV_ASSIGN_TAGS, "maybe")])).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        assert!(TaggingConfig::from_lookup(lookup(&[(ENV_MIN_CONFIDENCE, "1.5")])).is_err());
        assert!(TaggingConfig::from_lookup(lookup(&[(ENV_MAX_TAGS, "0")])).is_err());
        assert!(TaggingConfig::from_lookup(lookup(&[(ENV_WEIGHT_RULE, "-0.1")])).is_err());
        assert!(TaggingConfig::from_lookup(lookup(&[
            (ENV_WEIGHT_RULE, "0"),
            (ENV_WEIGHT_FREQUENCY, "0"),
            (ENV_WEIGHT_SOURCE, "0"),
        ]))
        .is_err());
    }
}
