//! Runtime configuration.

use std::{env, fs, path::Path, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{hand::NUM_LANDMARKS, matcher::MatchPolicy, matcher::PoseMatcher};

/// Environment variable overriding [`Config::bindings_path`].
pub const BINDINGS_ENV: &str = "HANDTYPED_BINDINGS";
/// Environment variable overriding [`Config::threshold`].
pub const THRESHOLD_ENV: &str = "HANDTYPED_THRESHOLD";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("threshold must be a positive number, got {0}")]
    Threshold(f32),
    #[error("quit gesture label must not be empty")]
    QuitGesture,
    #[error("invalid value '{value}' in ${var}")]
    Env { var: &'static str, value: String },
}

/// Which [`KeySink`][crate::key::KeySink] the detection loop presses keys with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    /// Only log the keys.
    #[default]
    Log,
    /// Inject keys with `xdotool`.
    Xdotool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// JSON file the bindings are stored in.
    pub bindings_path: PathBuf,
    /// Maximum pose distance for a match (exclusive).
    pub threshold: f32,
    pub policy: MatchPolicy,
    /// Recognizing the binding with this label ends the detection loop instead of pressing its key.
    pub quit_gesture: Option<String>,
    /// Minimum time between two key presses, in milliseconds.
    pub cooldown_ms: u64,
    /// Frames whose hand does not have this many landmarks are skipped. `0` accepts any count.
    pub expected_landmarks: usize,
    pub key_sink: SinkKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bindings_path: PathBuf::from("bindings.json"),
            threshold: PoseMatcher::DEFAULT_THRESHOLD,
            policy: MatchPolicy::default(),
            quit_gesture: None,
            cooldown_ms: 500,
            expected_landmarks: NUM_LANDMARKS,
            key_sink: SinkKind::default(),
        }
    }
}

impl Config {
    /// Loads a TOML configuration file.
    ///
    /// Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies the `HANDTYPED_*` environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|var| env::var(var).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(path) = var(BINDINGS_ENV) {
            self.bindings_path = path.into();
        }
        if let Some(value) = var(THRESHOLD_ENV) {
            self.threshold = value.trim().parse().map_err(|_| ConfigError::Env {
                var: THRESHOLD_ENV,
                value,
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ConfigError::Threshold(self.threshold));
        }
        if matches!(&self.quit_gesture, Some(label) if label.trim().is_empty()) {
            return Err(ConfigError::QuitGesture);
        }
        Ok(())
    }

    /// The landmark count frames are checked against, or [`None`] if the check is disabled.
    pub fn expected_landmarks(&self) -> Option<usize> {
        (self.expected_landmarks != 0).then_some(self.expected_landmarks)
    }

    /// The quit gesture label, trimmed the same way binding labels are.
    pub fn quit_gesture(&self) -> Option<&str> {
        self.quit_gesture.as_deref().map(str::trim)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Creates the [`PoseMatcher`] described by this configuration.
    ///
    /// # Panics
    ///
    /// Panics if the threshold is invalid; call [`Config::validate`] first.
    pub fn matcher(&self) -> PoseMatcher {
        PoseMatcher::new(self.threshold).with_policy(self.policy)
    }
}
