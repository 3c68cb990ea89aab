//! Config for the balancer behaviors
//!
//! This module provides configuration options for controlling how the balancer forms groups and
//! reports what it does.
//!
//! Configuration can be created programmatically using [`Configuration::new()`] or by reading
//! environment variables using [`Configuration::from_env()`].
//!
//! # Environment Variables
//!
//! The following environment variables can be used to override configuration values. All
//! values are optional, and case-insensitive. Set the value to `"true"` to enable a flag.
//!
//! - `BALANCE_VERBOSITY`: One of `quiet`, `normal`, `debug`, `trace` (default: `normal`)
//! - `BALANCE_LOG`: Enable logging to a file (default: `false`)
//! - `BALANCE_PER_PLAYER`: Every player is its own group, squads and clans are ignored (default: `false`)
//! - `BALANCE_PRESERVE_CLANS`: Keep clan members together (default: `true`)
//! - `BALANCE_PRESERVE_SQUADS`: Keep squad members together (default: `true`)
//! - `BALANCE_FALLBACK_RATING`: Rating of players without statistics, overriding the rater's own
//!   (default: unset, the built-in raters use `0.5`)

use std::str::FromStr;

use anyhow::bail;
use tracing::Level;

/// Above this many groups the exact search is replaced by the heuristic.
pub const EXACT_SEARCH_GROUP_LIMIT: usize = 30;

/// The heuristic may place groups at most `HEURISTIC_ITERATION_FACTOR * groups` times.
pub const HEURISTIC_ITERATION_FACTOR: f64 = 1.5;

/// How much the engine reports through `tracing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Warnings only.
    Quiet,
    /// Strategy choice and results.
    #[default]
    Normal,
    /// Search totals and iteration counts.
    Debug,
    /// Every improving candidate.
    Trace,
}

impl Verbosity {
    /// Maximum `tracing` level for this verbosity.
    pub fn level(self) -> Level {
        match self {
            Verbosity::Quiet => Level::WARN,
            Verbosity::Normal => Level::INFO,
            Verbosity::Debug => Level::DEBUG,
            Verbosity::Trace => Level::TRACE,
        }
    }
}

impl FromStr for Verbosity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" => Ok(Verbosity::Quiet),
            "normal" => Ok(Verbosity::Normal),
            "debug" => Ok(Verbosity::Debug),
            "trace" => Ok(Verbosity::Trace),
            other => bail!("unknown verbosity '{other}'"),
        }
    }
}

/// Configuration for balancer behaviors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Configuration {
    pub(crate) verbosity: Verbosity,
    pub(crate) log: bool,
    pub(crate) per_player: bool,
    pub(crate) preserve_clans: bool,
    pub(crate) preserve_squads: bool,
    pub(crate) fallback_rating: Option<f64>,
}

impl Configuration {
    /// Create a new configuration with default parameters.
    ///
    /// By default:
    /// - Verbosity is [`Verbosity::Normal`].
    /// - Logging to file is disabled.
    /// - Clans and squads are kept together, clans taking priority over squads.
    /// - The rater keeps its own rating for players without statistics.
    pub fn new() -> Self {
        Self {
            verbosity: Verbosity::Normal,
            log: false,
            per_player: false,
            preserve_clans: true,
            preserve_squads: true,
            fallback_rating: None,
        }
    }

    /// Create configuration from environment variables.
    ///
    /// See the module documentation for the recognized variables. Unset or unparsable values
    /// fall back to the defaults of [`Configuration::new()`].
    pub fn from_env() -> Self {
        fn get_env_flag(var: &str, default: bool) -> bool {
            match std::env::var(var) {
                Ok(val) => val.eq_ignore_ascii_case("true"),
                Err(_) => default,
            }
        }

        fn get_env_parsed<T: FromStr>(var: &str, default: T) -> T {
            std::env::var(var)
                .ok()
                .and_then(|val| val.trim().parse().ok())
                .unwrap_or(default)
        }

        let default = Self::new();
        Self {
            verbosity: get_env_parsed("BALANCE_VERBOSITY", default.verbosity),
            log: get_env_flag("BALANCE_LOG", default.log),
            per_player: get_env_flag("BALANCE_PER_PLAYER", default.per_player),
            preserve_clans: get_env_flag("BALANCE_PRESERVE_CLANS", default.preserve_clans),
            preserve_squads: get_env_flag("BALANCE_PRESERVE_SQUADS", default.preserve_squads),
            fallback_rating: std::env::var("BALANCE_FALLBACK_RATING")
                .ok()
                .and_then(|val| val.trim().parse().ok())
                .or(default.fallback_rating),
        }
    }

    /// Set how much is reported through `tracing`.
    pub fn with_verbosity(mut self, value: Verbosity) -> Self {
        self.verbosity = value;
        self
    }

    /// Enable or disable logging to file.
    pub fn with_log(mut self, value: bool) -> Self {
        self.log = value;
        self
    }

    /// Enable or disable per-player granularity.
    ///
    /// When enabled, every player is a group of size one and membership hints are ignored.
    pub fn with_per_player(mut self, value: bool) -> Self {
        self.per_player = value;
        self
    }

    /// Enable or disable keeping clan members together.
    pub fn with_preserve_clans(mut self, value: bool) -> Self {
        self.preserve_clans = value;
        self
    }

    /// Enable or disable keeping squad members together.
    pub fn with_preserve_squads(mut self, value: bool) -> Self {
        self.preserve_squads = value;
        self
    }

    /// Set the rating given to players without statistics.
    ///
    /// The balancer hands it to its rater through [`Rater::set_fallback_rating`](crate::rater::Rater::set_fallback_rating).
    pub fn with_fallback_rating(mut self, value: f64) -> Self {
        self.fallback_rating = Some(value);
        self
    }

    /// Rating given to players without statistics, if it overrides the rater's own.
    pub fn fallback_rating(&self) -> Option<f64> {
        self.fallback_rating
    }

    /// Current verbosity.
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod configuration_tests {
    use super::*;

    #[test]
    fn verbosity_parses_case_insensitive() {
        assert_eq!("TRACE".parse::<Verbosity>().unwrap(), Verbosity::Trace);
        assert_eq!("quiet".parse::<Verbosity>().unwrap(), Verbosity::Quiet);
        assert!("loud".parse::<Verbosity>().is_err());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = Configuration::new()
            .with_per_player(true)
            .with_preserve_clans(false)
            .with_fallback_rating(0.3);
        assert!(config.per_player);
        assert!(!config.preserve_clans);
        assert!(config.preserve_squads);
        assert_eq!(config.fallback_rating(), Some(0.3));
        assert_eq!(Configuration::new().fallback_rating(), None);
        assert_eq!(Configuration::default().verbosity(), Verbosity::Normal);
    }
}
