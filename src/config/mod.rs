//! Configuration management.
//!
//! Settings come from, in increasing precedence: built-in defaults, a TOML
//! file, and `ANNEX_*` environment variables.
//!
//! ```toml
//! threshold_overfetch = 100
//!
//! [mutable_graph]
//! space = "cosine"
//! m = 16
//! ef_construction = 200
//! ef_search = 64
//!
//! [static_graph]
//! metric = "euclidean"
//! seed = 7
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::backends::{DEFAULT_THRESHOLD_OVERFETCH, MutableGraphArgs, StaticGraphArgs};
use crate::models::{MutableMetric, StaticMetric};
use crate::observability::{LogFormat, LoggingConfig};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable overriding [`AnnexConfig::threshold_overfetch`].
pub const ENV_THRESHOLD_OVERFETCH: &str = "ANNEX_THRESHOLD_OVERFETCH";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "ANNEX_LOG_LEVEL";
/// Environment variable overriding the log format.
pub const ENV_LOG_FORMAT: &str = "ANNEX_LOG_FORMAT";

/// Main configuration for annex.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnexConfig {
    /// Neighbors fetched per query vector by threshold queries.
    pub threshold_overfetch: usize,
    /// Tuning applied to new mutable graph backends.
    pub mutable_graph: MutableGraphSettings,
    /// Tuning applied to new static graph backends.
    pub static_graph: StaticGraphSettings,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Dimension-independent tuning of the mutable graph backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutableGraphSettings {
    /// Distance metric.
    pub space: MutableMetric,
    /// Graph degree.
    pub m: usize,
    /// Build-time candidate list size.
    pub ef_construction: usize,
    /// Search-time candidate list size.
    pub ef_search: usize,
}

/// Dimension-independent tuning of the static graph backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticGraphSettings {
    /// Distance metric.
    pub metric: StaticMetric,
    /// Build-time candidate list size.
    pub ef_construction: usize,
    /// Search-time candidate list size.
    pub ef_search: usize,
    /// Construction seed.
    pub seed: u64,
}

impl Default for MutableGraphSettings {
    fn default() -> Self {
        let args = MutableGraphArgs::new(0);
        Self {
            space: args.space,
            m: args.m,
            ef_construction: args.ef_construction,
            ef_search: args.ef_search,
        }
    }
}

impl Default for StaticGraphSettings {
    fn default() -> Self {
        let args = StaticGraphArgs::new(0);
        Self {
            metric: args.metric,
            ef_construction: args.ef_construction,
            ef_search: args.ef_search,
            seed: args.seed,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Threshold over-fetch size.
    pub threshold_overfetch: Option<usize>,
    /// Mutable graph section.
    pub mutable_graph: Option<ConfigFileMutableGraph>,
    /// Static graph section.
    pub static_graph: Option<ConfigFileStaticGraph>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// `[mutable_graph]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMutableGraph {
    /// Metric name.
    pub space: Option<String>,
    /// Graph degree.
    pub m: Option<usize>,
    /// Build-time candidate list size.
    pub ef_construction: Option<usize>,
    /// Search-time candidate list size.
    pub ef_search: Option<usize>,
}

/// `[static_graph]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStaticGraph {
    /// Metric name.
    pub metric: Option<String>,
    /// Build-time candidate list size.
    pub ef_construction: Option<usize>,
    /// Search-time candidate list size.
    pub ef_search: Option<usize>,
    /// Construction seed.
    pub seed: Option<u64>,
}

/// `[logging]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive, e.g. `info` or `annex=debug`.
    pub level: Option<String>,
    /// `pretty`, `compact` or `json`.
    pub format: Option<String>,
    /// Log file path (stderr when unset).
    pub file: Option<String>,
}

impl Default for AnnexConfig {
    fn default() -> Self {
        Self {
            threshold_overfetch: DEFAULT_THRESHOLD_OVERFETCH,
            mutable_graph: MutableGraphSettings::default(),
            static_graph: StaticGraphSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AnnexConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or names an
    /// unknown metric or log format.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::operation("read_config_file", format!("{}: {e}", path.display())))?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or names an unknown
    /// metric or log format.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::operation("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/annex/` on macOS)
    /// 2. XDG config dir (`~/.config/annex/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        Self::default_paths()
            .into_iter()
            .filter(|path| path.exists())
            .find_map(|path| match Self::load_from_file(&path) {
                Ok(config) => Some(config),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                    None
                },
            })
            .unwrap_or_default()
    }

    /// Candidate config file paths, most specific first.
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        vec![
            base_dirs.config_dir().join("annex").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("annex")
                .join("config.toml"),
        ]
    }

    /// Applies `ANNEX_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_THRESHOLD_OVERFETCH) {
            match raw.trim().parse::<usize>() {
                Ok(value) => self.threshold_overfetch = value,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring {ENV_THRESHOLD_OVERFETCH}"),
            }
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }
        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            match raw.parse::<LogFormat>() {
                Ok(format) => self.logging.format = format,
                Err(e) => tracing::warn!(value = %raw, error = %e, "ignoring {ENV_LOG_FORMAT}"),
            }
        }
        self
    }

    /// Mutable graph arguments for `dim`-dimensional vectors.
    #[must_use]
    pub const fn mutable_graph_args(&self, dim: usize) -> MutableGraphArgs {
        MutableGraphArgs::new(dim)
            .with_space(self.mutable_graph.space)
            .with_m(self.mutable_graph.m)
            .with_ef_construction(self.mutable_graph.ef_construction)
            .with_ef_search(self.mutable_graph.ef_search)
    }

    /// Static graph arguments for `dim`-dimensional vectors.
    #[must_use]
    pub const fn static_graph_args(&self, dim: usize) -> StaticGraphArgs {
        StaticGraphArgs::new(dim)
            .with_metric(self.static_graph.metric)
            .with_ef_construction(self.static_graph.ef_construction)
            .with_ef_search(self.static_graph.ef_search)
            .with_seed(self.static_graph.seed)
    }

    /// Converts a `ConfigFile` to `AnnexConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(overfetch) = file.threshold_overfetch {
            config.threshold_overfetch = overfetch;
        }
        if let Some(section) = file.mutable_graph {
            let settings = &mut config.mutable_graph;
            if let Some(space) = section.space {
                settings.space = space.parse()?;
            }
            if let Some(v) = section.m {
                settings.m = v;
            }
            if let Some(v) = section.ef_construction {
                settings.ef_construction = v;
            }
            if let Some(v) = section.ef_search {
                settings.ef_search = v;
            }
        }
        if let Some(section) = file.static_graph {
            let settings = &mut config.static_graph;
            if let Some(metric) = section.metric {
                settings.metric = metric.parse()?;
            }
            if let Some(v) = section.ef_construction {
                settings.ef_construction = v;
            }
            if let Some(v) = section.ef_search {
                settings.ef_search = v;
            }
            if let Some(v) = section.seed {
                settings.seed = v;
            }
        }
        if let Some(section) = file.logging {
            if let Some(level) = section.level {
                config.logging.level = level;
            }
            if let Some(format) = section.format {
                config.logging.format = format.parse()?;
            }
            config.logging.file = section.file.map(PathBuf::from);
        }

        Ok(config)
    }
}
