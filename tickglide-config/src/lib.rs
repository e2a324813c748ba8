#[macro_use]
extern crate tracing;

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use miette::{Context as _, IntoDiagnostic as _};

pub mod frames;
pub mod input;
pub mod motion;
pub mod utils;

pub use crate::frames::Frames;
pub use crate::input::Input;
pub use crate::motion::Motion;
pub use crate::utils::FloatOrInt;

/// The text of the bundled default config, with every option at its default value.
pub const DEFAULT_CONFIG_KDL: &str = include_str!("../../resources/default-config.kdl");

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, default)]
    pub motion: Motion,
    #[knuffel(child, default)]
    pub input: Input,
    #[knuffel(child, default)]
    pub frames: Frames,
}

#[derive(Debug, Clone)]
pub enum ConfigPath {
    /// Explicitly set config path.
    ///
    /// Load the config only from this path, never fall back to defaults.
    Explicit(PathBuf),

    /// Default config path.
    ///
    /// Prioritize the user path, fallback to the system path, fallback to the built-in defaults.
    Regular {
        /// User config path, usually `$XDG_CONFIG_HOME/tickglide/config.kdl`.
        user_path: PathBuf,
        /// System config path, usually `/etc/tickglide/config.kdl`.
        system_path: PathBuf,
    },
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("config.kdl"),
            &contents,
        )
        .context("error parsing")?;

        config
            .motion
            .validate()
            .with_context(|| format!("invalid motion settings in {path:?}"))?;

        debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = tracy_client::span!("Config::parse");
        knuffel::parse(filename, text)
    }
}

impl ConfigPath {
    /// Loads the config, returns an error if it doesn't exist.
    pub fn load(&self) -> miette::Result<Config> {
        let _span = tracy_client::span!("ConfigPath::load");

        let path = self.existing_path().ok_or_else(|| match self {
            ConfigPath::Explicit(path) => miette::miette!("config file {path:?} does not exist"),
            ConfigPath::Regular {
                user_path,
                system_path,
            } => miette::miette!(
                "no config file found; create one at {user_path:?} or {system_path:?}",
            ),
        })?;

        Config::load(path).context("error loading config")
    }

    /// Loads the config, or returns the defaults when a regular config path has no file.
    ///
    /// An explicit path that doesn't exist is still an error.
    pub fn load_or_default(&self) -> miette::Result<Config> {
        match (self, self.existing_path()) {
            (ConfigPath::Regular { .. }, None) => {
                debug!("no config file found, using defaults");
                Ok(Config::default())
            }
            _ => self.load(),
        }
    }

    fn existing_path(&self) -> Option<&Path> {
        match self {
            ConfigPath::Explicit(path) => path.exists().then_some(path.as_path()),
            ConfigPath::Regular {
                user_path,
                system_path,
            } => {
                if user_path.exists() {
                    Some(user_path.as_path())
                } else if system_path.exists() {
                    Some(system_path.as_path())
                } else {
                    None
                }
            }
        }
    }
}
