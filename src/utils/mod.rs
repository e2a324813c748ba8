use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use git_version::git_version;
use rustix::time::{clock_gettime, ClockId};
use tickglide_config::ConfigPath;

pub mod id;

pub fn version() -> String {
    format!(
        "{} ({})",
        env!("CARGO_PKG_VERSION"),
        git_version!(fallback = "unknown commit"),
    )
}

pub fn get_monotonic_time() -> Duration {
    let ts = clock_gettime(ClockId::Monotonic);
    Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32)
}

pub fn to_millis_f64(time: Duration) -> f64 {
    time.as_nanos() as f64 / 1_000_000.
}

pub fn from_millis_f64(ms: f64) -> Duration {
    Duration::from_nanos((ms * 1_000_000.).round() as u64)
}

/// Resolves where the config should be loaded from.
///
/// The command-line path wins over `$TICKGLIDE_CONFIG`, which wins over the regular user and
/// system locations.
pub fn config_path(cli_path: Option<PathBuf>) -> ConfigPath {
    if let Some(path) = cli_path {
        return ConfigPath::Explicit(path);
    }

    if let Some(path) = std::env::var_os("TICKGLIDE_CONFIG") {
        if !path.is_empty() {
            return ConfigPath::Explicit(PathBuf::from(path));
        }
    }

    let user_path = ProjectDirs::from("", "", "tickglide")
        .map(|dirs| dirs.config_dir().join("config.kdl"))
        .unwrap_or_else(|| PathBuf::from("config.kdl"));

    ConfigPath::Regular {
        user_path,
        system_path: PathBuf::from("/etc/tickglide/config.kdl"),
    }
}
