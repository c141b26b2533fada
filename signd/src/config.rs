//! Configuration for the signd daemon
//!
//! Bootstrap configuration comes from an optional TOML file, layered under
//! command-line/environment overrides:
//!
//! 1. Command-line arguments (--port, --root-folder)
//! 2. Environment variables (SIGND_PORT, SIGND_ROOT_FOLDER)
//! 3. TOML configuration file
//! 4. Built-in defaults
//!
//! Everything the daemon touches on disk lives under the root folder:
//! `videos/` for uploaded files, `catalog.json` for the persisted catalog,
//! `playlist.m3u` for the artifact handed to the player.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The daemon must restart to
/// pick up changes.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Root folder for videos, catalog and playlist (optional)
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// External player invocation (optional)
    #[serde(default)]
    pub player: PlayerConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// External player invocation settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    /// Player binary name or path
    #[serde(default = "default_player_command")]
    pub command: String,

    /// Flags passed before the playlist path
    #[serde(default = "default_player_args")]
    pub args: Vec<String>,

    /// Bounded wait for cooperative exit before force-kill
    #[serde(default = "default_grace_period_secs")]
    pub grace_period_secs: u64,
}

impl PlayerConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: default_player_command(),
            args: default_player_args(),
            grace_period_secs: default_grace_period_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_player_command() -> String {
    // VLC without its Qt interface
    "cvlc".to_string()
}

fn default_player_args() -> Vec<String> {
    [
        "--fullscreen",
        "--loop",
        "--no-video-title-show",
        "--no-osd",
        "--quiet",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_grace_period_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

/// OS-dependent default root folder
///
/// `~/.local/share/signd` on Linux (or the platform equivalent), with a
/// system path fallback when no home directory is available.
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("signd"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/signd"))
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub root_folder: Option<PathBuf>,
}

/// Complete resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub port: u16,

    /// Root folder all on-disk state lives under
    pub root_folder: PathBuf,

    /// Directory holding uploaded video files
    pub video_dir: PathBuf,

    /// Persisted catalog document
    pub catalog_path: PathBuf,

    /// Playlist artifact consumed by the external player
    pub playlist_path: PathBuf,

    /// External player invocation
    pub player: PlayerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional TOML file plus overrides
    ///
    /// A missing `toml_path` is not an error (all settings have defaults);
    /// a path that is given but unreadable or unparsable is.
    pub fn load(toml_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match toml_path {
            Some(path) => {
                let toml_str = std::fs::read_to_string(path).map_err(|e| {
                    Error::Config(format!("Failed to read config file {:?}: {}", path, e))
                })?;
                let parsed: TomlConfig = toml::from_str(&toml_str)
                    .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
                info!("Loaded configuration from {:?}", path);
                parsed
            }
            None => TomlConfig::default(),
        };

        let port = overrides
            .port
            .or(toml_config.port)
            .unwrap_or_else(default_port);

        let root_folder = overrides
            .root_folder
            .or(toml_config.root_folder)
            .unwrap_or_else(default_root_folder);

        Ok(Self::from_root(
            port,
            root_folder,
            toml_config.player,
            toml_config.logging,
        ))
    }

    /// Build a configuration with all paths derived from the root folder
    pub fn from_root(
        port: u16,
        root_folder: PathBuf,
        player: PlayerConfig,
        logging: LoggingConfig,
    ) -> Self {
        let video_dir = root_folder.join("videos");
        let catalog_path = root_folder.join("catalog.json");
        let playlist_path = root_folder.join("playlist.m3u");
        Self {
            port,
            root_folder,
            video_dir,
            catalog_path,
            playlist_path,
            player,
            logging,
        }
    }

    /// Create the directories the daemon writes into
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.video_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let config = Config::load(None, ConfigOverrides::default()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.player.command, "cvlc");
        assert_eq!(config.player.grace_period(), Duration::from_secs(5));
        assert_eq!(config.video_dir, config.root_folder.join("videos"));
        assert_eq!(config.catalog_path, config.root_folder.join("catalog.json"));
    }

    #[test]
    fn test_overrides_win_over_toml() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("signd.toml");
        std::fs::write(&toml_path, "port = 9000\nroot_folder = \"/tmp/sd-toml\"\n").unwrap();

        let overrides = ConfigOverrides {
            port: Some(9999),
            root_folder: None,
        };
        let config = Config::load(Some(&toml_path), overrides).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.root_folder, PathBuf::from("/tmp/sd-toml"));
    }

    #[test]
    fn test_player_section_parsing() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("signd.toml");
        std::fs::write(
            &toml_path,
            "[player]\ncommand = \"mpv\"\nargs = [\"--fs\"]\ngrace_period_secs = 2\n",
        )
        .unwrap();

        let config = Config::load(Some(&toml_path), ConfigOverrides::default()).unwrap();
        assert_eq!(config.player.command, "mpv");
        assert_eq!(config.player.args, vec!["--fs".to_string()]);
        assert_eq!(config.player.grace_period(), Duration::from_secs(2));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("signd.toml");
        std::fs::write(&toml_path, "port = \"not a number\"").unwrap();

        let result = Config::load(Some(&toml_path), ConfigOverrides::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
