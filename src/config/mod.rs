use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use url::Url;

/// Largest page the playlistItems endpoint hands out
pub const MAX_PAGE_SIZE: u32 = 50;

/// Environment variable that overrides `youtube.api_key`
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Environment variable that overrides `app.log_level`
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Environment variable that overrides `app.log_file`
pub const LOG_FILE_ENV: &str = "LOG_FILE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// YouTube endpoints and fetch policy
    pub youtube: YoutubeConfig,

    /// Application settings
    pub app: AppConfig,

    /// File the configuration was read from, `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Settings taken from the process environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    pub api_key: Option<String>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok(),
            log_level: std::env::var(LOG_LEVEL_ENV).ok(),
            log_file: std::env::var_os(LOG_FILE_ENV).map(PathBuf::from),
        }
    }
}

/// Load `KEY=value` pairs from a dotenv file into the process environment.
///
/// Variables that are already set keep their value. Returns `false` when the
/// file does not exist.
pub fn load_dotenv(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    /// Data API key, overridden by `YOUTUBE_API_KEY`
    #[serde(default)]
    pub api_key: String,

    /// Base URL of the Data API v3
    pub api_base_url: String,

    /// Base URL used to load watch pages
    pub watch_base_url: String,

    /// Items requested per playlist page
    pub page_size: u32,

    /// Upper bound on pages fetched for one playlist
    pub max_pages: usize,

    /// Caption language picked before falling back to the first track
    pub preferred_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Playlists processed by `run` when none are passed on the command line
    #[serde(default)]
    pub playlists: Vec<String>,

    /// Cap on videos processed per playlist
    pub max_videos_per_playlist: Option<usize>,

    /// Prefix for placeholder document locations
    pub docs_base_url: String,

    /// Default log level when RUST_LOG is unset
    pub log_level: String,

    /// `text` or `json`
    pub log_format: String,

    /// Also write logs to this file, rotated daily
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube: YoutubeConfig {
                api_key: String::new(),
                api_base_url: "https://www.googleapis.com/youtube/v3".to_string(),
                watch_base_url: "https://www.youtube.com".to_string(),
                page_size: MAX_PAGE_SIZE,
                max_pages: 200,
                preferred_language: "en".to_string(),
            },
            app: AppConfig {
                playlists: [
                    "PLgBzZN2MBL00NGEQqQ_ORvigykKJJCIBm",
                    "PL0ccfwBkWtNNoJqDb-F0pWm74VGsJ1FGk",
                    "PL0ccfwBkWtNPF5QRysBXJf8pqhDoUW5aY",
                ]
                .iter()
                .map(|id| format!("https://www.youtube.com/playlist?list={id}"))
                .collect(),
                max_videos_per_playlist: None,
                docs_base_url: "https://docs.google.com/document/d".to_string(),
                log_level: "info".to_string(),
                log_format: "text".to_string(),
                log_file: None,
            },
            source: None,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, the default locations, or defaults.
    ///
    /// Settings from the environment always win over the file. Runs before
    /// logging is set up, so nothing here logs; `source` records where the
    /// settings came from.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from(path)?,
            None => match Self::existing_config_path() {
                Some(path) => Self::load_from(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env_overrides(EnvOverrides::from_env());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without looking at the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let mut config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs_err::create_dir_all(parent)?;
            }
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get the per-user configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("yt-transcripts").join("config.yaml"))
    }

    fn existing_config_path() -> Option<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        Self::default_config_path().ok().filter(|path| path.exists())
    }

    /// Blank values are ignored
    pub fn apply_env_overrides(&mut self, env: EnvOverrides) {
        if let Some(key) = env.api_key.filter(|k| !k.trim().is_empty()) {
            self.youtube.api_key = key;
        }
        if let Some(level) = env.log_level.filter(|l| !l.trim().is_empty()) {
            self.app.log_level = level.trim().to_lowercase();
        }
        if let Some(file) = env.log_file.filter(|f| !f.as_os_str().is_empty()) {
            self.app.log_file = Some(file);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.youtube.page_size == 0 || self.youtube.page_size > MAX_PAGE_SIZE {
            anyhow::bail!(
                "youtube.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                self.youtube.page_size
            );
        }

        if self.youtube.max_pages == 0 {
            anyhow::bail!("youtube.max_pages must be at least 1");
        }

        if self.youtube.preferred_language.trim().is_empty() {
            anyhow::bail!("youtube.preferred_language must not be empty");
        }

        for (name, value) in [
            ("youtube.api_base_url", &self.youtube.api_base_url),
            ("youtube.watch_base_url", &self.youtube.watch_base_url),
            ("app.docs_base_url", &self.app.docs_base_url),
        ] {
            Url::parse(value)
                .with_context(|| format!("{} is not a valid URL: {}", name, value))?;
        }

        let level = self.app.log_level.trim();
        if level.is_empty() || level.parse::<LevelFilter>().is_err() {
            anyhow::bail!(
                "app.log_level must be one of off, error, warn, info, debug, trace; got `{}`",
                self.app.log_level
            );
        }

        if !matches!(self.app.log_format.as_str(), "text" | "json") {
            anyhow::bail!(
                "app.log_format must be `text` or `json`, got `{}`",
                self.app.log_format
            );
        }

        if let Some(file) = &self.app.log_file {
            if file.file_name().is_none() {
                anyhow::bail!("app.log_file must name a file, got `{}`", file.display());
            }
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        !self.youtube.api_key.trim().is_empty()
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        let key = if self.has_api_key() { "configured" } else { "missing" };
        match &self.source {
            Some(path) => println!("  Loaded from: {}", path.display()),
            None => println!("  Loaded from: built-in defaults"),
        }
        println!("  API Key: {}", key);
        println!("  Data API: {}", self.youtube.api_base_url);
        println!("  Watch pages: {}", self.youtube.watch_base_url);
        println!(
            "  Page size: {} (max {} pages)",
            self.youtube.page_size, self.youtube.max_pages
        );
        println!("  Preferred language: {}", self.youtube.preferred_language);
        if let Some(cap) = self.app.max_videos_per_playlist {
            println!("  Max videos per playlist: {}", cap);
        }
        println!("  Playlists: {}", self.app.playlists.len());
        for playlist in &self.app.playlists {
            println!("    • {}", playlist);
        }
        println!("  Log level: {} ({})", self.app.log_level, self.app.log_format);
        if let Some(file) = &self.app.log_file {
            println!("  Log file: {}", file.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.youtube.page_size, 50);
        assert_eq!(config.youtube.preferred_language, "en");
        assert_eq!(config.app.playlists.len(), 3);
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_page_size_bounds() {
        let mut config = Config::default();
        config.youtube.page_size = 51;
        assert!(config.validate().is_err());
        config.youtube.page_size = 0;
        assert!(config.validate().is_err());
        config.youtube.page_size = 10;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_urls_and_log_format() {
        let mut config = Config::default();
        config.youtube.api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.app.log_format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    fn api_key(key: &str) -> EnvOverrides {
        EnvOverrides {
            api_key: Some(key.to_string()),
            ..EnvOverrides::default()
        }
    }

    #[test]
    fn test_env_override_wins_unless_blank() {
        let mut config = Config::default();
        config.youtube.api_key = "from-file".to_string();

        config.apply_env_overrides(api_key("  "));
        assert_eq!(config.youtube.api_key, "from-file");

        config.apply_env_overrides(api_key("from-env"));
        assert_eq!(config.youtube.api_key, "from-env");

        config.apply_env_overrides(EnvOverrides::default());
        assert_eq!(config.youtube.api_key, "from-env");
    }

    #[test]
    fn test_env_overrides_logging() {
        let mut config = Config::default();
        config.apply_env_overrides(EnvOverrides {
            log_level: Some("DEBUG".to_string()),
            log_file: Some(PathBuf::from("logs/app.log")),
            ..EnvOverrides::default()
        });

        assert_eq!(config.app.log_level, "debug");
        assert_eq!(config.app.log_file, Some(PathBuf::from("logs/app.log")));
        assert!(config.validate().is_ok());

        config.apply_env_overrides(EnvOverrides {
            log_level: Some(String::new()),
            log_file: Some(PathBuf::new()),
            ..EnvOverrides::default()
        });
        assert_eq!(config.app.log_level, "debug");
        assert_eq!(config.app.log_file, Some(PathBuf::from("logs/app.log")));
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.app.log_level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("app.log_level"));

        config.app.log_level = String::new();
        assert!(config.validate().is_err());

        for level in ["off", "error", "warn", "info", "debug", "trace"] {
            config.app.log_level = level.to_string();
            assert!(config.validate().is_ok(), "{level} should be accepted");
        }
    }

    #[test]
    fn test_log_file_must_name_a_file() {
        let mut config = Config::default();
        config.app.log_file = Some(PathBuf::from("/"));
        assert!(config.validate().is_err());

        config.app.log_file = Some(PathBuf::from("app.log"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_dotenv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        assert!(!load_dotenv(&path).unwrap());

        fs_err::write(&path, "YT_TRANSCRIPTS_DOTENV_TEST=from-dotenv\n").unwrap();
        assert!(load_dotenv(&path).unwrap());
        assert_eq!(
            std::env::var("YT_TRANSCRIPTS_DOTENV_TEST").unwrap(),
            "from-dotenv"
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.youtube.preferred_language = "de".to_string();
        config.app.max_videos_per_playlist = Some(5);
        config.app.log_file = Some(PathBuf::from("logs/yt-transcripts.log"));
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.youtube.preferred_language, "de");
        assert_eq!(loaded.app.max_videos_per_playlist, Some(5));
        assert_eq!(loaded.app.playlists, config.app.playlists);
        assert_eq!(loaded.app.log_file, config.app.log_file);
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert!(Config::default().source.is_none());
    }

    #[test]
    fn test_missing_optional_fields_use_serde_defaults() {
        let yaml = r#"
youtube:
  api_base_url: https://www.googleapis.com/youtube/v3
  watch_base_url: https://www.youtube.com
  page_size: 25
  max_pages: 10
  preferred_language: en
app:
  max_videos_per_playlist: null
  docs_base_url: https://docs.google.com/document/d
  log_level: debug
  log_format: json
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.youtube.api_key.is_empty());
        assert!(config.app.playlists.is_empty());
        assert!(config.app.log_file.is_none());
        assert!(config.validate().is_ok());
    }
}
