use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::formatter::DEFAULT_TEASER_LEN;

/// Per-user config directory (`~/.config/octofeed` on Linux).
pub fn config_home() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("octofeed"))
}

/// Directory for log files.
pub fn data_home() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("octofeed")
}

/// How often the tick event fires (ms).
pub const TICK_RATE_MS: u64 = 250;

/// File watcher debounce interval (ms).
pub const DEBOUNCE_MS: u64 = 200;

/// How often `gh` feeds are re-fetched (s).
pub const POLL_INTERVAL_SECS: u64 = 60;

/// Events requested per `gh api` call.
pub const DEFAULT_PER_PAGE: u32 = 30;

/// How long a status notice stays in the status bar (s).
pub const NOTICE_SECS: u64 = 5;

// ---------------------------------------------------------------------------
// Config file (.octofeed.toml)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    pub feed: Option<FeedConfig>,
    pub display: Option<DisplayConfig>,
    pub tabs: Option<TabsConfig>,
    pub launcher: Option<LauncherConfig>,
    /// Template overrides, keyed by string name (e.g. `event_push_title`).
    pub strings: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct FeedConfig {
    /// Login whose received/performed events are shown. Defaults to the
    /// `gh` user.
    pub user: Option<String>,
    /// Read events from a JSON file instead of `gh`.
    pub file: Option<PathBuf>,
    pub per_page: Option<u32>,
    pub poll_interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DisplayConfig {
    pub tick_rate: Option<u64>,
    pub teaser_length: Option<usize>,
}

/// Per-tab enable/disable configuration. All tabs default to enabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TabsConfig {
    pub received: Option<bool>,
    pub performed: Option<bool>,
    pub public: Option<bool>,
}

impl TabsConfig {
    pub fn received(&self) -> bool {
        self.received.unwrap_or(true)
    }

    pub fn performed(&self) -> bool {
        self.performed.unwrap_or(true)
    }

    pub fn public(&self) -> bool {
        self.public.unwrap_or(true)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LauncherConfig {
    /// Set to false to drop the built-in system opener.
    pub system: Option<bool>,
    pub handlers: Option<Vec<HandlerConfig>>,
}

/// An external application declared in `[[launcher.handlers]]`.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerConfig {
    pub id: String,
    pub name: Option<String>,
    /// Program and arguments; the URI is appended as the last argument.
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub schemes: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    /// MIME patterns such as `image/*`; empty means untyped links only.
    #[serde(default)]
    pub mime: Vec<String>,
    pub browsable: Option<bool>,
    pub enabled: Option<bool>,
    pub exported: Option<bool>,
}

impl AppConfig {
    pub fn tabs_config(&self) -> TabsConfig {
        self.tabs.clone().unwrap_or_default()
    }

    pub fn tick_rate(&self) -> u64 {
        self.display
            .as_ref()
            .and_then(|d| d.tick_rate)
            .unwrap_or(TICK_RATE_MS)
    }

    pub fn teaser_length(&self) -> usize {
        self.display
            .as_ref()
            .and_then(|d| d.teaser_length)
            .unwrap_or(DEFAULT_TEASER_LEN)
    }

    pub fn feed_user(&self) -> Option<&str> {
        self.feed.as_ref().and_then(|f| f.user.as_deref())
    }

    pub fn feed_file(&self) -> Option<&Path> {
        self.feed.as_ref().and_then(|f| f.file.as_deref())
    }

    pub fn per_page(&self) -> u32 {
        self.feed
            .as_ref()
            .and_then(|f| f.per_page)
            .unwrap_or(DEFAULT_PER_PAGE)
    }

    pub fn poll_interval(&self) -> u64 {
        self.feed
            .as_ref()
            .and_then(|f| f.poll_interval)
            .unwrap_or(POLL_INTERVAL_SECS)
    }

    pub fn system_handler_enabled(&self) -> bool {
        self.launcher
            .as_ref()
            .and_then(|l| l.system)
            .unwrap_or(true)
    }

    pub fn handlers(&self) -> &[HandlerConfig] {
        self.launcher
            .as_ref()
            .and_then(|l| l.handlers.as_deref())
            .unwrap_or_default()
    }

    pub fn string_overrides(&self) -> HashMap<String, String> {
        self.strings.clone().unwrap_or_default()
    }
}

/// Load config from `.octofeed.toml` in `cwd`, falling back to
/// `<config dir>/octofeed/config.toml`. Missing or unparsable files give
/// the default config.
pub fn load_config(cwd: &Path) -> AppConfig {
    let candidates = std::iter::once(cwd.join(".octofeed.toml"))
        .chain(config_home().map(|d| d.join("config.toml")));
    for path in candidates {
        if path.exists() {
            return load_config_file(&path);
        }
    }
    AppConfig::default()
}

pub fn load_config_file(path: &Path) -> AppConfig {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read config");
            return AppConfig::default();
        }
    };
    match toml::from_str(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.tick_rate(), TICK_RATE_MS);
        assert_eq!(config.teaser_length(), DEFAULT_TEASER_LEN);
        assert_eq!(config.per_page(), DEFAULT_PER_PAGE);
        assert!(config.system_handler_enabled());
        assert!(config.handlers().is_empty());
        assert!(config.tabs_config().public());
    }

    #[test]
    fn parses_full_config() {
        let config: AppConfig = toml::from_str(
            r#"
            [feed]
            user = "octocat"
            per_page = 50

            [display]
            teaser_length = 40

            [tabs]
            public = false

            [launcher]
            system = false

            [[launcher.handlers]]
            id = "firefox"
            name = "Firefox"
            command = ["firefox", "--new-tab"]
            schemes = ["http", "https"]

            [strings]
            event_fork_title = "{0} forked {1}/{2}!"
            "#,
        )
        .unwrap();
        assert_eq!(config.feed_user(), Some("octocat"));
        assert_eq!(config.per_page(), 50);
        assert_eq!(config.teaser_length(), 40);
        assert!(!config.tabs_config().public());
        assert!(config.tabs_config().received());
        assert!(!config.system_handler_enabled());
        assert_eq!(config.handlers()[0].command, vec!["firefox", "--new-tab"]);
        assert_eq!(config.string_overrides().len(), 1);
    }

    #[test]
    fn invalid_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".octofeed.toml");
        std::fs::write(&path, "feed = 3").unwrap();
        let config = load_config(dir.path());
        assert!(config.feed.is_none());

        std::fs::write(&path, "[feed]\nuser = \"hubot\"\n").unwrap();
        assert_eq!(load_config(dir.path()).feed_user(), Some("hubot"));
    }
}
