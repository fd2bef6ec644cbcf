use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SlackcatError};

pub const DEFAULT_INTERVAL_SECS: u64 = 3; // flush + drain cadence
pub const DEFAULT_API_BASE: &str = "https://slack.com/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const CONFIGURE_URL: &str = "http://slackcat.chat/configure";

/// Team name used when the config file holds a single bare token.
pub const DEFAULT_TEAM: &str = "default";

/// Top-level config (config.toml or legacy ~/.slackcat, plus SLACKCAT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlackcatConfig {
    /// Team used when `--channel` carries no `team:` prefix.
    #[serde(default)]
    pub default_team: Option<String>,
    /// Channel used when `--channel` is omitted.
    #[serde(default)]
    pub default_channel: Option<String>,
    /// Team name -> API token.
    #[serde(default)]
    pub teams: BTreeMap<String, String>,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub slack: SlackConfig,
}

/// Tuning for `--stream` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Seconds between flushes. Also the drain poll interval on shutdown.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub format: BatchFormat,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            format: BatchFormat::default(),
        }
    }
}

/// How a batch of streamed lines is rendered into one message body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFormat {
    /// Wrapped in a ``` preformatted block.
    #[default]
    Code,
    /// Literal text, markup disabled.
    Plain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Per-request HTTP timeout. A hung call fails after this many seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// A `--channel` value resolved against the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelTarget {
    pub team: String,
    pub token: String,
    pub channel: String,
}

fn default_interval_secs() -> u64 {
    DEFAULT_INTERVAL_SECS
}
fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl SlackcatConfig {
    /// Load config with SLACKCAT_* env var overrides (`__` separates nested keys,
    /// e.g. `SLACKCAT_STREAM__INTERVAL_SECS=5`).
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. `SLACKCAT_CONFIG` env var
    ///   3. `$XDG_CONFIG_HOME/slackcat/config.toml` (or `~/.config/slackcat/config.toml`)
    ///   4. `~/.slackcat` (legacy line format)
    ///
    /// Files ending in `.toml` are read as TOML, anything else as the legacy format.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let env_path = std::env::var("SLACKCAT_CONFIG").ok();
        let explicit = config_path.or(env_path.as_deref());
        let path = match explicit {
            Some(p) => PathBuf::from(p),
            None => discover(
                std::env::var("HOME").ok().as_deref(),
                std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
            )?,
        };
        Self::load_from(&path)
    }

    /// Load a specific file, then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let base = if is_toml(path) {
            if !path.exists() {
                return Err(SlackcatError::Config(format!(
                    "unable to read config: {}",
                    path.display()
                )));
            }
            Figment::new().merge(Toml::file(path))
        } else {
            let text = std::fs::read_to_string(path).map_err(|e| {
                SlackcatError::Config(format!("unable to read config: {}: {e}", path.display()))
            })?;
            Figment::from(Serialized::defaults(Self::parse_legacy(&text)?))
        };

        base.merge(Env::prefixed("SLACKCAT_").split("__"))
            .extract()
            .map_err(|e| SlackcatError::Config(e.to_string()))
    }

    /// Parse the legacy `~/.slackcat` format.
    ///
    /// A single non-empty line is a bare token for team `default`. Otherwise
    /// every line is `key = value`; `default_team` and `default_channel` are
    /// reserved keys and any other key names a team.
    pub fn parse_legacy(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut config = Self::default();

        if let [token] = lines.as_slice() {
            config.teams.insert(DEFAULT_TEAM.to_string(), strip(token));
            config.default_team = Some(DEFAULT_TEAM.to_string());
            return Ok(config);
        }

        for line in lines {
            let parts: Vec<&str> = line.split('=').collect();
            let [key, val] = parts.as_slice() else {
                return Err(SlackcatError::ConfigLine {
                    line: line.to_string(),
                });
            };
            let (key, val) = (strip(key), strip(val));
            match key.as_str() {
                "default_team" => config.default_team = Some(val),
                "default_channel" => config.default_channel = Some(val),
                _ => {
                    config.teams.insert(key, val);
                }
            }
        }
        Ok(config)
    }

    /// The team used when none is named: `default_team`, or the only team configured.
    pub fn default_team(&self) -> Option<&str> {
        if let Some(ref team) = self.default_team {
            return Some(team);
        }
        match self.teams.len() {
            1 => self.teams.keys().next().map(String::as_str),
            _ => None,
        }
    }

    /// Resolve a `--channel` option (`name`, `team:name`, or nothing) to a
    /// team, its token, and the channel name.
    pub fn resolve_channel(&self, channel: Option<&str>) -> Result<ChannelTarget> {
        let (team, channel) = match channel.filter(|c| !c.is_empty()) {
            None => {
                let channel = self
                    .default_channel
                    .clone()
                    .filter(|c| !c.is_empty())
                    .ok_or(SlackcatError::NoChannel)?;
                (self.default_team().map(String::from), channel)
            }
            Some(c) => match c.split_once(':') {
                Some((team, name)) => (Some(team.to_string()), name.to_string()),
                None => (self.default_team().map(String::from), c.to_string()),
            },
        };

        let team = team.unwrap_or_else(|| DEFAULT_TEAM.to_string());
        let token = self
            .teams
            .get(&team)
            .cloned()
            .ok_or_else(|| SlackcatError::UnknownTeam { team: team.clone() })?;

        Ok(ChannelTarget {
            team,
            token,
            channel,
        })
    }
}

/// Return the first existing config file among the standard locations.
fn discover(home: Option<&str>, xdg_config_home: Option<&str>) -> Result<PathBuf> {
    let candidates = candidate_paths(home, xdg_config_home)?;
    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or_else(|| {
            SlackcatError::Config(format!(
                "no config file found (looked in {}); run `slackcat --configure`",
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
}

fn candidate_paths(home: Option<&str>, xdg_config_home: Option<&str>) -> Result<Vec<PathBuf>> {
    let home = home.filter(|h| !h.is_empty()).ok_or(SlackcatError::NoHome)?;
    let xdg = match xdg_config_home.filter(|x| !x.is_empty()) {
        Some(x) => PathBuf::from(x),
        None => Path::new(home).join(".config"),
    };
    Ok(vec![
        xdg.join("slackcat").join("config.toml"),
        Path::new(home).join(".slackcat"),
    ])
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "toml")
}

fn strip(s: &str) -> String {
    s.replace(' ', "")
}
