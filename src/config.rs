use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use anyhow::{Result, anyhow};

/// Default cap on the length of a user message, in characters.
pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 120;

/// Delay between readiness probes while the backend is unreachable.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(5000);

pub const DEFAULT_TITLE: &str = "Sala Girasol 🌻";

/// How strictly the readiness probe judges a backend response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    /// Any HTTP response counts as reachable; only transport errors retry.
    #[default]
    Permissive,
    /// A success status is required.
    Strict,
}

/// What the host knows about the tag that loaded the widget.
#[derive(Debug, Clone, Default)]
pub struct ScriptTag {
    /// The script's own URL.
    pub src: String,
    /// Value of the optional `data-api` attribute.
    pub data_api: Option<String>,
}

impl ScriptTag {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            data_api: None,
        }
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.data_api = Some(api.into());
        self
    }

    /// Directory the script was served from; sibling assets live here.
    pub fn asset_base(&self) -> &str {
        match self.src.rfind('/') {
            Some(idx) => &self.src[..idx],
            None => "",
        }
    }

    /// Backend origin: the explicit attribute wins, otherwise whatever precedes
    /// the conventional `/widget/` directory in the script URL.
    pub fn api_origin(&self) -> Option<String> {
        if let Some(raw) = self.data_api.as_deref() {
            let origin = raw.trim_end_matches('/');
            if !origin.is_empty() {
                return Some(origin.to_string());
            }
        }

        if self.src.contains("/widget/") {
            if let Some(idx) = self.src.find("/widget") {
                let origin = &self.src[..idx];
                if !origin.is_empty() {
                    return Some(origin.to_string());
                }
            }
        }

        None
    }

    /// Stylesheet URL with a cache-busting query. Reuses the script's own
    /// query string when it has one.
    pub fn stylesheet_href(&self) -> String {
        let buster = match self.src.split('?').nth(1) {
            Some(query) => query.to_string(),
            None => format!("v={}", epoch_millis()),
        };
        format!("{}/style.css?{}", self.asset_base(), buster)
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Configuration resolved once at startup.
#[derive(Debug, Clone)]
pub struct WidgetConfig {
    pub asset_base: String,
    pub stylesheet_href: String,
    /// `None` means unconfigured; the widget then never becomes ready.
    pub api_origin: Option<String>,
    pub max_message_chars: usize,
    pub probe_mode: ProbeMode,
    pub retry_delay: Duration,
    pub title: String,
}

impl WidgetConfig {
    pub fn from_script(tag: &ScriptTag) -> Self {
        Self {
            asset_base: tag.asset_base().to_string(),
            stylesheet_href: tag.stylesheet_href(),
            api_origin: tag.api_origin(),
            ..Self::default()
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            asset_base: String::new(),
            stylesheet_href: String::new(),
            api_origin: None,
            max_message_chars: DEFAULT_MAX_MESSAGE_CHARS,
            probe_mode: ProbeMode::default(),
            retry_delay: DEFAULT_RETRY_DELAY,
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Optional settings file, `<config dir>/girasol/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Settings {
    pub script_src: Option<String>,
    pub api_origin: Option<String>,
    pub max_message_chars: Option<usize>,
    pub probe_mode: Option<ProbeMode>,
    pub title: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("girasol").join("config.json"))
    }
}

/// Values supplied on the command line or through the environment. Anything
/// set here overrides the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub script_src: Option<String>,
    pub api_origin: Option<String>,
    pub max_message_chars: Option<usize>,
    pub strict_probe: bool,
}

/// Merge overrides over the settings file and resolve the final config.
pub fn resolve(overrides: &Overrides, settings: &Settings) -> WidgetConfig {
    let src = overrides
        .script_src
        .clone()
        .or_else(|| settings.script_src.clone())
        .unwrap_or_default();

    let mut tag = ScriptTag::new(src);
    tag.data_api = overrides
        .api_origin
        .clone()
        .or_else(|| settings.api_origin.clone());

    let mut config = WidgetConfig::from_script(&tag);

    if let Some(max) = overrides.max_message_chars.or(settings.max_message_chars) {
        // A zero cap would make every message blank.
        config.max_message_chars = max.max(1);
    }
    config.probe_mode = if overrides.strict_probe {
        ProbeMode::Strict
    } else {
        settings.probe_mode.unwrap_or_default()
    };
    if let Some(title) = &settings.title {
        config.title = title.clone();
    }

    config
}
