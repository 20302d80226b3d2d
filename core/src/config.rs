use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::RecorderError;
use crate::error::Result;

/// Maximum number of events a single session may hold.
pub const DEFAULT_MAX_EVENTS: usize = 10_000;

/// Serialized recordings larger than this are refused before anything is
/// written.
pub const DEFAULT_MAX_RECORDING_BYTES: u64 = 50 * 1024 * 1024;

/// Listing skips stored files larger than this.
pub const DEFAULT_MAX_READ_BYTES: u64 = 10 * 1024 * 1024;

pub const DEFAULT_WINDOW_WIDTH: u32 = 1280;
pub const DEFAULT_WINDOW_HEIGHT: u32 = 800;

const CONFIG_TOML_FILE: &str = "config.toml";
const HOME_ENV_VAR: &str = "DOMTRACE_HOME";
const HEADLESS_ENV_VAR: &str = "DOMTRACE_HEADLESS";

/// Resolved runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub domtrace_home: PathBuf,
    pub recordings_dir: PathBuf,
    pub max_events: usize,
    pub max_recording_bytes: u64,
    pub max_read_bytes: u64,
    pub headless: bool,
    /// Extra sensitive-field patterns layered on top of the built-in ones.
    pub sensitive_selectors: Vec<String>,
    pub browser: BrowserSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSettings {
    pub window_width: u32,
    pub window_height: u32,
    /// Chrome binary; auto-detected when unset.
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_height: DEFAULT_WINDOW_HEIGHT,
            executable: None,
            args: vec![
                "--no-first-run".to_string(),
                "--no-default-browser-check".to_string(),
            ],
        }
    }
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    pub recordings_dir: Option<PathBuf>,
    pub max_events: Option<usize>,
    pub max_recording_bytes: Option<u64>,
    pub max_read_bytes: Option<u64>,
    pub headless: Option<bool>,
    #[serde(default)]
    pub sensitive_selectors: Vec<String>,
    #[serde(default)]
    pub browser: BrowserToml,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BrowserToml {
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
    pub executable: Option<PathBuf>,
    pub args: Option<Vec<String>>,
}

/// Optional overrides for user configuration (e.g., from CLI flags).
#[derive(Default, Debug, Clone)]
pub struct ConfigOverrides {
    pub recordings_dir: Option<PathBuf>,
    pub max_events: Option<usize>,
    pub headless: Option<bool>,
    pub sensitive_selectors: Vec<String>,
    pub executable: Option<PathBuf>,
}

impl Config {
    /// Load configuration, applying overrides. Precedence, lowest first:
    /// built-in defaults, `$DOMTRACE_HOME/config.toml`, `DOMTRACE_HEADLESS`,
    /// `overrides`.
    pub fn load_with_overrides(mut overrides: ConfigOverrides) -> Result<Self> {
        let domtrace_home = find_domtrace_home()?;
        let cfg = load_config_as_toml(&domtrace_home)?;
        if overrides.headless.is_none() {
            overrides.headless = std::env::var(HEADLESS_ENV_VAR)
                .ok()
                .as_deref()
                .and_then(parse_env_bool);
        }
        Ok(Self::load_from_base_config_with_overrides(
            cfg,
            overrides,
            domtrace_home,
        ))
    }

    /// Meant to be used exclusively for tests: loading from a concrete
    /// `ConfigToml` without touching the environment.
    pub fn load_from_base_config_with_overrides(
        cfg: ConfigToml,
        overrides: ConfigOverrides,
        domtrace_home: PathBuf,
    ) -> Self {
        let ConfigOverrides {
            recordings_dir,
            max_events,
            headless,
            sensitive_selectors,
            executable,
        } = overrides;

        let recordings_dir = recordings_dir
            .or(cfg.recordings_dir.map(|dir| resolve_relative(&domtrace_home, dir)))
            .unwrap_or_else(|| domtrace_home.join("recordings"));

        let mut selectors = cfg.sensitive_selectors;
        selectors.extend(sensitive_selectors);

        let defaults = BrowserSettings::default();
        let browser = BrowserSettings {
            window_width: cfg.browser.window_width.unwrap_or(defaults.window_width),
            window_height: cfg.browser.window_height.unwrap_or(defaults.window_height),
            executable: executable.or(cfg.browser.executable),
            args: cfg.browser.args.unwrap_or(defaults.args),
        };

        Self {
            recordings_dir,
            max_events: max_events
                .or(cfg.max_events)
                .unwrap_or(DEFAULT_MAX_EVENTS),
            max_recording_bytes: cfg
                .max_recording_bytes
                .unwrap_or(DEFAULT_MAX_RECORDING_BYTES),
            max_read_bytes: cfg.max_read_bytes.unwrap_or(DEFAULT_MAX_READ_BYTES),
            headless: headless.or(cfg.headless).unwrap_or(false),
            sensitive_selectors: selectors,
            browser,
            domtrace_home,
        }
    }

    /// Defaults rooted at `domtrace_home`, ignoring any `config.toml`.
    pub fn with_home(domtrace_home: PathBuf) -> Self {
        Self::load_from_base_config_with_overrides(
            ConfigToml::default(),
            ConfigOverrides::default(),
            domtrace_home,
        )
    }
}

/// Reads `config.toml` from the home directory. A missing file yields the
/// defaults; a malformed one is an error.
pub fn load_config_as_toml(domtrace_home: &Path) -> Result<ConfigToml> {
    let path = domtrace_home.join(CONFIG_TOML_FILE);
    match std::fs::read_to_string(&path) {
        Ok(contents) => toml::from_str(&contents).map_err(|e| {
            tracing::error!("Failed to parse {}: {e}", path.display());
            RecorderError::Validation(format!("invalid {}: {e}", path.display()))
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!("{CONFIG_TOML_FILE} not found, using defaults");
            Ok(ConfigToml::default())
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns the domtrace home directory: `$DOMTRACE_HOME` when set and
/// non-empty, `~/.domtrace` otherwise. Does not verify that the directory
/// exists.
pub fn find_domtrace_home() -> Result<PathBuf> {
    if let Ok(val) = std::env::var(HOME_ENV_VAR)
        && !val.is_empty()
    {
        return Ok(PathBuf::from(val));
    }
    let mut p = dirs::home_dir().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not find home directory",
        )
    })?;
    p.push(".domtrace");
    Ok(p)
}

fn resolve_relative(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
