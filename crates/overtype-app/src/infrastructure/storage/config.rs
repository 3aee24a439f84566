//! TOML-based configuration and runtime-state persistence.
//!
//! Reads and writes [`AppConfig`] and [`RuntimeState`] to the
//! platform-appropriate directory:
//! - Windows:  `%APPDATA%\OverType\config.toml` (+ `state.toml`)
//! - Linux:    `~/.config/overtype/config.toml`
//! - macOS:    `~/Library/Application Support/OverType/config.toml`
//!
//! Configuration (`config.toml`) is what the user edits: hotkey bindings,
//! overlay appearance, logging level.  Runtime state (`state.toml`) is what
//! the application writes on its own: the enabled and minimized flags, saved
//! on every toggle so the engine comes back in the same shape it was left
//! in.  Keeping them in separate files means a state write can never clobber
//! a hand-edited config.
//!
//! # Serde default values
//!
//! Every field carries a `#[serde(default = "...")]` annotation (or a
//! `Default` impl at the section level), so an empty, partial, or older file
//! loads cleanly with the missing fields filled in.  This replaces an
//! explicit merge-with-defaults pass: deserialization *is* the merge.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use overtype_core::{scancode, Action, Binding, ModifierSet};

use crate::application::dispatch_actions::{StateStore, StateStoreError};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The value could not be serialized to TOML.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level application configuration stored in `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    /// Hotkey bindings, replaced wholesale on reload.  The default set is
    /// installed when the section is absent; an explicitly empty list is
    /// respected as "no hotkeys".
    #[serde(default = "default_hotkeys")]
    pub hotkeys: Vec<Binding>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// General behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralConfig {
    /// Whether the overlay comes on screen at launch.  This gates only the
    /// initial visibility; the enabled flag itself is runtime state.
    #[serde(default = "default_true")]
    pub enabled_on_startup: bool,
}

/// Overlay appearance and placement, consumed by the embedding UI shell.
///
/// The core only stores these; `opacity`, `theme`, and the auto-hide delay
/// are read by the UI through the command bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverlayConfig {
    /// Keep the overlay above other windows while visible.
    #[serde(default = "default_true")]
    pub always_on_top: bool,
    /// Overlay window opacity, 0.0 (invisible) to 1.0 (opaque).
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// UI theme name, e.g. `"light"` or `"dark"`.
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Auto-hide delay after a fired action, in milliseconds.  0 disables.
    #[serde(default)]
    pub auto_hide_after_action_ms: u64,
    /// Last dragged position, persisted by the UI via the command bridge.
    #[serde(default)]
    pub position: OverlayPosition,
}

/// Screen position of the overlay's top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayPosition {
    #[serde(default = "default_position_coord")]
    pub x: i32,
    #[serde(default = "default_position_coord")]
    pub y: i32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`,
    /// `"trace"`.  Overridden by the `RUST_LOG` environment variable.
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Runtime flags persisted in `state.toml`, written on every toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeState {
    /// Whether the hotkey engine is active.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Whether the overlay was tucked away when last running.
    #[serde(default)]
    pub minimized: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_opacity() -> f64 {
    0.9
}
fn default_theme() -> String {
    "light".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_position_coord() -> i32 {
    100
}

/// The stock binding set: the toggle and exit chords plus the two
/// character keys.
fn default_hotkeys() -> Vec<Binding> {
    let ctrl_alt = ModifierSet::CTRL.with(ModifierSet::ALT);
    vec![
        Binding {
            scan_code: scancode::LEFT_SHIFT,
            mods: ctrl_alt,
            action: Action::ToggleEnabled,
        },
        Binding {
            scan_code: scancode::GRAVE,
            mods: ctrl_alt,
            action: Action::Exit,
        },
        Binding {
            scan_code: scancode::R,
            mods: ModifierSet::EMPTY,
            action: Action::EmitChar { ch: 'r' },
        },
        Binding {
            scan_code: scancode::X,
            mods: ModifierSet::EMPTY,
            action: Action::EmitChar { ch: 'x' },
        },
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            overlay: OverlayConfig::default(),
            hotkeys: default_hotkeys(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled_on_startup: default_true(),
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            always_on_top: default_true(),
            opacity: default_opacity(),
            theme: default_theme(),
            auto_hide_after_action_ms: 0,
            position: OverlayPosition::default(),
        }
    }
}

impl Default for OverlayPosition {
    fn default() -> Self {
        Self {
            x: default_position_coord(),
            y: default_position_coord(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for RuntimeState {
    fn default() -> Self {
        Self {
            enabled: true,
            minimized: false,
        }
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config files.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config
/// base directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to `config.toml`.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Resolves the full path to `state.toml`.
pub fn state_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("state.toml"))
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("OverType"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("overtype"))
    }

    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support/OverType
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("OverType")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Load / save ───────────────────────────────────────────────────────────────

/// Loads [`AppConfig`] from disk, returning `AppConfig::default()` if the
/// file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not
/// found", and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = config_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists `config` to disk, creating the directory if needed.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = config_file_path()?;
    write_toml(&path, toml::to_string_pretty(config)?)
}

/// Loads [`RuntimeState`] from disk; a missing file means the defaults
/// (enabled, not minimized).
pub fn load_state() -> Result<RuntimeState, ConfigError> {
    let path = state_file_path()?;

    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let state: RuntimeState = toml::from_str(&content)?;
            Ok(state)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RuntimeState::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Persists the runtime flags to disk, creating the directory if needed.
pub fn save_state(state: RuntimeState) -> Result<(), ConfigError> {
    let path = state_file_path()?;
    write_toml(&path, toml::to_string_pretty(&state)?)
}

fn write_toml(path: &Path, content: String) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── StateStore adapter ────────────────────────────────────────────────────────

/// [`StateStore`] implementation backed by `state.toml`.
///
/// The dispatcher saves through this seam on every toggle; a failed write
/// is reported as an error and the toggle itself still stands.
pub struct TomlStateStore;

impl TomlStateStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TomlStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore for TomlStateStore {
    fn save(&self, enabled: bool, minimized: bool) -> Result<(), StateStoreError> {
        save_state(RuntimeState { enabled, minimized })
            .map_err(|e| StateStoreError::Persist(e.to_string()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
