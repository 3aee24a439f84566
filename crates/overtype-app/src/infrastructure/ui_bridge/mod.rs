//! UI command bridge: exposes application-layer operations to the overlay
//! shell.
//!
//! The overlay window itself belongs to whatever desktop shell embeds this
//! crate (a webview widget in the full product); this module is the only
//! surface that shell talks to.  All shell-callable commands live here and
//! delegate to the shared [`AppState`].  The Presentation layer is the only
//! consumer of this module; it must NOT be imported by the Application or
//! Domain layers.
//!
//! # Shared handles, not copies
//!
//! Unlike a typical request/response backend, most of [`AppState`] is a set
//! of handles into the live engine: the same `Arc<RwLock<BindingTable>>`
//! the hook thread reads, the same `AtomicBool` the matcher gates on, the
//! same action queue the dispatcher drains.  A command that flips `enabled`
//! is therefore observed by the matcher on the very next key event, with no
//! propagation step in between.
//!
//! # `CommandResult<T>` wrapper
//!
//! All commands return `CommandResult<T>` rather than `Result<T, E>` so
//! every response has the same shape:
//! `{ success: bool, data: T | null, error: string | null }`.
//! The frontend can always safely access `result.success` without a
//! try/catch around the call.  Commands never panic; lock failures and
//! I/O problems come back through the same envelope.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex as SyncMutex, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::application::guard_focus::WindowId;
use crate::application::overlay_presence::OverlayPresence;
use crate::infrastructure::storage::config::{load_config, save_config, AppConfig, OverlayPosition};
use overtype_core::{Action, Binding, BindingTable, ModifierSet};

// ── Shared application state ──────────────────────────────────────────────────

/// Application state shared between UI commands.
///
/// Constructed by `main` from the same handles it wires into the hook and
/// controller sides, then wrapped in `Arc<>` and handed to the shell's
/// state management.  The configuration itself sits behind an async
/// `tokio::sync::Mutex` because commands run in an async context; the
/// remaining fields are the sync primitives the engine threads already
/// share, used here only for short lock-free or briefly-locked accesses.
pub struct AppState {
    /// Current configuration; refreshed by [`reload_config`].
    pub config: Mutex<AppConfig>,
    /// Live binding table, shared with the hook thread.
    pub bindings: Arc<RwLock<BindingTable>>,
    /// Global enabled flag, shared with the matcher and the dispatcher.
    pub enabled: Arc<AtomicBool>,
    /// Producer side of the action queue the hook also feeds.
    pub actions: mpsc::Sender<Action>,
    /// Overlay phase machine, shared with the dispatcher.
    pub presence: Arc<OverlayPresence>,
    /// Windows owned by this process, excluded from focus tracking.
    /// Shared with the focus guardian.
    pub own_windows: Arc<SyncMutex<HashSet<WindowId>>>,
}

impl AppState {
    /// Builds the bridge state around the engine's shared handles.
    pub fn new(
        config: AppConfig,
        bindings: Arc<RwLock<BindingTable>>,
        enabled: Arc<AtomicBool>,
        actions: mpsc::Sender<Action>,
        presence: Arc<OverlayPresence>,
        own_windows: Arc<SyncMutex<HashSet<WindowId>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: Mutex::new(config),
            bindings,
            enabled,
            actions,
            presence,
            own_windows,
        })
    }
}

// ── Data Transfer Objects (Presentation layer) ────────────────────────────────

/// DTO describing the engine's current state for the overlay indicator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDto {
    pub enabled: bool,
    pub overlay_phase: String,
    pub binding_count: usize,
}

/// DTO for one hotkey binding returned to the UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingDto {
    pub scancode: u16,
    pub mods: Vec<String>,
    pub action: String,
    /// The literal character, present only for `emit_char` bindings.
    pub ch: Option<char>,
}

impl From<&Binding> for BindingDto {
    fn from(b: &Binding) -> Self {
        let (action, ch) = match b.action {
            Action::EmitChar { ch } => ("emit_char".to_string(), Some(ch)),
            Action::ToggleEnabled => ("toggle_enabled".to_string(), None),
            Action::ToggleMinimized => ("toggle_minimized".to_string(), None),
            Action::Exit => ("exit".to_string(), None),
        };
        Self {
            scancode: b.scan_code,
            mods: b.mods.into(),
            action,
            ch,
        }
    }
}

/// DTO for the user-facing configuration shown in the settings pane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDto {
    pub enabled_on_startup: bool,
    pub always_on_top: bool,
    pub opacity: f64,
    pub theme: String,
    pub auto_hide_after_action_ms: u64,
    pub position_x: i32,
    pub position_y: i32,
    pub log_level: String,
}

impl From<&AppConfig> for ConfigDto {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            enabled_on_startup: cfg.general.enabled_on_startup,
            always_on_top: cfg.overlay.always_on_top,
            opacity: cfg.overlay.opacity,
            theme: cfg.overlay.theme.clone(),
            auto_hide_after_action_ms: cfg.overlay.auto_hide_after_action_ms,
            position_x: cfg.overlay.position.x,
            position_y: cfg.overlay.position.y,
            log_level: cfg.logging.level.clone(),
        }
    }
}

/// Unified response wrapper used by UI commands.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── UI commands ───────────────────────────────────────────────────────────────

/// Returns the engine's current status for the overlay indicator.
pub async fn get_status(state: Arc<AppState>) -> CommandResult<StatusDto> {
    let binding_count = match state.bindings.read() {
        Ok(table) => table.len(),
        Err(_) => return CommandResult::err("binding table lock poisoned"),
    };
    CommandResult::ok(StatusDto {
        enabled: state.enabled.load(Ordering::Relaxed),
        overlay_phase: state.presence.phase().to_string(),
        binding_count,
    })
}

/// Returns the user-facing configuration for the settings pane.
pub async fn get_config(state: Arc<AppState>) -> CommandResult<ConfigDto> {
    let cfg = state.config.lock().await;
    CommandResult::ok(ConfigDto::from(&*cfg))
}

/// Re-reads `config.toml` and swaps the fresh binding table in.
///
/// The hook reads the table with `try_read`, so keystrokes arriving while
/// the write lock is held simply pass through against the old table; a
/// reload can never wedge typing.  Returns the number of bindings now
/// active.
pub async fn reload_config(state: Arc<AppState>) -> CommandResult<usize> {
    let fresh = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => return CommandResult::err(format!("failed to reload config: {e}")),
    };

    let table = BindingTable::new(fresh.hotkeys.clone());
    let count = table.len();
    match state.bindings.write() {
        Ok(mut guard) => *guard = table,
        Err(_) => return CommandResult::err("binding table lock poisoned"),
    }
    state.presence.set_topmost(fresh.overlay.always_on_top);
    *state.config.lock().await = fresh;

    info!(bindings = count, "configuration reloaded");
    CommandResult::ok(count)
}

/// Looks up the binding for a key/modifier combination, if any.
///
/// Lets the UI answer "what does this chord do?" without duplicating the
/// exact-match rule.  `mods` uses the same lowercase names as the config
/// file (`ctrl`, `alt`, `shift`, `win`).
pub async fn query_binding(
    state: Arc<AppState>,
    scancode: u16,
    mods: Vec<String>,
) -> CommandResult<Option<BindingDto>> {
    let mods = match ModifierSet::try_from(mods) {
        Ok(set) => set,
        Err(e) => return CommandResult::err(e.to_string()),
    };
    let table = match state.bindings.read() {
        Ok(guard) => guard,
        Err(_) => return CommandResult::err("binding table lock poisoned"),
    };
    CommandResult::ok(table.lookup(scancode, mods).map(BindingDto::from))
}

/// Queues an action as if a hotkey had fired.
///
/// The overlay's buttons (toggle, minimize, quit) go through the same
/// queue as the keyboard, so UI- and hotkey-triggered actions apply in one
/// strict order and can never interleave mid-operation.
pub async fn request_action(state: Arc<AppState>, action: Action) -> CommandResult<()> {
    match state.actions.send(action) {
        Ok(()) => CommandResult::ok(()),
        Err(_) => CommandResult::err("action queue is closed"),
    }
}

/// Registers a freshly created overlay window with the engine.
///
/// The window is recorded as our own, so the focus guardian never treats
/// it as an injection target, and handed to the presence machine, which
/// applies the no-activate style and brings it in line with the current
/// phase.
pub async fn attach_overlay_window(state: Arc<AppState>, raw_handle: isize) -> CommandResult<()> {
    let id = WindowId(raw_handle);
    match state.own_windows.lock() {
        Ok(mut own) => {
            own.insert(id);
        }
        Err(_) => return CommandResult::err("window registry lock poisoned"),
    }
    state.presence.attach_window(id);
    info!(handle = raw_handle, "overlay window attached");
    CommandResult::ok(())
}

/// Persists the overlay position after the user drags it, so the panel
/// reappears where it was left.
pub async fn set_overlay_position(state: Arc<AppState>, x: i32, y: i32) -> CommandResult<()> {
    let mut cfg = state.config.lock().await;
    cfg.overlay.position = OverlayPosition { x, y };
    if let Err(e) = save_config(&cfg) {
        return CommandResult::err(format!("failed to save config: {e}"));
    }
    CommandResult::ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
