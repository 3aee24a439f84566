//! OverType entry point: global hotkeys to focus-preserving text injection.
//!
//! Wires together the platform services and starts the Tokio runtime.  The
//! keyboard hook runs on its own OS thread; the async main task plays the
//! controller, draining matched actions on a fixed cadence.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config / load_state   -- TOML settings + persisted flags
//!  └─ platform services          -- keyboard hook, injector, window control
//!  └─ MatchHotkeysUseCase        -- moved onto the hook thread
//!  └─ controller loop            -- DispatchActionsUseCase
//!       ├─ every tick (25 ms):   drain queued actions
//!       └─ every 4th tick:       refresh the injection target
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, RwLock};
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use overtype_app::application::dispatch_actions::{DispatchActionsUseCase, DispatchOutcome};
use overtype_app::application::guard_focus::FocusGuard;
use overtype_app::application::match_hotkeys::MatchHotkeysUseCase;
use overtype_app::application::overlay_presence::OverlayPresence;
use overtype_app::infrastructure::keyboard_hook;
use overtype_app::infrastructure::storage::config::{
    load_config, load_state, AppConfig, RuntimeState, TomlStateStore,
};
use overtype_app::infrastructure::text_injection;
use overtype_app::infrastructure::ui_bridge::AppState;
use overtype_app::infrastructure::window_control;
use overtype_core::BindingTable;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The config file names the fallback log level, so it is read before the
    // subscriber exists; a load failure is reported once logging is up.
    let (config, config_err) = match load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    info!("OverType starting");
    if let Some(e) = config_err {
        warn!("config not loaded, using defaults: {e}");
    }

    // Restore the flags from the previous session.
    let state = load_state().unwrap_or_else(|e| {
        warn!("runtime state not loaded, using defaults: {e}");
        RuntimeState::default()
    });

    // ── Shared engine state ───────────────────────────────────────────────────
    let bindings = Arc::new(RwLock::new(BindingTable::new(config.hotkeys.clone())));
    let enabled = Arc::new(AtomicBool::new(state.enabled));
    let own_windows = Arc::new(Mutex::new(HashSet::new()));
    let (action_tx, action_rx) = mpsc::channel();

    // ── Platform services ─────────────────────────────────────────────────────
    let source = keyboard_hook::platform_source().context("global keyboard capture unavailable")?;
    let injector = text_injection::platform_injector().context("text injection unavailable")?;
    let control = window_control::platform_control().context("window control unavailable")?;

    let presence = Arc::new(OverlayPresence::new(
        Arc::clone(&control),
        config.overlay.always_on_top,
    ));
    let guard = FocusGuard::new(Arc::clone(&control), Arc::clone(&own_windows));

    // ── Keyboard hook ─────────────────────────────────────────────────────────
    let matcher = MatchHotkeysUseCase::new(
        Arc::clone(&bindings),
        Arc::clone(&enabled),
        action_tx.clone(),
    );
    source
        .start(matcher.into_handler())
        .context("failed to install the keyboard hook")?;
    info!(bindings = config.hotkeys.len(), "keyboard hook installed");

    // ── Controller ────────────────────────────────────────────────────────────
    let mut dispatcher = DispatchActionsUseCase::new(
        action_rx,
        Arc::clone(&enabled),
        guard,
        Arc::clone(&presence),
        injector,
        Arc::new(TomlStateStore::new()),
    );

    // Bridge state for an embedding overlay shell.  In a full desktop build
    // the shell registers its commands against this and calls
    // `attach_overlay_window` once its widget exists; the headless variant
    // keeps the handle alive so those commands stay wireable.
    let _app_state = AppState::new(
        config.clone(),
        Arc::clone(&bindings),
        Arc::clone(&enabled),
        action_tx.clone(),
        Arc::clone(&presence),
        Arc::clone(&own_windows),
    );

    // Bring the overlay phase back to where the last session left it.
    if state.enabled && config.general.enabled_on_startup {
        if state.minimized {
            presence.minimize();
        } else {
            presence.show();
        }
    }

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    info!("OverType ready.  Press Ctrl-C to exit.");

    // Controller loop: drain queued actions every 25 ms, and let the focus
    // guardian re-sample the foreground window every fourth tick (100 ms).
    let mut tick: u32 = 0;
    loop {
        tokio::time::sleep(Duration::from_millis(25)).await;
        if !running.load(Ordering::Relaxed) {
            break;
        }
        if tick % 4 == 0 {
            dispatcher.poll_foreground();
        }
        tick = tick.wrapping_add(1);
        if dispatcher.drain() == DispatchOutcome::Exit {
            break;
        }
    }

    // Uninstall the hook and join its thread; anything still queued is
    // discarded with the receiver.
    source.stop();
    info!("OverType stopped");
    Ok(())
}
