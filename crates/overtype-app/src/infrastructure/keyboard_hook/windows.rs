//! Windows low-level keyboard hook implementation.
//!
//! Installs a WH_KEYBOARD_LL hook on a dedicated Win32 message-loop
//! thread.  The hook callback runs the installed [`KeyEventHandler`]
//! inline and translates its verdict into either `LRESULT(1)` (swallow)
//! or `CallNextHookEx` (pass through).
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PostThreadMessageW, SetWindowsHookExW,
    UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, KBDLLHOOKSTRUCT_FLAGS,
    LLKHF_INJECTED, LLKHF_LOWER_IL_INJECTED, MSG, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP,
    WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use overtype_core::{KeyEvent, KeyTransition, Verdict};

use super::{HookError, KeyEventHandler, KeyEventSource, ModifierTracker};

/// How long `start()` waits for the pump thread to confirm the hook.
const START_TIMEOUT: Duration = Duration::from_secs(2);

/// State shared with the hook callback: the handler to run and the
/// physical-modifier tracker.  Installed by [`WindowsKeyEventSource::start`]
/// and accessed from the callback with `try_lock` only.
struct HookShared {
    handler: KeyEventHandler,
    modifiers: ModifierTracker,
}

static HOOK_STATE: Mutex<Option<HookShared>> = Mutex::new(None);

/// Windows low-level keyboard hook service.
///
/// Installs `WH_KEYBOARD_LL` and runs a dedicated Win32 message loop
/// thread; `start()` blocks until the hook is confirmed live.
pub struct WindowsKeyEventSource {
    /// Thread id of the running pump thread, 0 when not running.
    pump_thread_id: AtomicU32,
    join_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl WindowsKeyEventSource {
    /// Creates a new (unstarted) hook service.
    pub fn new() -> Self {
        Self {
            pump_thread_id: AtomicU32::new(0),
            join_handle: Mutex::new(None),
        }
    }
}

impl Default for WindowsKeyEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyEventSource for WindowsKeyEventSource {
    fn start(&self, handler: KeyEventHandler) -> Result<(), HookError> {
        {
            let mut state = HOOK_STATE.lock().expect("lock poisoned");
            if state.is_some() {
                return Err(HookError::AlreadyRunning);
            }
            *state = Some(HookShared {
                handler,
                modifiers: ModifierTracker::new(),
            });
        }

        // The pump thread reports back its thread id (for WM_QUIT later)
        // or the installation error.
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, HookError>>();

        let spawned = thread::Builder::new()
            .name("overtype-hook-loop".to_string())
            .spawn(move || run_hook_message_loop(ready_tx));
        let join = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                HOOK_STATE.lock().expect("lock poisoned").take();
                return Err(HookError::InstallFailed(e.to_string()));
            }
        };

        match ready_rx.recv_timeout(START_TIMEOUT) {
            Ok(Ok(thread_id)) => {
                self.pump_thread_id.store(thread_id, Ordering::SeqCst);
                *self.join_handle.lock().expect("lock poisoned") = Some(join);
                info!("low-level keyboard hook installed");
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = join.join();
                HOOK_STATE.lock().expect("lock poisoned").take();
                Err(e)
            }
            Err(_) => {
                // The thread never confirmed; it will tear the hook down
                // itself when its ready-send fails.
                HOOK_STATE.lock().expect("lock poisoned").take();
                Err(HookError::StartTimeout(START_TIMEOUT))
            }
        }
    }

    fn stop(&self) {
        let thread_id = self.pump_thread_id.swap(0, Ordering::SeqCst);
        if thread_id == 0 {
            return;
        }

        // SAFETY: Posting WM_QUIT makes the pump thread's GetMessageW
        // return FALSE, after which it unhooks and exits.
        if let Err(e) = unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            warn!("could not signal hook thread to quit: {e}");
        }

        if let Some(handle) = self.join_handle.lock().expect("lock poisoned").take() {
            if handle.join().is_err() {
                warn!("hook thread panicked during shutdown");
            }
        }

        HOOK_STATE.lock().expect("lock poisoned").take();
        info!("low-level keyboard hook removed");
    }
}

/// Entry point for the dedicated Win32 message loop thread.
fn run_hook_message_loop(ready_tx: Sender<Result<u32, HookError>>) {
    // SAFETY: SetWindowsHookExW requires the calling thread to run a
    // message loop; we enter one immediately after installation.
    let hook: HHOOK = match unsafe {
        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0)
    } {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready_tx.send(Err(HookError::InstallFailed(e.to_string())));
            return;
        }
    };

    // SAFETY: Plain thread-id query with no preconditions.
    let thread_id = unsafe { GetCurrentThreadId() };
    if ready_tx.send(Ok(thread_id)).is_err() {
        // start() already gave up waiting; undo the installation.
        // SAFETY: `hook` is the live handle installed above.
        unsafe {
            UnhookWindowsHookEx(hook).ok();
        }
        return;
    }

    // Win32 message loop – blocks until WM_QUIT is posted
    let mut msg = MSG::default();
    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&msg);
        }
        UnhookWindowsHookEx(hook).ok();
    }
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// This function is called by Windows from the hook message loop thread.
/// It must return quickly (< ~300ms) to avoid hook removal by the OS, so
/// it never blocks: if the shared state is contended the keystroke simply
/// passes through.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code != HC_ACTION as i32 {
        // SAFETY: Must call CallNextHookEx when n_code < 0.
        return CallNextHookEx(None, n_code, w_param, l_param);
    }

    let transition = match w_param.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => KeyTransition::Down,
        WM_KEYUP | WM_SYSKEYUP => KeyTransition::Up,
        _ => {
            return CallNextHookEx(None, n_code, w_param, l_param);
        }
    };

    // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
    let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);

    let injected = (kbs.flags & (LLKHF_INJECTED | LLKHF_LOWER_IL_INJECTED))
        != KBDLLHOOKSTRUCT_FLAGS(0);

    let Ok(mut guard) = HOOK_STATE.try_lock() else {
        return CallNextHookEx(None, n_code, w_param, l_param);
    };
    let Some(shared) = guard.as_mut() else {
        return CallNextHookEx(None, n_code, w_param, l_param);
    };

    // Injected events (our own included) must not disturb the physical
    // modifier picture.
    if !injected {
        shared
            .modifiers
            .update(kbs.vkCode as u8, transition == KeyTransition::Down);
    }

    let event = KeyEvent {
        scan_code: kbs.scanCode as u16,
        transition,
        modifiers: shared.modifiers.snapshot(),
        injected,
    };

    if (shared.handler)(event) == Verdict::Swallow {
        return LRESULT(1);
    }

    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}
