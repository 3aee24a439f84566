//! Windows window control: focus restoration and the no-activate overlay
//! treatment.
//!
//! Focus restoration follows the escalation Windows expects: a plain
//! `SetForegroundWindow`, then — if the foreground-lock rules refused it —
//! a retry with `AttachThreadInput` joining the input queues involved.
//! Every path re-reads the actual foreground window afterwards; we only
//! report success the OS has verifiably granted.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::collections::BTreeMap;
use std::sync::Mutex;

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{AttachThreadInput, SetActiveWindow};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, CallWindowProcW, DefWindowProcW, GetForegroundWindow, GetWindowLongPtrW,
    GetWindowThreadProcessId, IsIconic, IsWindow, IsWindowVisible, SetForegroundWindow,
    SetWindowLongPtrW, SetWindowPos, ShowWindow, GWLP_WNDPROC, GWL_EXSTYLE, HWND_NOTOPMOST,
    HWND_TOPMOST, MA_NOACTIVATE, SWP_FRAMECHANGED, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
    SWP_NOZORDER, SWP_SHOWWINDOW, SW_HIDE, SW_SHOWNOACTIVATE, WM_MOUSEACTIVATE, WNDPROC,
    WS_EX_NOACTIVATE,
};

use crate::application::guard_focus::{WindowControl, WindowId};

/// Original window procedures of subclassed windows, keyed by HWND value.
/// `no_activate_wndproc` forwards every message it does not answer itself.
static ORIGINAL_WNDPROCS: Mutex<BTreeMap<isize, isize>> = Mutex::new(BTreeMap::new());

fn to_hwnd(id: WindowId) -> HWND {
    HWND(id.0 as *mut core::ffi::c_void)
}

fn from_hwnd(hwnd: HWND) -> WindowId {
    WindowId(hwnd.0 as isize)
}

/// Windows implementation of [`WindowControl`].
pub struct WindowsWindowControl;

impl WindowsWindowControl {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsWindowControl {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowControl for WindowsWindowControl {
    fn foreground_window(&self) -> Option<WindowId> {
        // SAFETY: Plain query with no preconditions; a null handle means
        // no window is foreground (e.g. during desktop transitions).
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0.is_null() {
            None
        } else {
            Some(from_hwnd(hwnd))
        }
    }

    fn is_window_alive(&self, id: WindowId) -> bool {
        // SAFETY: IsWindow validates the handle itself.
        unsafe { IsWindow(Some(to_hwnd(id))).as_bool() }
    }

    fn is_window_visible(&self, id: WindowId) -> bool {
        // SAFETY: Plain query; invalid handles yield FALSE.
        unsafe { IsWindowVisible(to_hwnd(id)).as_bool() }
    }

    fn is_window_minimized(&self, id: WindowId) -> bool {
        // SAFETY: Plain query; invalid handles yield FALSE.
        unsafe { IsIconic(to_hwnd(id)).as_bool() }
    }

    fn focus_window(&self, id: WindowId) -> bool {
        let hwnd = to_hwnd(id);
        // SAFETY: Win32 focus calls on a handle that is validated first.
        // AttachThreadInput attachments are always detached again below.
        unsafe {
            if !IsWindow(Some(hwnd)).as_bool() {
                return false;
            }
            if GetForegroundWindow() == hwnd {
                return true;
            }
            if SetForegroundWindow(hwnd).as_bool() && GetForegroundWindow() == hwnd {
                return true;
            }

            // Windows refused the plain request (foreground-lock rules).
            // Join the input queues involved and try once more.
            let this_tid = GetCurrentThreadId();
            let foreground = GetForegroundWindow();
            let foreground_tid = if foreground.0.is_null() {
                0
            } else {
                GetWindowThreadProcessId(foreground, None)
            };
            let target_tid = GetWindowThreadProcessId(hwnd, None);

            let mut attached: Vec<u32> = Vec::new();
            for tid in [foreground_tid, target_tid] {
                if tid != 0
                    && tid != this_tid
                    && !attached.contains(&tid)
                    && AttachThreadInput(this_tid, tid, true.into()).as_bool()
                {
                    attached.push(tid);
                }
            }

            if SetForegroundWindow(hwnd).as_bool() {
                let _ = BringWindowToTop(hwnd);
                let _ = SetActiveWindow(hwnd);
            }

            for tid in attached {
                let _ = AttachThreadInput(this_tid, tid, false.into());
            }

            GetForegroundWindow() == hwnd
        }
    }

    fn apply_no_activate(&self, id: WindowId) -> bool {
        let hwnd = to_hwnd(id);
        // SAFETY: Style read/update on a handle validated first.  The
        // SetWindowPos call only republishes the frame style.
        unsafe {
            if !IsWindow(Some(hwnd)).as_bool() {
                return false;
            }

            let ex_style = GetWindowLongPtrW(hwnd, GWL_EXSTYLE);
            if ex_style & WS_EX_NOACTIVATE.0 as isize == 0 {
                SetWindowLongPtrW(hwnd, GWL_EXSTYLE, ex_style | WS_EX_NOACTIVATE.0 as isize);
                let _ = SetWindowPos(
                    hwnd,
                    None,
                    0,
                    0,
                    0,
                    0,
                    SWP_FRAMECHANGED | SWP_NOACTIVATE | SWP_NOMOVE | SWP_NOSIZE | SWP_NOZORDER,
                );
            }
        }

        // Subclass once per window so WM_MOUSEACTIVATE can be answered
        // with MA_NOACTIVATE: clicking the overlay then never activates
        // it and SendInput keeps landing in the target application.
        let key = id.0;
        if ORIGINAL_WNDPROCS
            .lock()
            .expect("lock poisoned")
            .contains_key(&key)
        {
            return true;
        }

        // SAFETY: The previous procedure is recorded before the swap so
        // no_activate_wndproc can forward every other message to it.  No
        // lock is held across the Win32 calls.
        unsafe {
            let original = GetWindowLongPtrW(hwnd, GWLP_WNDPROC);
            if original == 0 {
                return false;
            }
            ORIGINAL_WNDPROCS
                .lock()
                .expect("lock poisoned")
                .insert(key, original);
            SetWindowLongPtrW(hwnd, GWLP_WNDPROC, no_activate_wndproc as usize as isize);
        }
        true
    }

    fn show_no_activate(&self, id: WindowId, topmost: bool) -> bool {
        let hwnd = to_hwnd(id);
        // SAFETY: Show plus z-order update on a handle validated first;
        // SWP_NOACTIVATE keeps focus where it is.
        unsafe {
            if !IsWindow(Some(hwnd)).as_bool() {
                return false;
            }
            let _ = ShowWindow(hwnd, SW_SHOWNOACTIVATE);
            let insert_after = if topmost { HWND_TOPMOST } else { HWND_NOTOPMOST };
            SetWindowPos(
                hwnd,
                Some(insert_after),
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE | SWP_NOACTIVATE | SWP_SHOWWINDOW,
            )
            .is_ok()
        }
    }

    fn hide_window(&self, id: WindowId) -> bool {
        let hwnd = to_hwnd(id);
        // SAFETY: Plain ShowWindow call on a handle validated first.
        unsafe {
            if !IsWindow(Some(hwnd)).as_bool() {
                return false;
            }
            let _ = ShowWindow(hwnd, SW_HIDE);
        }
        true
    }
}

/// Replacement window procedure for subclassed overlay windows.
///
/// # Safety
///
/// Called by Windows on the window's own thread.  Must not panic; the
/// stored-procedure lookup copies the pointer out before forwarding so no
/// lock is held while the original procedure runs.
unsafe extern "system" fn no_activate_wndproc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg == WM_MOUSEACTIVATE {
        return LRESULT(MA_NOACTIVATE as isize);
    }

    let original = ORIGINAL_WNDPROCS
        .lock()
        .ok()
        .and_then(|map| map.get(&(hwnd.0 as isize)).copied());

    match original {
        // SAFETY: The stored value is the window's previous WNDPROC;
        // transmuting it back reconstructs the callable Windows gave us.
        Some(proc) => CallWindowProcW(
            std::mem::transmute::<isize, WNDPROC>(proc),
            hwnd,
            msg,
            wparam,
            lparam,
        ),
        None => DefWindowProcW(hwnd, msg, wparam, lparam),
    }
}
