//! Windows text injection via the SendInput API.
//!
//! Each UTF-16 code unit becomes a down/up pair of `KEYEVENTF_UNICODE`
//! events with `wVk = 0`; the whole text goes out in one `SendInput` call
//! so other injected input cannot interleave with it.

#![cfg(target_os = "windows")]

use windows::Win32::Foundation::GetLastError;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYEVENTF_KEYUP, KEYEVENTF_UNICODE,
    VIRTUAL_KEY,
};

use overtype_core::{utf16_pulses, KeyTransition};

use crate::application::dispatch_actions::{InjectionError, TextInjector};

/// Windows implementation of [`TextInjector`] using SendInput.
pub struct WindowsTextInjector;

impl WindowsTextInjector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsTextInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl TextInjector for WindowsTextInjector {
    fn inject_text(&self, text: &str) -> Result<(), InjectionError> {
        let inputs: Vec<INPUT> = utf16_pulses(text)
            .into_iter()
            .map(|pulse| {
                let mut flags = KEYEVENTF_UNICODE;
                if pulse.transition == KeyTransition::Up {
                    flags |= KEYEVENTF_KEYUP;
                }
                INPUT {
                    r#type: INPUT_KEYBOARD,
                    Anonymous: INPUT_0 {
                        ki: KEYBDINPUT {
                            // wVk must be 0 for KEYEVENTF_UNICODE events.
                            wVk: VIRTUAL_KEY(0),
                            wScan: pulse.code_unit,
                            dwFlags: flags,
                            time: 0,
                            dwExtraInfo: 0,
                        },
                    },
                }
            })
            .collect();

        if inputs.is_empty() {
            return Ok(());
        }

        // SAFETY: inputs is a valid slice of INPUT structures; SendInput
        // reads it without retaining any pointer past the call.
        let sent = unsafe { SendInput(&inputs, std::mem::size_of::<INPUT>() as i32) };

        if sent as usize != inputs.len() {
            // SAFETY: Reads the calling thread's last-error slot set by
            // the failed SendInput call.
            let code = unsafe { GetLastError() }.0;
            return Err(InjectionError::Rejected {
                sent,
                expected: inputs.len() as u32,
                code,
            });
        }
        Ok(())
    }
}
