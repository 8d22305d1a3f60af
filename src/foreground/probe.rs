use std::sync::Mutex;

use sysinfo::{Pid, ProcessesToUpdate, System};

use super::{ForegroundError, ForegroundProbe};

/// Resolves the foreground window through the native window system and names its process
/// with `sysinfo`.
pub struct SystemProbe {
    system: Mutex<System>,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    fn process_name(&self, pid: u32) -> Result<String, ForegroundError> {
        let pid = Pid::from_u32(pid);
        let mut system = self.system.lock().unwrap_or_else(|p| p.into_inner());
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]));
        system
            .process(pid)
            .map(|process| process.name().to_string_lossy().into_owned())
            .ok_or(ForegroundError::ProcessGone(pid.as_u32()))
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ForegroundProbe for SystemProbe {
    fn foreground_process_name(&self) -> Result<String, ForegroundError> {
        let pid = foreground_pid()?;
        self.process_name(pid)
    }
}

#[cfg(target_os = "windows")]
fn foreground_pid() -> Result<u32, ForegroundError> {
    use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowThreadProcessId};

    unsafe {
        let hwnd = GetForegroundWindow();
        if hwnd.0.is_null() {
            return Err(ForegroundError::NoForegroundWindow);
        }
        let mut pid: u32 = 0;
        GetWindowThreadProcessId(hwnd, Some(&mut pid));
        if pid == 0 {
            return Err(ForegroundError::NoForegroundWindow);
        }
        Ok(pid)
    }
}

#[cfg(target_os = "macos")]
fn foreground_pid() -> Result<u32, ForegroundError> {
    use objc2_app_kit::NSWorkspace;

    #[allow(unused_unsafe)]
    let pid = unsafe {
        let workspace = NSWorkspace::sharedWorkspace();
        let frontmost = workspace
            .frontmostApplication()
            .ok_or(ForegroundError::NoForegroundWindow)?;
        frontmost.processIdentifier()
    };
    u32::try_from(pid).map_err(|_| ForegroundError::NoForegroundWindow)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn foreground_pid() -> Result<u32, ForegroundError> {
    let root = run_xprop(&["-root", "_NET_ACTIVE_WINDOW"])?;
    let window_id = parse_active_window(&root).ok_or(ForegroundError::NoForegroundWindow)?;
    let props = run_xprop(&["-id", &window_id, "_NET_WM_PID"])?;
    parse_wm_pid(&props).ok_or(ForegroundError::NoForegroundWindow)
}

#[cfg(not(any(unix, target_os = "windows")))]
fn foreground_pid() -> Result<u32, ForegroundError> {
    Err(ForegroundError::Unsupported)
}

#[cfg(all(unix, not(target_os = "macos")))]
fn run_xprop(args: &[&str]) -> Result<String, ForegroundError> {
    let output = std::process::Command::new("xprop")
        .args(args)
        .output()
        .map_err(|err| ForegroundError::Query(format!("xprop: {err}")))?;
    if !output.status.success() {
        return Err(ForegroundError::Query(format!(
            "xprop exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extracts the window id from `_NET_ACTIVE_WINDOW(WINDOW): window id # 0x3a00007`.
/// A zero id means nothing has focus.
#[cfg_attr(any(target_os = "macos", not(unix)), allow(dead_code))]
fn parse_active_window(output: &str) -> Option<String> {
    let id = output.split('#').nth(1)?.split(',').next()?.trim();
    let hex = id.strip_prefix("0x")?;
    match u64::from_str_radix(hex, 16) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(id.to_string()),
    }
}

/// Extracts the pid from `_NET_WM_PID(CARDINAL) = 12345`.
#[cfg_attr(any(target_os = "macos", not(unix)), allow(dead_code))]
fn parse_wm_pid(output: &str) -> Option<u32> {
    output.split('=').nth(1)?.trim().parse().ok()
}
