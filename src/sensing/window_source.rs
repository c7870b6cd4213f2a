use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("active window query unavailable: {0}")]
    Unavailable(String),
}

/// Reports the name of the foreground window or application.
///
/// Implementations may be slow; callers bound each query with a timeout and
/// drop the future when it expires, so anything a query spawns must die with
/// it.
#[async_trait]
pub trait WindowSource: Send + Sync {
    async fn active_window(&self) -> Result<Option<String>, ObserverError>;

    /// Title of the front document or tab inside `app`, where the platform
    /// only names the application.
    async fn document_name(&self, _app: &str) -> Option<String> {
        None
    }
}

/// Asks the OS through its stock command line tools: `osascript` on macOS,
/// `xdotool` on X11 Linux, PowerShell on Windows.
#[derive(Debug, Default, Clone)]
pub struct CommandWindowSource;

#[cfg(target_os = "macos")]
fn platform_query() -> Option<(&'static str, Vec<&'static str>)> {
    Some((
        "osascript",
        vec![
            "-e",
            "tell application \"System Events\" to get name of first application process whose frontmost is true",
        ],
    ))
}

#[cfg(target_os = "linux")]
fn platform_query() -> Option<(&'static str, Vec<&'static str>)> {
    Some(("xdotool", vec!["getactivewindow", "getwindowname"]))
}

#[cfg(target_os = "windows")]
fn platform_query() -> Option<(&'static str, Vec<&'static str>)> {
    Some((
        "powershell",
        vec![
            "-NoProfile",
            "-Command",
            "Add-Type '[DllImport(\"user32.dll\")] public static extern System.IntPtr GetForegroundWindow(); [DllImport(\"user32.dll\")] public static extern int GetWindowText(System.IntPtr h, System.Text.StringBuilder s, int n);' -Name W -Namespace U; $b = New-Object System.Text.StringBuilder 512; [void][U.W]::GetWindowText([U.W]::GetForegroundWindow(), $b, 512); $b.ToString()",
        ],
    ))
}

#[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
fn platform_query() -> Option<(&'static str, Vec<&'static str>)> {
    None
}

/// AppleScript that names the front tab or document of a known app. X11 and
/// Win32 window titles already carry it.
fn document_script(app: &str) -> Option<&'static str> {
    const SCRIPTS: &[(&str, &str)] = &[
        ("Safari", "tell application \"Safari\" to get name of front document"),
        ("Chrome", "tell application \"Google Chrome\" to get title of active tab of front window"),
        ("Edge", "tell application \"Microsoft Edge\" to get title of active tab of front window"),
        ("Word", "tell application \"Microsoft Word\" to get name of active document"),
        ("Excel", "tell application \"Microsoft Excel\" to get name of active workbook"),
    ];
    SCRIPTS
        .iter()
        .find(|(marker, _)| app.contains(marker))
        .map(|(_, script)| *script)
}

#[async_trait]
impl WindowSource for CommandWindowSource {
    async fn active_window(&self) -> Result<Option<String>, ObserverError> {
        let (program, args) = platform_query()
            .ok_or_else(|| ObserverError::Unavailable("unsupported platform".into()))?;
        run_query(program, &args).await
    }

    async fn document_name(&self, app: &str) -> Option<String> {
        if !cfg!(target_os = "macos") {
            return None;
        }
        let script = document_script(app)?;
        run_query("osascript", &["-e", script]).await.ok().flatten()
    }
}

/// Runs one query. The child is killed if this future is dropped before it
/// exits.
async fn run_query(program: &str, args: &[&str]) -> Result<Option<String>, ObserverError> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|err| ObserverError::Unavailable(format!("{program}: {err}")))?;

    if !output.status.success() {
        return Err(ObserverError::Unavailable(format!(
            "{program} exited with {}",
            output.status
        )));
    }

    Ok(parse_window_output(&output.stdout))
}

fn parse_window_output(stdout: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(stdout);
    let name = text.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// `Google Chrome` plus `YouTube - Cats` becomes `Google Chrome (YouTube - Cats)`.
pub fn full_window_name(app: String, document: Option<String>) -> String {
    match document.map(|doc| doc.trim().to_string()) {
        Some(doc) if !doc.is_empty() && !doc.eq_ignore_ascii_case(&app) => {
            format!("{app} ({doc})")
        }
        _ => app,
    }
}
