//! Opening a pinned folder in other programs: VS Code, a terminal, or a URL
//! in the default browser.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tauri::{AppHandle, Runtime};
use tauri_plugin_opener::OpenerExt;

use crate::launcher::ActionOutcome;

/// A program invocation, built separately from running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
}

impl LaunchCommand {
    fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }
        command
    }
}

// ============================================
// VS Code
// ============================================

/// `code` launchers to try, in order. Install locations come from the
/// Windows environment variables and are skipped when a variable is unset.
pub fn vscode_candidates(env: impl Fn(&str) -> Option<OsString>) -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from("code"), PathBuf::from("code.cmd")];
    let installs = [
        ("LOCALAPPDATA", &["Programs", "Microsoft VS Code", "bin", "code.cmd"][..]),
        ("PROGRAMFILES", &["Microsoft VS Code", "bin", "code.cmd"][..]),
        ("PROGRAMFILES(X86)", &["Microsoft VS Code", "bin", "code.cmd"][..]),
    ];
    for (var, parts) in installs {
        if let Some(root) = env(var).filter(|root| !root.is_empty()) {
            let mut path = PathBuf::from(root);
            path.extend(parts);
            candidates.push(path);
        }
    }
    candidates
}

/// Opens `folder` with the first working VS Code launcher, or in the file
/// manager when none is installed.
pub fn open_in_vscode<R: Runtime>(app: &AppHandle<R>, folder: &str) -> ActionOutcome {
    let folder = match existing_folder(folder) {
        Ok(folder) => folder,
        Err(outcome) => return outcome,
    };

    for candidate in vscode_candidates(|var| std::env::var_os(var)) {
        let mut version_check = LaunchCommand::new(&candidate).arg("-v").to_command();
        hide_console(&mut version_check);
        match version_check.output() {
            Ok(output) if output.status.success() => {}
            _ => continue,
        }

        let mut launch = LaunchCommand::new(&candidate)
            .arg(folder.as_os_str())
            .to_command();
        hide_console(&mut launch);
        match launch.spawn() {
            Ok(_) => {
                log::info!("opened {} with {}", folder.display(), candidate.display());
                return ActionOutcome::ok("Opened in VS Code");
            }
            Err(e) => log::warn!("failed to start {}: {e}", candidate.display()),
        }
    }

    log::info!("VS Code not found, opening {} in the file manager", folder.display());
    match app
        .opener()
        .open_path(folder.to_string_lossy(), None::<&str>)
    {
        Ok(()) => ActionOutcome::ok("VS Code not found, opened the folder instead"),
        Err(e) => ActionOutcome::failed(format!("VS Code not found and the folder could not be opened: {e}")),
    }
}

// ============================================
// Terminal
// ============================================

/// Terminal invocation that starts in `folder` on the given OS
/// (`std::env::consts::OS` values).
pub fn terminal_command(os: &str, folder: &Path) -> LaunchCommand {
    match os {
        "windows" => {
            let literal = folder.to_string_lossy().replace('\'', "''");
            LaunchCommand::new("powershell.exe")
                .arg("-NoExit")
                .arg("-Command")
                .arg(format!("Set-Location -LiteralPath '{literal}'"))
        }
        "macos" => LaunchCommand::new("open")
            .arg("-a")
            .arg("Terminal")
            .arg(folder.as_os_str()),
        _ => LaunchCommand {
            current_dir: Some(folder.to_path_buf()),
            ..LaunchCommand::new("x-terminal-emulator")
        },
    }
}

pub fn open_in_terminal(folder: &str) -> ActionOutcome {
    let folder = match existing_folder(folder) {
        Ok(folder) => folder,
        Err(outcome) => return outcome,
    };

    let command = terminal_command(std::env::consts::OS, &folder);
    match command.to_command().spawn() {
        Ok(_) => ActionOutcome::ok("Opened in terminal"),
        Err(e) => {
            log::warn!("failed to start {}: {e}", command.program.display());
            ActionOutcome::failed(format!("Failed to open terminal: {e}"))
        }
    }
}

// ============================================
// External links
// ============================================

pub fn is_external_url(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    ["https://", "http://", "mailto:"]
        .iter()
        .any(|scheme| url.starts_with(scheme) && url.len() > scheme.len())
}

pub fn open_external<R: Runtime>(app: &AppHandle<R>, url: &str) -> ActionOutcome {
    if !is_external_url(url) {
        return ActionOutcome::failed(format!("Not a web link: {url}"));
    }
    match app.opener().open_url(url.trim(), None::<&str>) {
        Ok(()) => ActionOutcome::ok("Link opened"),
        Err(e) => {
            log::warn!("failed to open {url}: {e}");
            ActionOutcome::failed(format!("Failed to open link: {e}"))
        }
    }
}

fn existing_folder(folder: &str) -> Result<PathBuf, ActionOutcome> {
    let path = PathBuf::from(folder.trim());
    if path.is_dir() {
        Ok(path)
    } else {
        Err(ActionOutcome::failed(format!("Folder not found: {folder}")))
    }
}

#[cfg(windows)]
fn hide_console(command: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    command.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_command: &mut Command) {}
