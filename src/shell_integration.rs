//! Explorer context-menu entry ("Add to Folder Launcher") for directories.
//!
//! Written under HKCU so no administrator rights are needed. The entry runs
//! `"<exe>" "%1"`; the folder argument is picked up at startup or forwarded
//! by the single-instance plugin.

use std::path::Path;

use crate::error::{LauncherError, LauncherResult};
use crate::launcher::ActionOutcome;

pub const CONTEXT_MENU_KEY: &str = r"HKCU\Software\Classes\Directory\shell\FolderLauncher";
pub const CONTEXT_MENU_LABEL: &str = "Add to Folder Launcher";

const UNSUPPORTED: &str = "Context menu integration is only supported on Windows";

/// `reg.exe` argument lists that create the entry, in execution order.
pub fn register_commands(exe: &Path) -> Vec<Vec<String>> {
    let exe = exe.display().to_string();
    let command_key = format!(r"{CONTEXT_MENU_KEY}\command");
    vec![
        reg_args(&["add", CONTEXT_MENU_KEY, "/ve", "/d", CONTEXT_MENU_LABEL, "/f"]),
        reg_args(&["add", CONTEXT_MENU_KEY, "/v", "Icon", "/d", &exe, "/f"]),
        reg_args(&["add", &command_key, "/ve", "/d", &format!("\"{exe}\" \"%1\""), "/f"]),
    ]
}

pub fn unregister_command() -> Vec<String> {
    reg_args(&["delete", CONTEXT_MENU_KEY, "/f"])
}

pub fn query_command() -> Vec<String> {
    reg_args(&["query", CONTEXT_MENU_KEY])
}

fn reg_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

pub fn register_context_menu() -> ActionOutcome {
    if !cfg!(windows) {
        return ActionOutcome::failed(UNSUPPORTED);
    }
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return ActionOutcome::failed(format!("Failed to get exe path: {e}")),
    };

    let result = register_commands(&exe)
        .iter()
        .try_for_each(|args| run_reg(args));
    match result {
        Ok(()) => {
            log::info!("context menu registered for {}", exe.display());
            ActionOutcome::ok("Context menu registered")
        }
        Err(err) => {
            log::warn!("context menu registration failed: {err}");
            ActionOutcome::failed(failure_message("Registering the context menu", &err))
        }
    }
}

pub fn unregister_context_menu() -> ActionOutcome {
    if !cfg!(windows) {
        return ActionOutcome::failed(UNSUPPORTED);
    }
    match run_reg(&unregister_command()) {
        Ok(()) => ActionOutcome::ok("Context menu removed"),
        Err(err) if is_missing_key(&err) => {
            ActionOutcome::ok("Context menu removed (it was not registered)")
        }
        Err(err) => {
            log::warn!("context menu removal failed: {err}");
            ActionOutcome::failed(failure_message("Removing the context menu", &err))
        }
    }
}

pub fn is_context_menu_registered() -> bool {
    cfg!(windows) && run_reg(&query_command()).is_ok()
}

fn is_missing_key(err: &LauncherError) -> bool {
    let text = err.to_string().to_lowercase();
    text.contains("unable to find") || text.contains("cannot find")
}

fn failure_message(action: &str, err: &LauncherError) -> String {
    if err.to_string().to_lowercase().contains("access is denied") {
        format!("{action} failed: access denied. Try running as administrator.")
    } else {
        format!("{action} failed: {err}")
    }
}

#[cfg(windows)]
fn run_reg(args: &[String]) -> LauncherResult<()> {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    let output = std::process::Command::new("reg")
        .args(args)
        .creation_flags(CREATE_NO_WINDOW)
        .output()
        .map_err(|e| LauncherError::Shell(format!("failed to run reg.exe: {e}")))?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    };
    Err(LauncherError::Shell(message))
}

#[cfg(not(windows))]
fn run_reg(_args: &[String]) -> LauncherResult<()> {
    Err(LauncherError::Shell(UNSUPPORTED.to_string()))
}
