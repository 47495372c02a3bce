use std::collections::BTreeMap;
use tauri::{AppHandle, State};
use tauri_plugin_dialog::DialogExt;
use tauri_plugin_opener::OpenerExt;

use crate::db::{Folder, FolderInput};
use crate::error::{LauncherError, LauncherResult};
use crate::hotkeys::{CurrentHotkeys, HotkeyTarget};
use crate::launcher::{ActionOutcome, AppContext, FolderOutcome};
use crate::updater::{self, UpdateOutcome};
use crate::{folder_actions, shell_integration, tray, window};

// ============================================
// Folder Commands
// ============================================

#[tauri::command]
pub fn list_folders(
    ctx: State<'_, AppContext>,
    sort_key: Option<String>,
) -> LauncherResult<Vec<Folder>> {
    ctx.list_folders(sort_key.as_deref())
}

#[tauri::command]
pub fn add_folder(ctx: State<'_, AppContext>, folder: FolderInput) -> LauncherResult<FolderOutcome> {
    ctx.add_folder(&folder)
}

#[tauri::command]
pub fn update_folder(
    ctx: State<'_, AppContext>,
    id: i64,
    folder: FolderInput,
) -> LauncherResult<FolderOutcome> {
    ctx.update_folder(id, &folder)
}

#[tauri::command]
pub fn delete_folder(ctx: State<'_, AppContext>, id: i64) -> LauncherResult<bool> {
    ctx.delete_folder(id)
}

#[tauri::command]
pub fn search_folders(ctx: State<'_, AppContext>, keyword: String) -> LauncherResult<Vec<Folder>> {
    ctx.search_folders(&keyword)
}

/// Opens the folder in the platform file manager.
#[tauri::command]
pub fn open_folder(app: AppHandle, path: String) -> bool {
    match app.opener().open_path(&path, None::<&str>) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("failed to open {}: {}", path, e);
            false
        }
    }
}

#[tauri::command]
pub async fn open_folder_in_vscode(app: AppHandle, path: String) -> ActionOutcome {
    folder_actions::open_in_vscode(&app, &path)
}

#[tauri::command]
pub async fn open_folder_in_terminal(path: String) -> ActionOutcome {
    folder_actions::open_in_terminal(&path)
}

#[tauri::command]
pub fn open_external(app: AppHandle, url: String) -> ActionOutcome {
    folder_actions::open_external(&app, &url)
}

/// Native folder picker; `None` when the user cancels.
#[tauri::command]
pub async fn select_folder(app: AppHandle) -> LauncherResult<Option<String>> {
    let picked = app
        .dialog()
        .file()
        .set_title("Select folder")
        .blocking_pick_folder();
    match picked {
        Some(path) => path
            .into_path()
            .map(|p| Some(p.to_string_lossy().into_owned()))
            .map_err(|e| LauncherError::InvalidInput(e.to_string())),
        None => Ok(None),
    }
}

// ============================================
// Settings Commands
// ============================================

#[tauri::command]
pub fn get_settings(ctx: State<'_, AppContext>) -> LauncherResult<BTreeMap<String, String>> {
    ctx.settings()
}

#[tauri::command]
pub fn set_setting(ctx: State<'_, AppContext>, key: String, value: String) -> bool {
    ctx.set_setting(&key, &value)
}

// ============================================
// Hotkey Commands
// ============================================

#[tauri::command]
pub fn update_hotkey(
    ctx: State<'_, AppContext>,
    combination: String,
    target: HotkeyTarget,
) -> ActionOutcome {
    ctx.update_hotkey(&combination, target)
}

#[tauri::command]
pub fn get_current_hotkeys(ctx: State<'_, AppContext>) -> LauncherResult<CurrentHotkeys> {
    ctx.current_hotkeys()
}

// ============================================
// Window Commands
// ============================================

#[tauri::command]
pub fn hide_window(app: AppHandle) {
    window::hide_main_window(&app);
}

#[tauri::command]
pub fn minimize_window(app: AppHandle) -> Result<(), String> {
    window::minimize_main_window(&app).map_err(|e| e.to_string())
}

#[tauri::command]
pub fn open_settings(app: AppHandle) {
    tray::open_settings(&app);
}

// ============================================
// Update Commands
// ============================================

#[tauri::command]
pub async fn check_for_updates(app: AppHandle) -> UpdateOutcome {
    updater::check_for_updates(&app).await
}

#[tauri::command]
pub async fn install_update(app: AppHandle) -> UpdateOutcome {
    updater::install_update(&app).await
}

// ============================================
// Context Menu Commands
// ============================================

#[tauri::command]
pub async fn register_context_menu() -> ActionOutcome {
    shell_integration::register_context_menu()
}

#[tauri::command]
pub async fn unregister_context_menu() -> ActionOutcome {
    shell_integration::unregister_context_menu()
}

#[tauri::command]
pub async fn is_context_menu_registered() -> bool {
    shell_integration::is_context_menu_registered()
}
