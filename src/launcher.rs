//! Application context and the handlers for OS-originated triggers
//! (global hotkeys, folder paths passed on the command line).

use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tauri::{AppHandle, Emitter, Manager, Runtime};
use tauri_plugin_dialog::DialogExt;

use crate::db::{Folder, FolderInput, FolderSort, FolderStore, ADD_FOLDER_HOTKEY_KEY, DEFAULT_COLOR};
use crate::error::{LauncherError, LauncherResult, LockResultExt};
use crate::hotkeys::{CurrentHotkeys, HotkeyBindings, HotkeyTarget, ShortcutRegistrar};
use crate::window;

/// Accent colors assigned to folders added from the shell context menu.
pub const ACCENT_PALETTE: [&str; 8] = [
    "#007acc", "#ff6b6b", "#4ecdc4", "#45b7d1", "#96ceb4", "#feca57", "#ff9ff3", "#54a0ff",
];

pub const FOLDER_ADDED_EVENT: &str = "folder-added";

/// `{ success, message }` result returned to the UI for recoverable actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub success: bool,
    pub message: String,
}

impl ActionOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Result of a folder write requested by the user. `folder` is the saved
/// record after a successful add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderOutcome {
    pub success: bool,
    pub message: String,
    pub folder: Option<Folder>,
}

impl FolderOutcome {
    fn saved(message: impl Into<String>, folder: Option<Folder>) -> Self {
        Self {
            success: true,
            message: message.into(),
            folder,
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            folder: None,
        }
    }
}

/// Turns user-recoverable store errors into a rejected outcome.
fn folder_outcome(result: LauncherResult<FolderOutcome>) -> LauncherResult<FolderOutcome> {
    match result {
        Err(err) if err.is_user_recoverable() => {
            log::info!("folder write rejected: {err}");
            Ok(FolderOutcome::rejected(err.to_string()))
        }
        other => other,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Added(Folder),
    AlreadyPresent(Folder),
    /// The path does not exist on disk.
    Missing,
}

/// Everything the commands and OS callbacks share. Built once in `setup`
/// and managed by Tauri.
pub struct AppContext {
    store: Arc<FolderStore>,
    hotkeys: Mutex<HotkeyBindings>,
}

impl AppContext {
    /// Expects an initialized store; the persisted add-folder hotkey
    /// replaces the built-in default.
    pub fn new(store: Arc<FolderStore>, registrar: Box<dyn ShortcutRegistrar>) -> Self {
        let persisted = store.get_setting(ADD_FOLDER_HOTKEY_KEY).unwrap_or_else(|err| {
            log::warn!("could not read persisted add-folder hotkey: {err}");
            None
        });
        let hotkeys = HotkeyBindings::new(registrar, persisted.as_deref());
        Self {
            store,
            hotkeys: Mutex::new(hotkeys),
        }
    }

    pub fn store(&self) -> &FolderStore {
        &self.store
    }

    // ============================================
    // Folders
    // ============================================

    pub fn list_folders(&self, sort_key: Option<&str>) -> LauncherResult<Vec<Folder>> {
        self.store.list_folders(FolderSort::from_key(sort_key))
    }

    /// Duplicate paths and empty fields come back as a rejected outcome;
    /// only store failures are errors.
    pub fn add_folder(&self, input: &FolderInput) -> LauncherResult<FolderOutcome> {
        folder_outcome(
            self.store
                .add_folder(input)
                .map(|folder| FolderOutcome::saved("Folder added", Some(folder))),
        )
    }

    pub fn update_folder(&self, id: i64, input: &FolderInput) -> LauncherResult<FolderOutcome> {
        folder_outcome(self.store.update_folder(id, input).map(|updated| {
            if updated {
                FolderOutcome::saved("Folder updated", None)
            } else {
                FolderOutcome::rejected(format!("folder {id} not found"))
            }
        }))
    }

    pub fn delete_folder(&self, id: i64) -> LauncherResult<bool> {
        self.store.delete_folder(id)
    }

    pub fn search_folders(&self, keyword: &str) -> LauncherResult<Vec<Folder>> {
        self.store.search_folders(keyword)
    }

    /// Adds a directory handed over by the shell context menu unless it is
    /// missing or already pinned.
    pub fn import_folder_path(&self, path: &Path) -> LauncherResult<ImportOutcome> {
        if !path.exists() {
            log::warn!("folder does not exist: {}", path.display());
            return Ok(ImportOutcome::Missing);
        }

        let path_text = path.to_string_lossy().into_owned();
        if let Some(existing) = self.store.get_folder_by_path(&path_text)? {
            log::info!("folder already added: {path_text}");
            return Ok(ImportOutcome::AlreadyPresent(existing));
        }

        let input =
            FolderInput::new(folder_name_for(path), path_text.clone()).with_color(random_accent_color());
        match self.store.add_folder(&input) {
            Ok(folder) => Ok(ImportOutcome::Added(folder)),
            Err(LauncherError::DuplicatePath { .. }) => self
                .store
                .get_folder_by_path(&path_text)?
                .map(ImportOutcome::AlreadyPresent)
                .ok_or(LauncherError::DuplicatePath { path: path_text }),
            Err(err) => Err(err),
        }
    }

    // ============================================
    // Settings
    // ============================================

    pub fn settings(&self) -> LauncherResult<BTreeMap<String, String>> {
        self.store.get_all_settings()
    }

    pub fn set_setting(&self, key: &str, value: &str) -> bool {
        match self.store.set_setting(key, value) {
            Ok(()) => true,
            Err(err) => {
                log::error!("failed to save setting {key}: {err}");
                false
            }
        }
    }

    // ============================================
    // Hotkeys
    // ============================================

    pub fn register_default_hotkeys(&self) -> LauncherResult<()> {
        self.hotkeys
            .lock()
            .map_lock_err("hotkeys")?
            .register_defaults();
        Ok(())
    }

    pub fn current_hotkeys(&self) -> LauncherResult<CurrentHotkeys> {
        Ok(self.hotkeys.lock().map_lock_err("hotkeys")?.current())
    }

    /// Never fails: a taken or invalid combination is reported in the
    /// outcome and the previous binding stays active.
    pub fn update_hotkey(&self, combination: &str, target: HotkeyTarget) -> ActionOutcome {
        let result = self
            .hotkeys
            .lock()
            .map_lock_err("hotkeys")
            .and_then(|mut hotkeys| hotkeys.update(target, combination));

        match result {
            Ok(accelerator) => {
                if target == HotkeyTarget::AddFolder {
                    if let Err(err) = self.store.set_setting(ADD_FOLDER_HOTKEY_KEY, &accelerator) {
                        log::warn!("add-folder hotkey active but not saved: {err}");
                        return ActionOutcome::ok(format!(
                            "Hotkey changed to {accelerator} for this session only"
                        ));
                    }
                }
                ActionOutcome::ok(format!("Hotkey changed to {accelerator}"))
            }
            Err(LauncherError::HotkeyUnavailable { accelerator }) => ActionOutcome::failed(format!(
                "{accelerator} is already in use or invalid"
            )),
            Err(err) => ActionOutcome::failed(err.to_string()),
        }
    }

    /// Releases global shortcuts and the database handle.
    pub fn shutdown(&self) {
        match self.hotkeys.lock() {
            Ok(mut hotkeys) => hotkeys.unregister_all(),
            Err(poisoned) => poisoned.into_inner().unregister_all(),
        }
        self.store.close();
    }
}

/// First command-line argument after the executable, if it names a folder.
/// `.` and `--flags` are ignored.
pub fn folder_argument<I, S>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let arg = args.into_iter().nth(1)?;
    let arg = arg.as_ref().trim();
    is_folder_argument(arg).then(|| PathBuf::from(arg))
}

/// [`folder_argument`] over raw process arguments. A path that is not valid
/// Unicode is passed through unchanged.
pub fn os_folder_argument<I>(args: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = OsString>,
{
    let arg = args.into_iter().nth(1)?;
    if let Some(text) = arg.to_str() {
        return folder_argument(["", text]);
    }
    let lossy = arg.to_string_lossy().into_owned();
    is_folder_argument(lossy.trim()).then(|| PathBuf::from(arg))
}

fn is_folder_argument(arg: &str) -> bool {
    !(arg.is_empty() || arg == "." || arg.starts_with("--"))
}

pub fn folder_name_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

pub fn random_accent_color() -> &'static str {
    ACCENT_PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_COLOR)
}

// ============================================
// OS triggers
// ============================================

pub fn on_hotkey<R: Runtime>(app: &AppHandle<R>, target: HotkeyTarget) {
    log::debug!("hotkey pressed: {target:?}");
    match target {
        HotkeyTarget::Toggle => window::toggle_main_window(app),
        HotkeyTarget::AddFolder => pick_and_add_folder(app),
    }
}

/// Opens a native folder picker and pins the chosen folder.
pub fn pick_and_add_folder<R: Runtime>(app: &AppHandle<R>) {
    let handle = app.clone();
    app.dialog()
        .file()
        .set_title("Add folder")
        .pick_folder(move |picked| {
            let Some(picked) = picked else {
                return;
            };
            let path = match picked.into_path() {
                Ok(path) => path,
                Err(err) => {
                    log::warn!("picked folder is not a local path: {err}");
                    return;
                }
            };

            let context = handle.state::<AppContext>();
            let input = FolderInput::new(folder_name_for(&path), path.to_string_lossy());
            match context.add_folder(&input) {
                Ok(FolderOutcome {
                    folder: Some(folder),
                    ..
                }) => notify_folder_added(&handle, &folder),
                Ok(outcome) => log::info!("{}", outcome.message),
                Err(err) => log::error!("failed to add folder: {err}"),
            }
        });
}

/// Handles a folder path received from the shell context menu, either at
/// startup or forwarded by a second instance.
pub fn handle_folder_argument<R: Runtime>(app: &AppHandle<R>, path: &Path) {
    let context = app.state::<AppContext>();
    match context.import_folder_path(path) {
        Ok(ImportOutcome::Added(folder)) => {
            log::info!("added folder from context menu: {}", folder.path);
            notify_folder_added(app, &folder);
        }
        Ok(ImportOutcome::AlreadyPresent(_)) | Ok(ImportOutcome::Missing) => {}
        Err(err) => log::error!("failed to add folder {}: {err}", path.display()),
    }
}

fn notify_folder_added<R: Runtime>(app: &AppHandle<R>, folder: &Folder) {
    if let Err(err) = app.emit_to(window::MAIN_WINDOW, FOLDER_ADDED_EVENT, folder) {
        log::warn!("failed to notify window about new folder: {err}");
    }
}
