use serde::Serialize;
use tauri::{AppHandle, Runtime};
use tauri_plugin_updater::UpdaterExt;

use crate::error::{LauncherError, LauncherResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub success: bool,
    pub message: String,
    pub version: Option<String>,
}

impl UpdateOutcome {
    fn disabled() -> Self {
        Self {
            success: false,
            message: "Updates are disabled in development builds".to_string(),
            version: None,
        }
    }

    fn from_result(result: LauncherResult<Option<String>>, found: &str, none: &str) -> Self {
        match result {
            Ok(Some(version)) => Self {
                success: true,
                message: format!("{found} {version}"),
                version: Some(version),
            },
            Ok(None) => Self {
                success: true,
                message: none.to_string(),
                version: None,
            },
            Err(err) => {
                log::warn!("{err}");
                Self {
                    success: false,
                    message: err.to_string(),
                    version: None,
                }
            }
        }
    }
}

fn updates_enabled() -> bool {
    !cfg!(debug_assertions)
}

/// Returns the version of an available update, if any.
async fn available_version<R: Runtime>(app: &AppHandle<R>) -> LauncherResult<Option<String>> {
    let update = app
        .updater()
        .map_err(|e| LauncherError::Update(e.to_string()))?
        .check()
        .await
        .map_err(|e| LauncherError::Update(e.to_string()))?;
    Ok(update.map(|u| u.version))
}

/// Downloads and installs the available update. Restarts the app on success.
async fn download_and_install<R: Runtime>(app: &AppHandle<R>) -> LauncherResult<Option<String>> {
    let update = app
        .updater()
        .map_err(|e| LauncherError::Update(e.to_string()))?
        .check()
        .await
        .map_err(|e| LauncherError::Update(e.to_string()))?;
    let Some(update) = update else {
        return Ok(None);
    };

    let version = update.version.clone();
    log::info!("downloading update {version}");
    update
        .download_and_install(|_chunk, _total| {}, || log::info!("update downloaded"))
        .await
        .map_err(|e| LauncherError::Update(e.to_string()))?;
    log::info!("update {version} installed, restarting");
    app.restart();
}

pub async fn check_for_updates<R: Runtime>(app: &AppHandle<R>) -> UpdateOutcome {
    if !updates_enabled() {
        return UpdateOutcome::disabled();
    }
    UpdateOutcome::from_result(
        available_version(app).await,
        "Update available:",
        "You are running the latest version",
    )
}

pub async fn install_update<R: Runtime>(app: &AppHandle<R>) -> UpdateOutcome {
    if !updates_enabled() {
        return UpdateOutcome::disabled();
    }
    UpdateOutcome::from_result(
        download_and_install(app).await,
        "Installed version",
        "No update available",
    )
}

/// Background check run once at startup in release builds.
pub fn spawn_startup_check<R: Runtime>(app: &AppHandle<R>) {
    if !updates_enabled() {
        log::debug!("update check skipped in development build");
        return;
    }
    let handle = app.clone();
    tauri::async_runtime::spawn(async move {
        let outcome = check_for_updates(&handle).await;
        log::info!("startup update check: {}", outcome.message);
    });
}
