use tauri::{AppHandle, Manager, Runtime, WebviewWindow, WindowEvent};

pub const MAIN_WINDOW: &str = "main";

fn main_window<R: Runtime>(app: &AppHandle<R>) -> Option<WebviewWindow<R>> {
    let window = app.get_webview_window(MAIN_WINDOW);
    if window.is_none() {
        log::warn!("main window is not available");
    }
    window
}

pub fn show_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(win) = main_window(app) {
        if win.is_minimized().unwrap_or(false) {
            let _ = win.unminimize();
        }
        let _ = win.center();
        let _ = win.show();
        let _ = win.set_focus();
    }
}

pub fn hide_main_window<R: Runtime>(app: &AppHandle<R>) {
    if let Some(win) = main_window(app) {
        let _ = win.hide();
    }
}

pub fn toggle_main_window<R: Runtime>(app: &AppHandle<R>) {
    let Some(win) = main_window(app) else {
        return;
    };
    let focused_and_visible =
        win.is_visible().unwrap_or(false) && win.is_focused().unwrap_or(false);
    if focused_and_visible {
        let _ = win.hide();
    } else {
        show_main_window(app);
    }
}

pub fn minimize_main_window<R: Runtime>(app: &AppHandle<R>) -> tauri::Result<()> {
    match app.get_webview_window(MAIN_WINDOW) {
        Some(win) => win.minimize(),
        None => Ok(()),
    }
}

/// Closing the main window hides it; the tray keeps the app alive.
/// Release builds also hide it when it loses focus.
pub fn install_main_window_handlers<R: Runtime>(app: &AppHandle<R>) {
    let Some(main_window) = main_window(app) else {
        return;
    };
    let win = main_window.clone();
    main_window.on_window_event(move |event| match event {
        WindowEvent::CloseRequested { api, .. } => {
            api.prevent_close();
            let _ = win.hide();
        }
        WindowEvent::Focused(false) if !cfg!(debug_assertions) => {
            let _ = win.hide();
        }
        _ => {}
    });
}
