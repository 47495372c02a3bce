use tauri::menu::{MenuBuilder, MenuItemBuilder, PredefinedMenuItem};
use tauri::tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent};
use tauri::{App, AppHandle, Emitter, Runtime};

use crate::launcher;
use crate::window::{self, MAIN_WINDOW};

pub const OPEN_SETTINGS_EVENT: &str = "open-settings-page";

/// Shows the main window and asks the UI to switch to its settings page.
pub fn open_settings<R: Runtime>(app: &AppHandle<R>) {
    window::show_main_window(app);
    if let Err(e) = app.emit_to(MAIN_WINDOW, OPEN_SETTINGS_EVENT, ()) {
        log::warn!("failed to open settings page: {}", e);
    }
}

pub fn init<R: Runtime>(app: &App<R>) -> tauri::Result<()> {
    let show = MenuItemBuilder::with_id("show", "Show Folder Launcher").build(app)?;
    let add_folder = MenuItemBuilder::with_id("add_folder", "Add Folder...").build(app)?;
    let settings = MenuItemBuilder::with_id("settings", "Settings...").build(app)?;
    let separator = PredefinedMenuItem::separator(app)?;
    let quit = MenuItemBuilder::with_id("quit", "Quit").build(app)?;

    let menu = MenuBuilder::new(app)
        .items(&[&show, &add_folder, &settings, &separator, &quit])
        .build()?;

    let mut tray = TrayIconBuilder::with_id("main-tray")
        .menu(&menu)
        .tooltip("Folder Launcher")
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| match event.id().as_ref() {
            "show" => window::show_main_window(app),
            "add_folder" => launcher::pick_and_add_folder(app),
            "settings" => open_settings(app),
            "quit" => app.exit(0),
            _ => {}
        })
        .on_tray_icon_event(|tray, event| match event {
            TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } => window::toggle_main_window(tray.app_handle()),
            TrayIconEvent::DoubleClick {
                button: MouseButton::Left,
                ..
            } => window::show_main_window(tray.app_handle()),
            _ => {}
        });

    if let Some(icon) = app.default_window_icon().cloned() {
        tray = tray.icon(icon);
    } else {
        log::warn!("no bundled icon found for the tray");
    }

    tray.build(app)?;
    Ok(())
}
