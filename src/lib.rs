mod commands;
mod db;
mod error;
mod folder_actions;
mod hotkeys;
mod launcher;
mod search_key;
mod shell_integration;
mod tray;
mod updater;
mod window;

use std::path::PathBuf;
use std::sync::Arc;
use tauri::{Manager, RunEvent};

use db::FolderStore;
use error::{LauncherError, LauncherResult};
use launcher::AppContext;

fn get_data_dir(app: &tauri::App) -> LauncherResult<PathBuf> {
    app.path()
        .app_data_dir()
        .map_err(|e| LauncherError::StoreInit {
            path: "<app data dir>".to_string(),
            reason: e.to_string(),
        })
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("panic: {info}");
        default_hook(info);
    }));
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    init_logging();
    install_panic_hook();

    let mut builder = tauri::Builder::default();

    // Must be the first plugin so a second launch exits before touching the database.
    #[cfg(desktop)]
    {
        builder = builder.plugin(tauri_plugin_single_instance::init(|app, argv, _cwd| {
            log::info!("second instance started with {argv:?}");
            window::show_main_window(app);
            if let Some(path) = launcher::folder_argument(&argv) {
                launcher::handle_folder_argument(app, &path);
            }
        }));
    }

    builder = builder
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_updater::Builder::new().build());

    #[cfg(desktop)]
    {
        builder = builder.plugin(tauri_plugin_global_shortcut::Builder::new().build());
    }

    let app = builder
        .setup(|app| {
            let data_dir = get_data_dir(app)?;
            let store = Arc::new(FolderStore::new(&data_dir));
            if let Err(e) = store.initialize() {
                log::error!("{e}");
                return Err(e.into());
            }
            log::info!("folder store opened at {}", store.db_path().display());

            #[cfg(desktop)]
            let registrar = hotkeys::GlobalShortcutRegistrar::new(app.handle().clone());
            #[cfg(mobile)]
            let registrar = hotkeys::UnsupportedRegistrar;

            let context = AppContext::new(store, Box::new(registrar));
            context.register_default_hotkeys()?;
            app.manage(context);

            tray::init(app)?;
            window::install_main_window_handlers(app.handle());

            if let Some(path) = launcher::os_folder_argument(std::env::args_os()) {
                launcher::handle_folder_argument(app.handle(), &path);
                window::show_main_window(app.handle());
            }

            #[cfg(windows)]
            tauri::async_runtime::spawn_blocking(|| {
                let outcome = shell_integration::register_context_menu();
                log::info!("context menu: {}", outcome.message);
            });

            updater::spawn_startup_check(app.handle());

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            // Folders
            commands::list_folders,
            commands::add_folder,
            commands::update_folder,
            commands::delete_folder,
            commands::search_folders,
            commands::open_folder,
            commands::open_folder_in_vscode,
            commands::open_folder_in_terminal,
            commands::open_external,
            commands::select_folder,
            // Settings
            commands::get_settings,
            commands::set_setting,
            // Hotkeys
            commands::update_hotkey,
            commands::get_current_hotkeys,
            // Window
            commands::hide_window,
            commands::minimize_window,
            commands::open_settings,
            // Updates
            commands::check_for_updates,
            commands::install_update,
            // Context menu
            commands::register_context_menu,
            commands::unregister_context_menu,
            commands::is_context_menu_registered,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app, event| {
        if let RunEvent::Exit = event {
            if let Some(context) = app.try_state::<AppContext>() {
                context.shutdown();
            }
            log::info!("folder launcher exited");
        }
    });
}
