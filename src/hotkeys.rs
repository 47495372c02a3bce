//! Global hotkey bindings and the registration/fallback policy.
//!
//! Each target (toggle window, add folder) owns one slot. A slot is either
//! unbound or bound to exactly one accelerator; updating a slot either binds
//! the new accelerator or restores the previous one.

use serde::{Deserialize, Serialize};

use crate::error::{LauncherError, LauncherResult};

pub const DEFAULT_TOGGLE_HOTKEY: &str = "Alt+F";
pub const BACKUP_TOGGLE_HOTKEY: &str = "CommandOrControl+Shift+F";
pub const DEFAULT_ADD_FOLDER_HOTKEY: &str = "CommandOrControl+Alt+A";
pub const BACKUP_ADD_FOLDER_HOTKEY: &str = "CommandOrControl+Shift+A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HotkeyTarget {
    Toggle,
    AddFolder,
}

impl HotkeyTarget {
    pub const ALL: [HotkeyTarget; 2] = [HotkeyTarget::Toggle, HotkeyTarget::AddFolder];

    pub fn default_accelerator(self) -> &'static str {
        match self {
            HotkeyTarget::Toggle => DEFAULT_TOGGLE_HOTKEY,
            HotkeyTarget::AddFolder => DEFAULT_ADD_FOLDER_HOTKEY,
        }
    }

    pub fn backup_accelerator(self) -> &'static str {
        match self {
            HotkeyTarget::Toggle => BACKUP_TOGGLE_HOTKEY,
            HotkeyTarget::AddFolder => BACKUP_ADD_FOLDER_HOTKEY,
        }
    }

    fn label(self) -> &'static str {
        match self {
            HotkeyTarget::Toggle => "toggle window",
            HotkeyTarget::AddFolder => "add folder",
        }
    }
}

/// OS-level registration of global shortcuts.
pub trait ShortcutRegistrar: Send {
    /// Binds `accelerator` so that pressing it triggers `target`.
    fn register(&mut self, target: HotkeyTarget, accelerator: &str) -> Result<(), String>;
    fn unregister(&mut self, accelerator: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    current: String,
    bound: bool,
}

impl Slot {
    fn new(accelerator: &str) -> Self {
        Self {
            current: accelerator.to_string(),
            bound: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentHotkeys {
    pub toggle: String,
    pub add_folder: String,
}

pub struct HotkeyBindings {
    registrar: Box<dyn ShortcutRegistrar>,
    toggle: Slot,
    add_folder: Slot,
}

impl HotkeyBindings {
    /// `add_folder_override` is the persisted add-folder accelerator, if any.
    pub fn new(registrar: Box<dyn ShortcutRegistrar>, add_folder_override: Option<&str>) -> Self {
        let add_folder = add_folder_override
            .map(normalize_accelerator)
            .filter(|accel| !accel.is_empty())
            .unwrap_or_else(|| HotkeyTarget::AddFolder.default_accelerator().to_string());
        Self {
            registrar,
            toggle: Slot::new(HotkeyTarget::Toggle.default_accelerator()),
            add_folder: Slot::new(&add_folder),
        }
    }

    fn slot(&self, target: HotkeyTarget) -> &Slot {
        match target {
            HotkeyTarget::Toggle => &self.toggle,
            HotkeyTarget::AddFolder => &self.add_folder,
        }
    }

    fn slot_mut(&mut self, target: HotkeyTarget) -> &mut Slot {
        match target {
            HotkeyTarget::Toggle => &mut self.toggle,
            HotkeyTarget::AddFolder => &mut self.add_folder,
        }
    }

    fn other(target: HotkeyTarget) -> HotkeyTarget {
        match target {
            HotkeyTarget::Toggle => HotkeyTarget::AddFolder,
            HotkeyTarget::AddFolder => HotkeyTarget::Toggle,
        }
    }

    pub fn current(&self) -> CurrentHotkeys {
        CurrentHotkeys {
            toggle: self.toggle.current.clone(),
            add_folder: self.add_folder.current.clone(),
        }
    }

    pub fn is_bound(&self, target: HotkeyTarget) -> bool {
        self.slot(target).bound
    }

    /// Binds every unbound slot, trying its current accelerator and then its
    /// backup. Slots where every candidate fails stay unbound.
    pub fn register_defaults(&mut self) {
        for target in HotkeyTarget::ALL {
            if self.is_bound(target) {
                continue;
            }

            let mut candidates = vec![self.slot(target).current.clone()];
            let backup = target.backup_accelerator().to_string();
            if !candidates.contains(&backup) {
                candidates.push(backup);
            }

            match self.bind_first(target, &candidates) {
                Some(accelerator) => {
                    log::info!("registered {} hotkey {accelerator}", target.label());
                }
                None => log::warn!(
                    "no {} hotkey could be registered (tried {}); use the tray icon instead",
                    target.label(),
                    candidates.join(", ")
                ),
            }
        }
    }

    fn bind_first(&mut self, target: HotkeyTarget, candidates: &[String]) -> Option<String> {
        for accelerator in candidates {
            if self.is_taken_by_other(target, accelerator) {
                log::warn!("{accelerator} is already bound to another action");
                continue;
            }
            match self.registrar.register(target, accelerator) {
                Ok(()) => {
                    let slot = self.slot_mut(target);
                    slot.current = accelerator.clone();
                    slot.bound = true;
                    return Some(accelerator.clone());
                }
                Err(err) => log::warn!("failed to register {accelerator}: {err}"),
            }
        }
        None
    }

    fn is_taken_by_other(&self, target: HotkeyTarget, accelerator: &str) -> bool {
        let other = self.slot(Self::other(target));
        other.bound && other.current.eq_ignore_ascii_case(accelerator)
    }

    /// Rebinds `target` to `combination` (UI syntax). On failure the previous
    /// binding is restored and `HotkeyUnavailable` is returned.
    pub fn update(&mut self, target: HotkeyTarget, combination: &str) -> LauncherResult<String> {
        let accelerator = normalize_accelerator(combination);
        if accelerator.is_empty() || self.is_taken_by_other(target, &accelerator) {
            return Err(unavailable(&accelerator));
        }

        let previous = self.slot(target).clone();
        if previous.bound && previous.current == accelerator {
            return Ok(accelerator);
        }

        // Unbind only after the OS has released the old accelerator.
        if previous.bound {
            if let Err(err) = self.registrar.unregister(&previous.current) {
                log::warn!("failed to unregister {}: {err}", previous.current);
                return Err(unavailable(&accelerator));
            }
            self.slot_mut(target).bound = false;
        }

        match self.registrar.register(target, &accelerator) {
            Ok(()) => {
                let slot = self.slot_mut(target);
                slot.current = accelerator.clone();
                slot.bound = true;
                log::info!("{} hotkey changed to {accelerator}", target.label());
                Ok(accelerator)
            }
            Err(err) => {
                log::warn!("failed to register {accelerator}: {err}");
                if previous.bound {
                    match self.registrar.register(target, &previous.current) {
                        Ok(()) => self.slot_mut(target).bound = true,
                        Err(err) => log::error!(
                            "failed to restore {} hotkey {}: {err}",
                            target.label(),
                            previous.current
                        ),
                    }
                }
                Err(unavailable(&accelerator))
            }
        }
    }

    pub fn unregister_all(&mut self) {
        for target in HotkeyTarget::ALL {
            let slot = self.slot(target).clone();
            if !slot.bound {
                continue;
            }
            if let Err(err) = self.registrar.unregister(&slot.current) {
                log::warn!("failed to unregister {}: {err}", slot.current);
            }
            self.slot_mut(target).bound = false;
        }
    }
}

fn unavailable(accelerator: &str) -> LauncherError {
    LauncherError::HotkeyUnavailable {
        accelerator: accelerator.to_string(),
    }
}

/// Converts the UI's key-combination text ("Ctrl + Alt + F") into the
/// accelerator syntax the shortcut plugin parses ("CommandOrControl+Alt+F").
pub fn normalize_accelerator(combination: &str) -> String {
    combination
        .split('+')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            if token.eq_ignore_ascii_case("ctrl") || token.eq_ignore_ascii_case("control") {
                "CommandOrControl"
            } else {
                token
            }
        })
        .collect::<Vec<_>>()
        .join("+")
}

#[cfg(desktop)]
pub use desktop::GlobalShortcutRegistrar;

/// Mobile targets have no global shortcuts; both slots stay unbound.
#[cfg(mobile)]
pub struct UnsupportedRegistrar;

#[cfg(mobile)]
impl ShortcutRegistrar for UnsupportedRegistrar {
    fn register(&mut self, _target: HotkeyTarget, accelerator: &str) -> Result<(), String> {
        Err(format!("global shortcuts are not available on this platform: {accelerator}"))
    }

    fn unregister(&mut self, _accelerator: &str) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(desktop)]
mod desktop {
    use tauri::{AppHandle, Runtime};
    use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

    use super::{HotkeyTarget, ShortcutRegistrar};

    /// Registers accelerators through tauri-plugin-global-shortcut and routes
    /// presses to [`crate::launcher::on_hotkey`].
    pub struct GlobalShortcutRegistrar<R: Runtime> {
        app: AppHandle<R>,
    }

    impl<R: Runtime> GlobalShortcutRegistrar<R> {
        pub fn new(app: AppHandle<R>) -> Self {
            Self { app }
        }
    }

    impl<R: Runtime> ShortcutRegistrar for GlobalShortcutRegistrar<R> {
        fn register(&mut self, target: HotkeyTarget, accelerator: &str) -> Result<(), String> {
            self.app
                .global_shortcut()
                .on_shortcut(accelerator, move |app, _shortcut, event| {
                    if matches!(event.state, ShortcutState::Pressed) {
                        crate::launcher::on_hotkey(app, target);
                    }
                })
                .map_err(|e| e.to_string())
        }

        fn unregister(&mut self, accelerator: &str) -> Result<(), String> {
            self.app
                .global_shortcut()
                .unregister(accelerator)
                .map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// In-memory registrar. Accelerators in `blocked` behave as if another
    /// process owns them; accelerators in `stuck` refuse to unregister.
    #[derive(Clone, Default)]
    pub(crate) struct FakeRegistrar {
        pub blocked: Arc<Mutex<HashSet<String>>>,
        pub stuck: Arc<Mutex<HashSet<String>>>,
        pub active: Arc<Mutex<Vec<(HotkeyTarget, String)>>>,
    }

    impl FakeRegistrar {
        pub fn blocking(accelerators: &[&str]) -> Self {
            let fake = Self::default();
            fake.blocked
                .lock()
                .unwrap()
                .extend(accelerators.iter().map(|a| a.to_string()));
            fake
        }

        pub fn active(&self) -> Vec<(HotkeyTarget, String)> {
            self.active.lock().unwrap().clone()
        }
    }

    impl ShortcutRegistrar for FakeRegistrar {
        fn register(&mut self, target: HotkeyTarget, accelerator: &str) -> Result<(), String> {
            if self.blocked.lock().unwrap().contains(accelerator) {
                return Err(format!("{accelerator} is held by another application"));
            }
            let mut active = self.active.lock().unwrap();
            if active.iter().any(|(_, a)| a == accelerator) {
                return Err(format!("{accelerator} already registered"));
            }
            active.push((target, accelerator.to_string()));
            Ok(())
        }

        fn unregister(&mut self, accelerator: &str) -> Result<(), String> {
            if self.stuck.lock().unwrap().contains(accelerator) {
                return Err(format!("{accelerator} could not be released"));
            }
            let mut active = self.active.lock().unwrap();
            let before = active.len();
            active.retain(|(_, a)| a != accelerator);
            if active.len() == before {
                return Err(format!("{accelerator} is not registered"));
            }
            Ok(())
        }
    }

    fn bindings(fake: &FakeRegistrar, add_folder_override: Option<&str>) -> HotkeyBindings {
        HotkeyBindings::new(Box::new(fake.clone()), add_folder_override)
    }

    #[test]
    fn test_normalize_maps_ctrl_and_trims() {
        assert_eq!(normalize_accelerator("Ctrl+Alt+F"), "CommandOrControl+Alt+F");
        assert_eq!(normalize_accelerator(" ctrl + Shift + K "), "CommandOrControl+Shift+K");
        assert_eq!(normalize_accelerator("Control+Q"), "CommandOrControl+Q");
        assert_eq!(normalize_accelerator("CommandOrControl+Q"), "CommandOrControl+Q");
        assert_eq!(normalize_accelerator("Alt+F"), "Alt+F");
        assert_eq!(normalize_accelerator(" + "), "");
    }

    #[test]
    fn test_register_defaults_binds_primary_combinations() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, None);

        hotkeys.register_defaults();

        assert!(hotkeys.is_bound(HotkeyTarget::Toggle));
        assert!(hotkeys.is_bound(HotkeyTarget::AddFolder));
        assert_eq!(
            hotkeys.current(),
            CurrentHotkeys {
                toggle: DEFAULT_TOGGLE_HOTKEY.to_string(),
                add_folder: DEFAULT_ADD_FOLDER_HOTKEY.to_string(),
            }
        );
        assert_eq!(
            fake.active(),
            vec![
                (HotkeyTarget::Toggle, DEFAULT_TOGGLE_HOTKEY.to_string()),
                (HotkeyTarget::AddFolder, DEFAULT_ADD_FOLDER_HOTKEY.to_string()),
            ]
        );
    }

    #[test]
    fn test_register_defaults_falls_back_to_backup() {
        let fake = FakeRegistrar::blocking(&[DEFAULT_TOGGLE_HOTKEY]);
        let mut hotkeys = bindings(&fake, None);

        hotkeys.register_defaults();

        assert!(hotkeys.is_bound(HotkeyTarget::Toggle));
        assert_eq!(hotkeys.current().toggle, BACKUP_TOGGLE_HOTKEY);
        assert_eq!(hotkeys.current().add_folder, DEFAULT_ADD_FOLDER_HOTKEY);
    }

    #[test]
    fn test_register_defaults_leaves_slot_unbound_when_all_candidates_fail() {
        let fake = FakeRegistrar::blocking(&[DEFAULT_ADD_FOLDER_HOTKEY, BACKUP_ADD_FOLDER_HOTKEY]);
        let mut hotkeys = bindings(&fake, None);

        hotkeys.register_defaults();

        assert!(hotkeys.is_bound(HotkeyTarget::Toggle));
        assert!(!hotkeys.is_bound(HotkeyTarget::AddFolder));
        assert_eq!(hotkeys.current().add_folder, DEFAULT_ADD_FOLDER_HOTKEY);
        assert_eq!(fake.active().len(), 1);
    }

    #[test]
    fn test_persisted_add_folder_hotkey_overrides_default() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, Some("Ctrl+Alt+K"));

        hotkeys.register_defaults();

        assert_eq!(hotkeys.current().add_folder, "CommandOrControl+Alt+K");
    }

    #[test]
    fn test_update_success_commits_new_combination() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();

        let accel = hotkeys.update(HotkeyTarget::Toggle, "Ctrl+Shift+L").unwrap();

        assert_eq!(accel, "CommandOrControl+Shift+L");
        assert_eq!(hotkeys.current().toggle, "CommandOrControl+Shift+L");
        let active = fake.active();
        assert!(active.contains(&(HotkeyTarget::Toggle, "CommandOrControl+Shift+L".to_string())));
        assert!(!active.iter().any(|(_, a)| a == DEFAULT_TOGGLE_HOTKEY));
    }

    #[test]
    fn test_update_conflict_restores_previous_binding() {
        let fake = FakeRegistrar::blocking(&["CommandOrControl+Space"]);
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();
        let before = hotkeys.current();

        let err = hotkeys
            .update(HotkeyTarget::AddFolder, "Ctrl+Space")
            .unwrap_err();

        assert!(matches!(err, LauncherError::HotkeyUnavailable { .. }));
        assert_eq!(hotkeys.current(), before);
        assert!(hotkeys.is_bound(HotkeyTarget::AddFolder));
        assert!(fake
            .active()
            .contains(&(HotkeyTarget::AddFolder, DEFAULT_ADD_FOLDER_HOTKEY.to_string())));
    }

    #[test]
    fn test_update_keeps_slot_bound_when_old_combination_cannot_be_released() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();
        let before = hotkeys.current();
        fake.stuck
            .lock()
            .unwrap()
            .insert(DEFAULT_ADD_FOLDER_HOTKEY.to_string());

        let err = hotkeys
            .update(HotkeyTarget::AddFolder, "Ctrl+Alt+N")
            .unwrap_err();

        assert!(matches!(err, LauncherError::HotkeyUnavailable { .. }));
        assert_eq!(hotkeys.current(), before);
        assert!(hotkeys.is_bound(HotkeyTarget::AddFolder));
        assert!(!fake
            .active()
            .iter()
            .any(|(_, a)| a == "CommandOrControl+Alt+N"));

        fake.stuck.lock().unwrap().clear();
        hotkeys.unregister_all();
        assert!(fake.active().is_empty());
    }

    #[test]
    fn test_update_to_other_targets_combination_is_unavailable() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();
        let before = hotkeys.current();

        let err = hotkeys
            .update(HotkeyTarget::Toggle, "Ctrl+Alt+A")
            .unwrap_err();

        assert!(matches!(err, LauncherError::HotkeyUnavailable { .. }));
        assert_eq!(hotkeys.current(), before);
        assert_eq!(fake.active().len(), 2);
    }

    #[test]
    fn test_update_with_empty_combination_is_rejected() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();

        assert!(hotkeys.update(HotkeyTarget::Toggle, "  ").is_err());
        assert!(hotkeys.is_bound(HotkeyTarget::Toggle));
        assert_eq!(hotkeys.current().toggle, DEFAULT_TOGGLE_HOTKEY);
    }

    #[test]
    fn test_update_same_combination_is_noop() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();

        assert_eq!(hotkeys.update(HotkeyTarget::Toggle, "Alt+F").unwrap(), "Alt+F");
        assert_eq!(fake.active().len(), 2);
    }

    #[test]
    fn test_update_binds_previously_unbound_slot() {
        let fake = FakeRegistrar::blocking(&[DEFAULT_TOGGLE_HOTKEY, BACKUP_TOGGLE_HOTKEY]);
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();
        assert!(!hotkeys.is_bound(HotkeyTarget::Toggle));

        hotkeys.update(HotkeyTarget::Toggle, "Alt+G").unwrap();

        assert!(hotkeys.is_bound(HotkeyTarget::Toggle));
        assert_eq!(hotkeys.current().toggle, "Alt+G");
    }

    #[test]
    fn test_unregister_all_releases_everything() {
        let fake = FakeRegistrar::default();
        let mut hotkeys = bindings(&fake, None);
        hotkeys.register_defaults();

        hotkeys.unregister_all();

        assert!(fake.active().is_empty());
        assert!(!hotkeys.is_bound(HotkeyTarget::Toggle));
        assert!(!hotkeys.is_bound(HotkeyTarget::AddFolder));
    }
}
