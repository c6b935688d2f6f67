//! Per-profile settings: appearance, notifications and privacy.

use crate::storage::{self, SharedStore, PREFERENCES_KEY};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Everyone,
    #[default]
    Friends,
    Nobody,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub dark_mode: bool,
    pub notifications: bool,
    pub read_receipts: bool,
    pub sound_effects: bool,
    /// Who may see the profile
    pub privacy: Visibility,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            notifications: true,
            read_receipts: true,
            sound_effects: true,
            privacy: Visibility::Friends,
        }
    }
}

pub struct PreferencesStore {
    storage: SharedStore,
}

impl PreferencesStore {
    pub fn new(storage: SharedStore) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Preferences {
        storage::load_or_default(self.storage.as_ref(), PREFERENCES_KEY)
    }

    pub fn save(&self, preferences: &Preferences) {
        storage::save_or_warn(self.storage.as_ref(), PREFERENCES_KEY, preferences);
        info!(dark_mode = preferences.dark_mode, privacy = ?preferences.privacy, "preferences saved");
    }
}
