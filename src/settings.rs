use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::LocalStore;

pub const SETTINGS_KEY: &str = "display-settings";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

/// Display and accessibility preferences. Stored documents may carry any
/// subset of the fields; missing ones keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub high_contrast: bool,
    pub reduced_motion: bool,
    pub font_size: FontSize,
    pub screen_reader: bool,
    pub keyboard_navigation: bool,
    pub focus_visible: bool,
    pub announcements: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            high_contrast: false,
            reduced_motion: false,
            font_size: FontSize::Medium,
            screen_reader: false,
            keyboard_navigation: true,
            focus_visible: true,
            announcements: true,
        }
    }
}

impl DisplaySettings {
    /// An unreadable or missing document falls back to defaults.
    pub fn load(store: &LocalStore) -> Self {
        match store.get(SETTINGS_KEY) {
            Ok(Some(settings)) => settings,
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to load display settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &LocalStore) -> Result<()> {
        store.put(SETTINGS_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_navigation_aids_only() {
        let settings = DisplaySettings::default();
        assert!(!settings.high_contrast);
        assert!(!settings.reduced_motion);
        assert!(!settings.screen_reader);
        assert_eq!(settings.font_size, FontSize::Medium);
        assert!(settings.keyboard_navigation);
        assert!(settings.focus_visible);
        assert!(settings.announcements);
    }

    #[test]
    fn partial_documents_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        std::fs::write(
            dir.path().join(format!("{SETTINGS_KEY}.json")),
            br#"{"high_contrast": true, "font_size": "extra-large"}"#,
        )
        .unwrap();

        let settings = DisplaySettings::load(&store);
        assert!(settings.high_contrast);
        assert_eq!(settings.font_size, FontSize::ExtraLarge);
        assert!(settings.keyboard_navigation);
        assert!(settings.announcements);
    }

    #[test]
    fn corrupt_documents_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();
        std::fs::write(dir.path().join(format!("{SETTINGS_KEY}.json")), b"{oops").unwrap();

        assert_eq!(DisplaySettings::load(&store), DisplaySettings::default());
    }

    #[test]
    fn settings_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        let mut settings = DisplaySettings::default();
        settings.reduced_motion = true;
        settings.font_size = FontSize::Small;
        settings.save(&store).unwrap();

        assert_eq!(DisplaySettings::load(&store), settings);
    }
}
