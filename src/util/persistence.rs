use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use log::{debug, warn};
use serde_json::Error as SerdeError;

use crate::domain::SessionSettings;

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "CraftValueScanner";
const APP_NAME: &str = "CraftValueScanner";

fn settings_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Stored settings, or defaults when none are saved or the file is unreadable.
pub fn load_settings() -> SessionSettings {
    settings_file()
        .and_then(|path| load_settings_from(&path))
        .unwrap_or_default()
}

pub fn load_settings_from(path: &Path) -> Option<SessionSettings> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => {
            debug!("[settings] Nothing loaded from {}: {err}", path.display());
            return None;
        }
    };
    match serde_json::from_str(&data) {
        Ok(settings) => Some(settings),
        Err(err) => {
            warn!("[settings] Ignoring unreadable {}: {err}", path.display());
            None
        }
    }
}

pub fn save_settings(settings: &SessionSettings) -> Result<(), PersistSaveError> {
    let path = settings_file().ok_or(PersistSaveError::StorageUnavailable)?;
    save_settings_to(&path, settings)
}

pub fn save_settings_to(path: &Path, settings: &SessionSettings) -> Result<(), PersistSaveError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    debug!("[settings] Saved to {}", path.display());
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum PersistSaveError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketLocation, Quality};

    #[test]
    fn settings_survive_a_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("settings.json");

        let mut settings = SessionSettings {
            refresh_interval_ms: 30_000,
            selected_quality: Quality::Excellent,
            ..SessionSettings::default()
        };
        settings.set_location_enabled(MarketLocation::BlackMarket, false);
        settings.set_note("T6_2H_BOW", "check Black Market first");

        save_settings_to(&path, &settings).expect("saved");
        assert_eq!(load_settings_from(&path), Some(settings));
    }

    #[test]
    fn missing_or_corrupt_files_load_nothing() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("settings.json");
        assert_eq!(load_settings_from(&path), None);

        fs::write(&path, "[1, 2").expect("write");
        assert_eq!(load_settings_from(&path), None);
    }
}
