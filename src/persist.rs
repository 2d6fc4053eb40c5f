use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::state::Delta;

const PREFS_DIR: &str = "olive_terminal";
const PREFS_FILE: &str = "preferences.json";
const PREFS_VERSION: u32 = 1;

/// Last selections, restored on the next start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub competition_id: Option<i64>,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub club_filter: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PreferencesFile {
    version: u32,
    #[serde(default)]
    preferences: Preferences,
}

impl Preferences {
    pub fn load() -> Self {
        preferences_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing, unreadable or outdated files give defaults.
    pub fn load_from(path: &Path) -> Self {
        let Ok(raw) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<PreferencesFile>(&raw) {
            Ok(file) if file.version == PREFS_VERSION => file.preferences,
            _ => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = preferences_path().context("no config directory")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let file = PreferencesFile {
            version: PREFS_VERSION,
            preferences: self.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("failed to encode preferences")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn set_competition(&mut self, competition_id: i64) -> bool {
        if self.competition_id == Some(competition_id) {
            return false;
        }
        self.competition_id = Some(competition_id);
        true
    }

    /// Picks up selections reported by the sessions. Returns true when something changed.
    pub fn absorb(&mut self, delta: &Delta) -> bool {
        match delta {
            Delta::ClassSelected { class_name, .. } if *class_name != self.class_name => {
                self.class_name = class_name.clone();
                true
            }
            Delta::ClubFilterApplied { filter, .. } if *filter != self.club_filter => {
                self.club_filter = filter.clone();
                true
            }
            _ => false,
        }
    }
}

pub fn preferences_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CONFIG_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(PREFS_DIR).join(PREFS_FILE));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(PREFS_DIR)
            .join(PREFS_FILE),
    )
}
