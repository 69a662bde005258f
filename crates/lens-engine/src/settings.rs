//! Persisted user settings.
//!
//! A small JSON document in the user config dir. Writes go through a temp
//! file in the same directory and are renamed over the old file, so a
//! crash never leaves a half-written document behind.

use crate::error::SettingsError;
use lens_preview::PreviewSize;
use lens_themes::{ThemeKind, default_theme_roots, root_label};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// A theme root shown in the directory list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootEntry {
    pub name: String,
    pub path: PathBuf,
}

impl RootEntry {
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: root_label(&path),
            path,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub roots: Vec<RootEntry>,
    pub target_size: PreviewSize,
    pub max_concurrent: usize,
    pub batch_size: usize,
    pub kind: ThemeKind,
}

impl Default for Settings {
    fn default() -> Self {
        let kind = ThemeKind::default();
        Self {
            roots: default_theme_roots(kind)
                .into_iter()
                .map(RootEntry::for_path)
                .collect(),
            target_size: PreviewSize::default(),
            max_concurrent: 1,
            batch_size: 8,
            kind,
        }
    }
}

impl Settings {
    pub fn is_default_root(&self, path: &Path) -> bool {
        default_theme_roots(self.kind).iter().any(|r| r == path)
    }

    /// Make sure every built-in root is listed, in front of user roots.
    pub fn ensure_default_roots(&mut self) {
        let mut roots: Vec<RootEntry> = default_theme_roots(self.kind)
            .into_iter()
            .map(RootEntry::for_path)
            .collect();
        for entry in self.roots.drain(..) {
            if !roots.iter().any(|r| r.path == entry.path) {
                roots.push(entry);
            }
        }
        self.roots = roots;
    }

    /// Returns false if the root was already listed.
    pub fn add_root(&mut self, path: &Path) -> bool {
        if self.roots.iter().any(|r| r.path == path) {
            return false;
        }
        self.roots.push(RootEntry::for_path(path));
        true
    }

    /// Remove a user-added root. Built-in roots are refused.
    pub fn remove_root(&mut self, path: &Path) -> Result<bool, SettingsError> {
        if self.is_default_root(path) {
            return Err(SettingsError::DefaultRoot(path.to_path_buf()));
        }
        let before = self.roots.len();
        self.roots.retain(|r| r.path != path);
        Ok(self.roots.len() != before)
    }

    pub fn root_paths(&self) -> impl Iterator<Item = &Path> {
        self.roots.iter().map(|r| r.path.as_path())
    }
}

/// Location of the settings document on disk.
#[derive(Clone, Debug)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/themelens/settings.json`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("themelens")
            .join("settings.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults when the file is missing or
    /// unreadable. Built-in roots are always present in the result.
    pub fn load(&self) -> Settings {
        let mut settings = match self.try_load() {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!("No settings at {}, using defaults", self.path.display());
                Settings::default()
            }
            Err(e) => {
                warn!("Ignoring settings at {}: {}", self.path.display(), e);
                Settings::default()
            }
        };
        settings.ensure_default_roots();
        settings
    }

    pub fn try_load(&self) -> Result<Option<Settings>, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let json = serde_json::to_vec_pretty(settings)?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        temp.write_all(&json)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)?;

        info!("Saved settings to {}", self.path.display());
        Ok(())
    }
}
