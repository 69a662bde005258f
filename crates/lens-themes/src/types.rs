//! Core types for lens-themes

use crate::error::ThemeError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which family of theme packages a root holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Icons,
    Cursors,
}

impl FromStr for ThemeKind {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "icons" | "icon" => Ok(ThemeKind::Icons),
            "cursors" | "cursor" => Ok(ThemeKind::Cursors),
            _ => Err(ThemeError::UnknownKind(s.to_string())),
        }
    }
}

impl ThemeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeKind::Icons => "icons",
            ThemeKind::Cursors => "cursors",
        }
    }
}

impl fmt::Display for ThemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered candidate theme directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ThemePackage {
    /// Unique name within one root scan, also the dedup key.
    pub identity: String,
    /// Directory the package was found at (as encountered, not canonicalized).
    pub root_path: PathBuf,
    pub kind: ThemeKind,
    /// `Name=` from `index.theme`, else the identity.
    pub display_name: String,
    pub description: Option<String>,
    pub author: Option<String>,
}

impl ThemePackage {
    pub fn new(identity: impl Into<String>, root_path: impl Into<PathBuf>, kind: ThemeKind) -> Self {
        let identity = identity.into();
        Self {
            display_name: identity.clone(),
            identity,
            root_path: root_path.into(),
            kind,
            description: None,
            author: None,
        }
    }
}

/// Semantic bucket a role's asset lives under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Places,
    Devices,
    Mimetypes,
    Apps,
    Cursors,
}

impl Category {
    /// Directory names accepted for this bucket. The first is canonical.
    pub fn dir_names(&self) -> &'static [&'static str] {
        match self {
            Category::Places => &["places"],
            Category::Devices => &["devices"],
            Category::Mimetypes => &["mimetypes", "mimes"],
            Category::Apps => &["apps", "applications"],
            Category::Cursors => &["cursors"],
        }
    }

    /// Case-insensitive match of a single path component.
    pub fn matches(&self, component: &str) -> bool {
        self.dir_names()
            .iter()
            .any(|name| name.eq_ignore_ascii_case(component))
    }
}

/// A fixed visual slot every preview tries to fill.
#[derive(Debug, PartialEq, Eq)]
pub struct CanonicalRole {
    pub id: &'static str,
    pub label: &'static str,
    pub category: Category,
    /// Primary name first, most specific fallback last.
    pub aliases: &'static [&'static str],
}

/// Where in a package tree an asset was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QualityTier {
    /// `scalable/` or `svg/` directories.
    Vector,
    /// Fixed pixel band, effective size (`@2x` already applied).
    Raster(u32),
    /// Directly under a category directory with no size qualifier.
    Direct,
}

impl QualityTier {
    /// Sort key, higher is better.
    pub fn score(&self) -> u32 {
        match self {
            QualityTier::Vector => 10_000,
            QualityTier::Raster(px) => (*px).min(9_999),
            QualityTier::Direct => 1,
        }
    }

    pub fn is_vector_class(&self) -> bool {
        matches!(self, QualityTier::Vector)
    }
}

impl PartialOrd for QualityTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualityTier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score().cmp(&other.score())
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Vector => f.write_str("scalable"),
            QualityTier::Raster(px) => write!(f, "{}px", px),
            QualityTier::Direct => f.write_str("direct"),
        }
    }
}

/// Best file found for one role in one package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub role: &'static CanonicalRole,
    pub file_path: PathBuf,
    pub tier: QualityTier,
    pub is_vector: bool,
}
