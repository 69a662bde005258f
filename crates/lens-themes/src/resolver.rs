//! Representative asset resolution.
//!
//! Package authors ship the same logical icon in many places at many
//! qualities. Resolution walks the tree once, ranks every category directory
//! by [`QualityTier`] and then looks up role aliases in rank order, so the
//! sharpest available source is picked consistently.

use crate::assets::{
    RASTER_FIRST, VECTOR_FIRST, classify_tier, dir_has_real_asset, is_blacklisted_band,
    is_vector_extension,
};
use crate::error::readable;
use crate::roles::roles_for;
use crate::types::{CanonicalRole, Category, QualityTier, ResolvedAsset, ThemeKind, ThemePackage};
use crate::validator::MAX_WALK_DEPTH;
use log::debug;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Unqualified directories deeper than this are not considered.
const DIRECT_MAX_DEPTH: usize = 2;

/// A directory eligible to supply assets, with its rank.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateDir {
    pub path: PathBuf,
    pub tier: QualityTier,
    /// Path components relative to the package root.
    pub components: Vec<String>,
}

impl CandidateDir {
    fn holds(&self, category: Category) -> bool {
        self.components.iter().any(|c| category.matches(c))
    }
}

/// Resolver bound to one package; the tree is walked once at construction.
pub struct ThemeResolver<'a> {
    package: &'a ThemePackage,
    candidates: Vec<CandidateDir>,
}

impl<'a> ThemeResolver<'a> {
    pub fn new(package: &'a ThemePackage) -> Self {
        let candidates = match package.kind {
            ThemeKind::Icons => collect_candidates(package),
            ThemeKind::Cursors => Vec::new(),
        };
        debug!(
            "Theme {}: {} candidate director{}",
            package.identity,
            candidates.len(),
            if candidates.len() == 1 { "y" } else { "ies" }
        );
        Self {
            package,
            candidates,
        }
    }

    /// Ranked candidate directories, best first.
    pub fn candidates(&self) -> &[CandidateDir] {
        &self.candidates
    }

    /// Best file for `role`, or `None` when the theme has no match.
    pub fn resolve(&self, role: &'static CanonicalRole) -> Option<ResolvedAsset> {
        let found = match self.package.kind {
            ThemeKind::Icons => self.resolve_icon(role),
            ThemeKind::Cursors => self.resolve_cursor(role),
        };

        if found.is_none() {
            debug!("Theme {}: no asset for role {}", self.package.identity, role.id);
        }
        found
    }

    /// Resolve every canonical role of the package's kind, omitting misses.
    pub fn resolve_all(&self) -> Vec<ResolvedAsset> {
        roles_for(self.package.kind)
            .iter()
            .filter_map(|role| self.resolve(role))
            .collect()
    }

    fn resolve_icon(&self, role: &'static CanonicalRole) -> Option<ResolvedAsset> {
        for dir in self.candidates.iter().filter(|d| d.holds(role.category)) {
            let extensions = if dir.tier.is_vector_class() {
                VECTOR_FIRST
            } else {
                RASTER_FIRST
            };

            for alias in role.aliases {
                for ext in extensions {
                    let path = dir.path.join(format!("{}.{}", alias, ext));
                    if path.is_file() {
                        return Some(ResolvedAsset {
                            role,
                            file_path: path,
                            tier: dir.tier,
                            is_vector: is_vector_extension(ext),
                        });
                    }
                }
            }
        }
        None
    }

    fn resolve_cursor(&self, role: &'static CanonicalRole) -> Option<ResolvedAsset> {
        let dir = self.package.root_path.join("cursors");
        role.aliases
            .iter()
            .map(|alias| dir.join(alias))
            .find(|path| path.is_file())
            .map(|file_path| ResolvedAsset {
                role,
                file_path,
                tier: QualityTier::Direct,
                is_vector: false,
            })
    }
}

/// Resolve a single role against a package.
pub fn resolve(package: &ThemePackage, role: &'static CanonicalRole) -> Option<ResolvedAsset> {
    ThemeResolver::new(package).resolve(role)
}

fn collect_candidates(package: &ThemePackage) -> Vec<CandidateDir> {
    let root = &package.root_path;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .max_depth(MAX_WALK_DEPTH)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            !(e.file_type().is_dir() && is_blacklisted_band(&e.file_name().to_string_lossy()))
        });

    let mut candidates = Vec::new();

    for entry in walker.filter_map(readable) {
        if !entry.file_type().is_dir() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let components: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();

        let in_category = components.iter().any(|c| {
            roles_for(package.kind)
                .iter()
                .any(|role| role.category.matches(c))
        });
        if !in_category {
            continue;
        }

        let refs: Vec<&str> = components.iter().map(String::as_str).collect();
        let Some(tier) = classify_tier(&refs, DIRECT_MAX_DEPTH) else {
            continue;
        };

        if !dir_has_real_asset(entry.path()) {
            continue;
        }

        candidates.push(CandidateDir {
            path: entry.path().to_path_buf(),
            tier,
            components,
        });
    }

    // stable: equal tiers keep walk (file-name) order
    candidates.sort_by(|a, b| b.tier.cmp(&a.tier));
    candidates
}
