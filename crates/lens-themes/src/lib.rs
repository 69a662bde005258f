//! lens-themes: theme package discovery and asset resolution.
//!
//! Provides:
//! - One-level scanning of theme roots for icon and cursor packages
//! - Completeness validation (required category buckets with real assets)
//! - Priority-ordered resolution of a fixed set of canonical roles
//! - XDG default roots and `index.theme` metadata

pub mod assets;
pub mod error;
pub mod paths;
pub mod resolver;
pub mod roles;
pub mod scanner;
pub mod types;
pub mod validator;

pub use error::ThemeError;
pub use paths::{ThemeMetadata, default_theme_roots, parse_theme_index, root_label};
pub use resolver::{CandidateDir, ThemeResolver, resolve};
pub use roles::{CURSOR_ROLES, ICON_ROLES, role_by_id, roles_for};
pub use scanner::{has_package_marker, scan_root};
pub use types::{CanonicalRole, Category, QualityTier, ResolvedAsset, ThemeKind, ThemePackage};
pub use validator::{filter_complete, is_complete};

use std::path::Path;

/// Scan a root and keep only complete packages, in scan order.
pub fn scan_validated(root: &Path, kind: ThemeKind) -> Vec<ThemePackage> {
    filter_complete(scan_root(root, kind))
}
