//! Latest-item selection per logical package

use indexmap::IndexMap;

use crate::item::PackageItem;
use crate::naming::PackageNameResolver;

/// Ordering key of a release.
///
/// Keys of the same shape compare as tuples. Keys of different shapes never
/// meet in practice; if they do they order by shape instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VersionKey {
    Revision(u64),
    ApiLevel(u64, u64),
    Semantic(u64, u64, u64),
}

/// Drop items that should never become recipe updates.
pub fn retain_candidates(items: Vec<PackageItem>, excluded_types: &[String]) -> Vec<PackageItem> {
    items
        .into_iter()
        .filter(|item| {
            !item.is_obsolete() && !excluded_types.iter().any(|t| *t == item.package_type)
        })
        .collect()
}

/// Groups items by package name and keeps the newest of each group.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    resolver: PackageNameResolver,
    excluded_codenames: Vec<String>,
}

impl Selector {
    pub fn new(resolver: PackageNameResolver) -> Self {
        Self {
            resolver,
            excluded_codenames: Vec::new(),
        }
    }

    pub fn with_excluded_codenames(mut self, codenames: Vec<String>) -> Self {
        self.excluded_codenames = codenames;
        self
    }

    /// Package name to latest item, in first-seen group order.
    ///
    /// Among equal keys the first item wins. Items whose name cannot be
    /// computed are skipped.
    pub fn select_latest(&self, items: Vec<PackageItem>) -> IndexMap<String, PackageItem> {
        let mut latest: IndexMap<String, PackageItem> = IndexMap::new();

        for item in items {
            if item
                .attr("codename")
                .is_some_and(|codename| self.excluded_codenames.iter().any(|c| c == codename))
            {
                continue;
            }

            let name = match self.resolver.package_name(&item) {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!("Skipping {} item: {}", item.package_type, e);
                    continue;
                }
            };

            match latest.get_mut(&name) {
                Some(current) if item.version.key() > current.version.key() => *current = item,
                Some(_) => {}
                None => {
                    latest.insert(name, item);
                }
            }
        }

        latest
    }
}
