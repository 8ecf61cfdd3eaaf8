//! aurup-meta: upstream release metadata for recipe updates
//!
//! This crate provides:
//! - Raw XML document trees and Android SDK repository normalization
//!   across both schema generations
//! - Package naming and latest-release selection
//! - `source.properties` side-file generation and digests
//! - Debian `.dsc` and PyPI JSON metadata
//! - Blocking retrieval of upstream documents

pub mod checksum;
pub mod dsc;
pub mod error;
pub mod fetch;
pub mod item;
pub mod naming;
pub mod normalize;
pub mod properties;
pub mod pypi;
pub mod select;
pub mod sites;
pub mod tree;

pub use error::{Error, Result};
pub use fetch::{FetchedDocument, UpstreamClient, UrlPattern};
pub use item::{Archive, Checksum, License, PackageItem, PackageVersion};
pub use naming::{recipe_dir_name, AbiMapping, PackageNameResolver};
pub use normalize::normalize_document;
pub use select::{retain_candidates, Selector, VersionKey};
