//! Canonical package item model
//!
//! Every upstream schema generation is normalized into [`PackageItem`]s so
//! that naming, selection and recipe updates never look at raw documents.

use serde_json::{Map, Value};
use url::Url;

use crate::select::VersionKey;

/// Release version of an item, in whichever shape the upstream uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageVersion {
    /// Platform-like items: API level plus revision
    ApiLevel { api_level: u64, revision: u64 },
    /// Tool-like items with a structured revision
    Semantic { major: u64, minor: u64, micro: u64 },
    /// A bare revision number
    Revision(u64),
}

impl PackageVersion {
    pub fn key(&self) -> VersionKey {
        match *self {
            PackageVersion::ApiLevel {
                api_level,
                revision,
            } => VersionKey::ApiLevel(api_level, revision),
            PackageVersion::Semantic {
                major,
                minor,
                micro,
            } => VersionKey::Semantic(major, minor, micro),
            PackageVersion::Revision(revision) => VersionKey::Revision(revision),
        }
    }
}

/// The single checksum retained for an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksum {
    pub algorithm: String,
    pub digest: String,
}

/// One downloadable artifact of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// Possibly relative to the document URL
    pub url: String,
    /// Target OS, `any` when the upstream does not restrict it
    pub host_os: String,
    pub checksum: Checksum,
}

impl Archive {
    pub fn supports(&self, host_os: &str) -> bool {
        self.host_os == "any" || self.host_os == host_os
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    pub name: String,
    pub content: String,
}

/// One upstream release variant.
#[derive(Debug, Clone)]
pub struct PackageItem {
    /// Component kind (`platform`, `system_image`, `add_on`, `source`, ...)
    pub package_type: String,
    /// Remaining normalized attributes (`abi`, `tag_id`, `revision`, ...)
    pub attributes: Map<String, Value>,
    pub version: PackageVersion,
    pub archives: Vec<Archive>,
    pub license: License,
    /// Document the item was read from
    pub source_repo_url: Url,
}

impl PackageItem {
    /// String attribute by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    /// Attribute by dotted path (`add_on.vendor_id`).
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut value = self.attributes.get(parts.next()?)?;
        for part in parts {
            value = value.as_object()?.get(part)?;
        }
        Some(value)
    }

    pub fn is_obsolete(&self) -> bool {
        match self.attributes.get("obsolete") {
            None => false,
            Some(Value::String(flag)) => flag != "false",
            Some(_) => true,
        }
    }

    /// First archive usable on `host_os`.
    pub fn compatible_archive(&self, host_os: &str) -> Option<&Archive> {
        self.archives.iter().find(|archive| archive.supports(host_os))
    }

    /// Absolute download URL of an archive.
    pub fn archive_url(&self, archive: &Archive) -> Result<Url, url::ParseError> {
        self.source_repo_url.join(&archive.url)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn item(package_type: &str, attributes: Value, version: PackageVersion) -> PackageItem {
        PackageItem {
            package_type: package_type.to_string(),
            attributes: attributes.as_object().cloned().unwrap_or_default(),
            version,
            archives: vec![Archive {
                url: "pkg-linux.zip".to_string(),
                host_os: "linux".to_string(),
                checksum: Checksum {
                    algorithm: "sha1".to_string(),
                    digest: "0123456789abcdef".to_string(),
                },
            }],
            license: License {
                name: "android-sdk-license".to_string(),
                content: "Terms".to_string(),
            },
            source_repo_url: Url::parse("https://dl.example.com/android/repository/repository-12.xml")
                .unwrap(),
        }
    }
}
