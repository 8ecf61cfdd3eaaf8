//! Package and recipe directory naming

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::item::PackageItem;
use crate::{Error, Result};

const DEFAULT_TAG: &str = "default";

/// How `armeabi-v7a` is spelled in package names.
///
/// Published recipes use both spellings; `current` yields `armv7a-eabi`,
/// `legacy` yields `armv7-eabi`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiMapping {
    #[default]
    Current,
    Legacy,
}

impl AbiMapping {
    pub fn normalize_abi(self, abi: &str) -> String {
        match (abi, self) {
            ("armeabi-v7a", AbiMapping::Current) => "armv7a-eabi".to_string(),
            ("armeabi-v7a", AbiMapping::Legacy) => "armv7-eabi".to_string(),
            _ => abi.to_string(),
        }
    }
}

impl FromStr for AbiMapping {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "current" => Ok(AbiMapping::Current),
            "legacy" => Ok(AbiMapping::Legacy),
            other => Err(format!("unknown ABI mapping {:?} (current, legacy)", other)),
        }
    }
}

impl fmt::Display for AbiMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiMapping::Current => write!(f, "current"),
            AbiMapping::Legacy => write!(f, "legacy"),
        }
    }
}

/// Computes logical package names for normalized items.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageNameResolver {
    abi_mapping: AbiMapping,
}

impl PackageNameResolver {
    pub fn new(abi_mapping: AbiMapping) -> Self {
        Self { abi_mapping }
    }

    /// Logical, hyphen-separated package name of an item.
    pub fn package_name(&self, item: &PackageItem) -> Result<String> {
        let name = match item.package_type.as_str() {
            "system_image" => {
                let abi = item
                    .attr("abi")
                    .ok_or_else(|| Error::schema("system image without abi"))?;
                let abi = self.abi_mapping.normalize_abi(abi);
                match item.attr("tag_id") {
                    None | Some(DEFAULT_TAG) => format!("{}_{}", abi, item.package_type),
                    Some(tag) => format!("{}_{}", tag, abi),
                }
            }
            "add_on" => item
                .attr("name_id")
                .or_else(|| item.attr("tag_id"))
                .ok_or_else(|| Error::schema("add-on without name id"))?
                .to_string(),
            "source" => "sources".to_string(),
            other => other.to_string(),
        };

        Ok(name.replace('_', "-"))
    }
}

/// Recipe directory for a logical package name.
pub fn recipe_dir_name(package_name: &str) -> String {
    let name = match package_name {
        "armeabi-v7a-system-image" => "armv7a-eabi-system-image",
        other => other,
    };
    format!("android-{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::fixtures::item;
    use crate::item::PackageVersion;
    use serde_json::json;

    fn image(abi: &str, tag: Option<&str>) -> PackageItem {
        let mut attributes = json!({ "abi": abi });
        if let Some(tag) = tag {
            attributes["tag_id"] = json!(tag);
        }
        item(
            "system_image",
            attributes,
            PackageVersion::ApiLevel {
                api_level: 30,
                revision: 1,
            },
        )
    }

    #[test]
    fn test_system_image_names() {
        let legacy = PackageNameResolver::new(AbiMapping::Legacy);
        let current = PackageNameResolver::default();

        let armv7 = image("armeabi-v7a", Some("default"));
        assert_eq!(legacy.package_name(&armv7).unwrap(), "armv7-eabi-system-image");
        assert_eq!(current.package_name(&armv7).unwrap(), "armv7a-eabi-system-image");
        assert_eq!(
            recipe_dir_name(&legacy.package_name(&armv7).unwrap()),
            "android-armv7-eabi-system-image"
        );

        assert_eq!(
            current.package_name(&image("x86_64", None)).unwrap(),
            "x86-64-system-image"
        );
        assert_eq!(
            current.package_name(&image("x86", Some("google_apis"))).unwrap(),
            "google-apis-x86"
        );
    }

    #[test]
    fn test_other_names() {
        let resolver = PackageNameResolver::default();
        let version = PackageVersion::Revision(1);

        let addon = item("add_on", json!({"name_id": "google_apis"}), version);
        assert_eq!(resolver.package_name(&addon).unwrap(), "google-apis");

        let modern_addon = item("add_on", json!({"tag_id": "google_gdk"}), version);
        assert_eq!(resolver.package_name(&modern_addon).unwrap(), "google-gdk");

        let source = item("source", json!({}), version);
        assert_eq!(resolver.package_name(&source).unwrap(), "sources");

        let tools = item("platform_tool", json!({}), version);
        assert_eq!(resolver.package_name(&tools).unwrap(), "platform-tool");
    }

    #[test]
    fn test_missing_identifiers() {
        let resolver = PackageNameResolver::default();
        let version = PackageVersion::Revision(1);
        assert!(resolver
            .package_name(&item("system_image", json!({}), version))
            .is_err());
        assert!(resolver
            .package_name(&item("add_on", json!({}), version))
            .is_err());
    }

    #[test]
    fn test_recipe_dir_name() {
        assert_eq!(recipe_dir_name("platform"), "android-platform");
        assert_eq!(
            recipe_dir_name("armeabi-v7a-system-image"),
            "android-armv7a-eabi-system-image"
        );
    }

    #[test]
    fn test_abi_mapping_parse() {
        assert_eq!("legacy".parse::<AbiMapping>().unwrap(), AbiMapping::Legacy);
        assert_eq!("Current".parse::<AbiMapping>().unwrap(), AbiMapping::Current);
        assert!("other".parse::<AbiMapping>().is_err());
    }
}
