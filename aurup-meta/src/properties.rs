//! `source.properties` side-file generation
//!
//! Android SDK packages ship a `source.properties` file describing the
//! installed component. Recipes that track one regenerate it from the
//! selected item on every update.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::item::PackageItem;

/// Item attribute path to property name.
pub const PROPERTY_MAPPING: &[(&str, &str)] = &[
    ("abi", "SystemImage.Abi"),
    ("add_on.vendor_display", "Addon.VendorDisplay"),
    ("add_on.vendor_id", "Addon.VendorId"),
    ("api_level", "AndroidVersion.ApiLevel"),
    ("description", "Pkg.Desc"),
    ("layoutlib.api", "Layoutlib.Api"),
    ("layoutlib.revision", "Layoutlib.Revision"),
    ("license.content", "Pkg.License"),
    ("license.name", "Pkg.LicenseRef"),
    ("min_tools_rev.major", "Platform.MinToolsRev"),
    ("name_display", "Addon.NameDisplay"),
    ("name_id", "Addon.NameId"),
    ("package_repo_url", "Pkg.SourceUrl"),
    ("revision", "Pkg.Revision"),
    ("tag_display", "SystemImage.TagDisplay"),
    ("tag_id", "SystemImage.TagId"),
    ("vendor_display", "Addon.VendorDisplay"),
    ("vendor_id", "Addon.VendorId"),
    ("version", "Platform.Version"),
];

/// Property values of an item, sorted by property name.
///
/// Later mapping entries win when two attributes map to the same property.
pub fn property_values(item: &PackageItem) -> BTreeMap<&'static str, String> {
    let mut values = BTreeMap::new();
    for (path, property) in PROPERTY_MAPPING {
        if let Some(value) = attribute_value(item, path) {
            values.insert(*property, value);
        }
    }
    values
}

fn attribute_value(item: &PackageItem, path: &str) -> Option<String> {
    match path {
        "license.content" => Some(item.license.content.clone()),
        "license.name" => Some(item.license.name.clone()),
        "package_repo_url" => Some(item.source_repo_url.to_string()),
        _ => match item.lookup(path)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Object(revision) if path == "revision" => {
                let part = |name: &str| {
                    revision
                        .get(name)
                        .and_then(Value::as_str)
                        .unwrap_or("0")
                        .to_string()
                };
                Some(format!("{}.{}.{}", part("major"), part("minor"), part("micro")))
            }
            _ => None,
        },
    }
}

/// Render the side-file, headed by a generation timestamp comment.
pub fn source_properties(item: &PackageItem, generated_at: DateTime<Utc>) -> String {
    let mut out = format!("#{}", generated_at.format("%c"));
    for (key, value) in property_values(item) {
        out.push('\n');
        out.push_str(&escape(key));
        out.push('=');
        out.push_str(&escape(&value));
    }
    out
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '#' | '!' | '=' | ':' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
