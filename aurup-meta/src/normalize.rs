//! Android SDK repository normalization
//!
//! Two incompatible schema generations are in circulation:
//!
//! - legacy documents (`sdk:sdk-repository`, `sdk:sdk-addon`, ...) where every
//!   package is a namespaced child of the root (`sdk:platform`,
//!   `sdk:system-image`) and checksums carry a `type` attribute
//! - modern documents where packages are `remotePackage` elements with a
//!   `type-details` block and checksums live under `archive/complete`
//!
//! A document-shape check picks the variant; both produce the same
//! [`PackageItem`]s. Any structural problem fails the whole document.

use std::collections::HashMap;

use serde_json::{Map, Value};
use url::Url;

use crate::item::{Archive, Checksum, License, PackageItem, PackageVersion};
use crate::tree::{self, TEXT_KEY};
use crate::{Error, Result};

const MODERN_ROOTS: &[&str] = &["repo:sdk-addon", "addon:sdk-addon", "sys-img:sdk-sys-img"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModernKind {
    Repository,
    SysImg,
    Addon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schema<'a> {
    Legacy { prefix: &'a str },
    Modern { kind: ModernKind },
}

impl<'a> Schema<'a> {
    fn detect(root_name: &'a str, root: &Map<String, Value>) -> Self {
        if root.contains_key("remotePackage") || MODERN_ROOTS.contains(&root_name) {
            let local = local_name(root_name);
            let kind = if local.contains("sys-img") {
                ModernKind::SysImg
            } else if local.contains("addon") {
                ModernKind::Addon
            } else {
                ModernKind::Repository
            };
            Schema::Modern { kind }
        } else {
            let prefix = root_name.split_once(':').map_or("", |(prefix, _)| prefix);
            Schema::Legacy { prefix }
        }
    }

    fn is_modern(&self) -> bool {
        matches!(self, Schema::Modern { .. })
    }
}

/// License texts of one document, keyed by id.
struct LicenseTable(HashMap<String, String>);

impl LicenseTable {
    fn collect(root: &Map<String, Value>) -> Result<Self> {
        let mut licenses = HashMap::new();
        for (key, value) in root {
            if key.starts_with('@') || local_name(key) != "license" {
                continue;
            }
            for node in as_list(value) {
                let id = node
                    .get("@id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| Error::schema("license without id"))?;
                let content = node.get(TEXT_KEY).and_then(Value::as_str).unwrap_or("");
                licenses.insert(id.to_string(), content.to_string());
            }
        }
        Ok(Self(licenses))
    }

    /// Replace the item's `uses_license` reference with the license itself.
    fn resolve(&self, fields: &mut Map<String, Value>) -> Result<License> {
        let reference = fields
            .remove("uses_license")
            .and_then(|node| node.get("ref").and_then(Value::as_str).map(str::to_string))
            .ok_or_else(|| Error::schema("item has no license reference"))?;

        let content = self
            .0
            .get(&reference)
            .ok_or_else(|| Error::schema(format!("unknown license reference {}", reference)))?;

        Ok(License {
            name: reference,
            content: content.clone(),
        })
    }
}

/// Normalize one parsed repository document read from `source_url`.
pub fn normalize_document(document: &Value, source_url: &Url) -> Result<Vec<PackageItem>> {
    let (root_name, root) = tree::root(document)?;
    let root = root
        .as_object()
        .ok_or_else(|| Error::schema(format!("root element {} is empty", root_name)))?;

    let schema = Schema::detect(root_name, root);
    tracing::debug!("{} uses the {:?} layout", source_url, schema);

    let licenses = LicenseTable::collect(root)?;
    let mut items = Vec::new();

    match schema {
        Schema::Legacy { prefix } => {
            for (key, value) in root {
                if !is_legacy_item_key(key, prefix) {
                    continue;
                }
                let package_type = normalize_key(key);
                for node in as_list(value) {
                    let fields = into_fields(normalize_node(node)?, &package_type)?;
                    items.push(build_item(
                        package_type.clone(),
                        fields,
                        schema,
                        &licenses,
                        source_url,
                    )?);
                }
            }
        }
        Schema::Modern { kind } => {
            for node in root.get("remotePackage").map(as_list).unwrap_or_default() {
                let mut fields = into_fields(normalize_node(node)?, "remotePackage")?;
                let details_type = merge_type_details(&mut fields);
                let package_type = modern_package_type(
                    details_type.as_deref(),
                    kind,
                    fields.get("path").and_then(Value::as_str),
                )?;
                items.push(build_item(package_type, fields, schema, &licenses, source_url)?);
            }
        }
    }

    Ok(items)
}

/// Fold attributes and children of a raw node into one mapping.
///
/// Keys lose their `@` marker and namespace prefix and use `_` instead of
/// `-`. Namespace declarations are dropped. A node holding both text and
/// child elements is rejected.
pub fn normalize_node(node: &Value) -> Result<Value> {
    match node {
        Value::Object(map) => {
            let has_text = map.contains_key(TEXT_KEY);
            let has_children = map
                .keys()
                .any(|key| !key.starts_with('@') && key != TEXT_KEY);
            if has_text && has_children {
                return Err(Error::schema("node contains both text and child elements"));
            }

            let mut fields = Map::new();
            for (key, value) in map {
                if is_namespace_declaration(key) {
                    continue;
                }
                let name = normalize_key(key);
                if fields.insert(name.clone(), normalize_node(value)?).is_some() {
                    return Err(Error::schema(format!("duplicate field {}", name)));
                }
            }
            Ok(Value::Object(fields))
        }
        Value::Array(nodes) => Ok(Value::Array(
            nodes.iter().map(normalize_node).collect::<Result<_>>()?,
        )),
        other => Ok(other.clone()),
    }
}

pub fn normalize_key(key: &str) -> String {
    if key == TEXT_KEY {
        return key.to_string();
    }
    let key = key.strip_prefix('@').unwrap_or(key);
    local_name(key).replace('-', "_")
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn is_namespace_declaration(key: &str) -> bool {
    key == "@xmlns" || key.starts_with("@xmlns:")
}

fn is_legacy_item_key(key: &str, prefix: &str) -> bool {
    if key.starts_with('@') {
        return false;
    }
    let qualified = prefix.is_empty()
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(':'));
    qualified && local_name(key) != "license"
}

fn as_list(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(values) => values.iter().collect(),
        other => vec![other],
    }
}

fn into_fields(node: Value, what: &str) -> Result<Map<String, Value>> {
    match node {
        Value::Object(fields) => Ok(fields),
        _ => Err(Error::schema(format!("{} element has no fields", what))),
    }
}

/// Merge `type_details` into the item and flatten `tag`/`vendor` groups.
/// Returns the details' `xsi:type`, if any.
fn merge_type_details(fields: &mut Map<String, Value>) -> Option<String> {
    if let Some(Value::Object(details)) = fields.remove("type_details") {
        for (key, value) in details {
            fields.insert(key, value);
        }
    }

    for group in ["tag", "vendor"] {
        match fields.remove(group) {
            Some(Value::Object(inner)) => {
                for (key, value) in inner {
                    fields.insert(format!("{}_{}", group, key), value);
                }
            }
            Some(other) => {
                fields.insert(group.to_string(), other);
            }
            None => {}
        }
    }

    match fields.remove("type") {
        Some(Value::String(details_type)) => Some(details_type),
        _ => None,
    }
}

fn modern_package_type(
    details_type: Option<&str>,
    kind: ModernKind,
    path: Option<&str>,
) -> Result<String> {
    let from_details = details_type.and_then(|t| match local_name(t) {
        "sysImgDetailsType" => Some("system_image"),
        "addonDetailsType" => Some("add_on"),
        "platformDetailsType" => Some("platform"),
        "sourceDetailsType" => Some("source"),
        "extraDetailsType" => Some("extra"),
        _ => None,
    });
    if let Some(package_type) = from_details {
        return Ok(package_type.to_string());
    }

    match kind {
        ModernKind::SysImg => Ok("system_image".to_string()),
        ModernKind::Addon => Ok("add_on".to_string()),
        ModernKind::Repository => path
            .and_then(|p| p.split(';').next())
            .filter(|segment| !segment.is_empty())
            .map(|segment| segment.replace('-', "_"))
            .ok_or_else(|| Error::schema("remotePackage without path")),
    }
}

fn build_item(
    package_type: String,
    mut fields: Map<String, Value>,
    schema: Schema<'_>,
    licenses: &LicenseTable,
    source_url: &Url,
) -> Result<PackageItem> {
    let archives = take_archives(&mut fields, schema)?;
    let license = licenses.resolve(&mut fields)?;
    let version = detect_version(&fields)?;

    Ok(PackageItem {
        package_type,
        attributes: fields,
        version,
        archives,
        license,
        source_repo_url: source_url.clone(),
    })
}

fn take_archives(fields: &mut Map<String, Value>, schema: Schema<'_>) -> Result<Vec<Archive>> {
    let container = match fields.remove("archives") {
        Some(Value::Object(container)) => container,
        Some(_) => return Err(Error::schema("archives must be a single container")),
        None => return Err(Error::schema("item has no archives")),
    };
    if container.len() != 1 {
        return Err(Error::schema("archives must contain only archive nodes"));
    }
    let nodes = container
        .get("archive")
        .ok_or_else(|| Error::schema("archives must contain only archive nodes"))?;

    as_list(nodes)
        .into_iter()
        .map(|node| read_archive(node, schema))
        .collect()
}

fn read_archive(node: &Value, schema: Schema<'_>) -> Result<Archive> {
    let node = node
        .as_object()
        .ok_or_else(|| Error::schema("archive has no fields"))?;

    let host_os = node
        .get("os")
        .or_else(|| node.get("host_os"))
        .and_then(Value::as_str)
        .unwrap_or("any")
        .to_string();

    let (url, checksum) = if schema.is_modern() {
        let complete = node
            .get("complete")
            .and_then(Value::as_object)
            .ok_or_else(|| Error::schema("archive has no complete node"))?;
        (
            string_field(complete, "url")?,
            checksum(complete.get("checksum"), Some("sha1"))?,
        )
    } else {
        (
            string_field(node, "url")?,
            checksum(node.get("checksum"), None)?,
        )
    };

    Ok(Archive {
        url,
        host_os,
        checksum,
    })
}

/// Reduce a checksum node to its single algorithm/digest pair.
fn checksum(node: Option<&Value>, default_algorithm: Option<&str>) -> Result<Checksum> {
    let (algorithm, digest) = match node {
        Some(Value::String(digest)) => (default_algorithm, Some(digest.as_str())),
        Some(Value::Object(map)) => (
            map.get("type").and_then(Value::as_str).or(default_algorithm),
            map.get(TEXT_KEY).and_then(Value::as_str),
        ),
        _ => (None, None),
    };

    match (algorithm, digest) {
        (Some(algorithm), Some(digest)) => Ok(Checksum {
            algorithm: algorithm.to_ascii_lowercase(),
            digest: digest.to_string(),
        }),
        (None, _) => Err(Error::schema("checksum without algorithm")),
        (_, None) => Err(Error::schema("checksum without digest")),
    }
}

fn string_field(map: &Map<String, Value>, name: &str) -> Result<String> {
    map.get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::schema(format!("missing {}", name)))
}

type VersionReader = fn(&Map<String, Value>) -> Option<Result<PackageVersion>>;

/// Tried in order; the first reader that recognizes its fields decides.
const VERSION_READERS: &[VersionReader] = &[api_level_version, structured_version, plain_revision];

fn detect_version(fields: &Map<String, Value>) -> Result<PackageVersion> {
    VERSION_READERS
        .iter()
        .find_map(|read| read(fields))
        .unwrap_or_else(|| Err(Error::schema("item has no revision")))
}

fn api_level_version(fields: &Map<String, Value>) -> Option<Result<PackageVersion>> {
    let api_level = fields.get("api_level")?;
    let revision = fields.get("revision")?;
    Some(api_level_pair(api_level, revision))
}

fn api_level_pair(api_level: &Value, revision: &Value) -> Result<PackageVersion> {
    let revision = match revision {
        Value::Object(structured) => integer_field(structured, "major")?,
        plain => integer(plain, "revision")?,
    };
    Ok(PackageVersion::ApiLevel {
        api_level: integer(api_level, "api_level")?,
        revision,
    })
}

fn structured_version(fields: &Map<String, Value>) -> Option<Result<PackageVersion>> {
    let revision = fields.get("revision")?.as_object()?;
    Some(semantic(revision))
}

fn semantic(revision: &Map<String, Value>) -> Result<PackageVersion> {
    let optional = |name: &str| match revision.get(name) {
        Some(value) => integer(value, name),
        None => Ok(0),
    };
    Ok(PackageVersion::Semantic {
        major: integer_field(revision, "major")?,
        minor: optional("minor")?,
        micro: optional("micro")?,
    })
}

fn plain_revision(fields: &Map<String, Value>) -> Option<Result<PackageVersion>> {
    let revision = fields.get("revision")?;
    Some(integer(revision, "revision").map(PackageVersion::Revision))
}

fn integer_field(map: &Map<String, Value>, name: &str) -> Result<u64> {
    map.get(name)
        .ok_or_else(|| Error::schema(format!("missing {}", name)))
        .and_then(|value| integer(value, name))
}

fn integer(value: &Value, name: &str) -> Result<u64> {
    match value {
        Value::String(text) => text.trim().parse().ok(),
        Value::Number(number) => number.as_u64(),
        _ => None,
    }
    .ok_or_else(|| Error::schema(format!("{} is not an integer: {}", name, value)))
}
