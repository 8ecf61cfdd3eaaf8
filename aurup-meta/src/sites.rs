//! Add-on site lists
//!
//! The repository publishes an `addons_list` document naming further
//! repository documents (vendor add-ons, system images). Legacy lists use
//! `sdk:addon-site`/`sdk:sys-img-site` elements with a `name`; newer ones use
//! `site` elements with a `displayName`.

use indexmap::IndexMap;
use serde_json::Value;
use url::Url;

use crate::normalize::normalize_node;
use crate::tree;
use crate::{Error, Result};

/// Site name to absolute document URLs, in document order.
pub fn addon_sites(document: &Value, base_url: &Url) -> Result<IndexMap<String, Vec<Url>>> {
    let (root_name, root) = tree::root(document)?;
    let root = normalize_node(root)?;
    let root = root
        .as_object()
        .ok_or_else(|| Error::schema(format!("{} lists no sites", root_name)))?;

    let mut sites: IndexMap<String, Vec<Url>> = IndexMap::new();
    for value in root.values() {
        let nodes: Vec<&Value> = match value {
            Value::Array(nodes) => nodes.iter().collect(),
            node @ Value::Object(_) => vec![node],
            _ => continue,
        };

        for node in nodes {
            let url = node
                .get("url")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::schema("site without url"))?;
            let name = node
                .get("name")
                .or_else(|| node.get("displayName"))
                .and_then(Value::as_str)
                .ok_or_else(|| Error::schema(format!("site {} has no name", url)))?;

            sites
                .entry(name.to_string())
                .or_default()
                .push(base_url.join(url.trim())?);
        }
    }

    Ok(sites)
}
