//! Debian source control (`.dsc`) files
//!
//! Only the fields needed to follow an upstream release are read: the
//! version and the per-algorithm checksum lists. Links to `.dsc` files are
//! discovered either from a packages.debian.org page or from an archive
//! pool directory listing.

use indexmap::IndexMap;
use regex::Regex;
use url::Url;

use crate::{Error, Result};

const CHECKSUMS_PREFIX: &str = "Checksums-";
const PGP_SIGNED: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
const PGP_SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----";

/// One file listed in a checksum field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DscEntry {
    pub digest: String,
    pub size: u64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DscFile {
    pub source: Option<String>,
    /// Full Debian version, `[epoch:]upstream[-revision]`
    pub version: String,
    /// Lowercase algorithm name (`sha256`, `md5`, ...) to listed files
    pub checksums: IndexMap<String, Vec<DscEntry>>,
}

impl DscFile {
    pub fn parse(text: &str) -> Result<Self> {
        let fields = parse_fields(text);

        let version = fields
            .get("Version")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Dsc("missing Version field".to_string()))?;
        let source = fields.get("Source").map(|v| v.trim().to_string());

        let mut checksums = IndexMap::new();
        for (name, value) in &fields {
            let algorithm = if let Some(algorithm) = name.strip_prefix(CHECKSUMS_PREFIX) {
                algorithm.to_ascii_lowercase()
            } else if name == "Files" {
                "md5".to_string()
            } else {
                continue;
            };
            checksums.insert(algorithm, parse_entries(name, value)?);
        }

        Ok(Self {
            source,
            version,
            checksums,
        })
    }

    /// Version without epoch and Debian revision.
    pub fn upstream_version(&self) -> &str {
        let version = self
            .version
            .split_once(':')
            .map_or(self.version.as_str(), |(_, rest)| rest);
        version.rsplit_once('-').map_or(version, |(upstream, _)| upstream)
    }

    /// Digest per algorithm of the first file whose name starts with `prefix`.
    pub fn checksums_for(&self, prefix: &str) -> IndexMap<String, String> {
        self.checksums
            .iter()
            .filter_map(|(algorithm, entries)| {
                entries
                    .iter()
                    .find(|entry| entry.name.starts_with(prefix))
                    .map(|entry| (algorithm.clone(), entry.digest.clone()))
            })
            .collect()
    }
}

/// Fields of the first deb822 paragraph, continuation lines joined by `\n`.
fn parse_fields(text: &str) -> IndexMap<String, String> {
    let mut lines = text.lines().peekable();

    if lines.peek().is_some_and(|line| line.trim() == PGP_SIGNED) {
        // Armor headers end at the first blank line
        for line in lines.by_ref() {
            if line.trim().is_empty() {
                break;
            }
        }
    }

    let mut fields: IndexMap<String, String> = IndexMap::new();
    let mut current: Option<String> = None;

    for line in lines {
        if line.trim() == PGP_SIGNATURE {
            break;
        }
        if line.trim().is_empty() {
            if fields.is_empty() {
                continue;
            }
            break;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(value) = current.as_ref().and_then(|name| fields.get_mut(name)) {
                value.push('\n');
                value.push_str(line.trim());
            }
            continue;
        }

        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_string();
            fields.insert(name.clone(), value.trim().to_string());
            current = Some(name);
        }
    }

    fields
}

fn parse_entries(field: &str, value: &str) -> Result<Vec<DscEntry>> {
    value
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                [digest, size, name] => Ok(DscEntry {
                    digest: digest.to_string(),
                    size: size
                        .parse()
                        .map_err(|_| Error::Dsc(format!("{}: bad size {:?}", field, size)))?,
                    name: name.to_string(),
                }),
                _ => Err(Error::Dsc(format!("{}: malformed entry {:?}", field, line))),
            }
        })
        .collect()
}

/// First absolute `.dsc` link on a packages.debian.org package page.
pub fn dsc_link_from_package_page(html: &str) -> Result<Option<Url>> {
    let re = Regex::new(r#"https?://[^"'\s<>]+\.dsc"#)?;
    match re.find(html) {
        Some(m) => Ok(Some(Url::parse(m.as_str())?)),
        None => Ok(None),
    }
}

/// All `.dsc` links of a directory listing, resolved against the listing
/// URL and in page order.
pub fn dsc_links_from_listing(html: &str, listing_url: &Url) -> Result<Vec<Url>> {
    let re = Regex::new(r#"href="([^"]+\.dsc)""#)?;
    let mut links = Vec::new();
    for caps in re.captures_iter(html) {
        let url = listing_url.join(&caps[1])?;
        if !links.contains(&url) {
            links.push(url);
        }
    }
    Ok(links)
}

/// File name part of a URL.
pub fn file_name(url: &Url) -> &str {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
}
