//! PyPI JSON API metadata

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::{Error, Result};

pub const PYPI_JSON_URL: &str = "https://pypi.org/pypi/{}/json";

/// JSON endpoint of a project.
pub fn project_url(project: &str) -> String {
    PYPI_JSON_URL.replace("{}", project)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub version: String,
}

/// One uploaded distribution file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseFile {
    pub filename: String,
    pub packagetype: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub digests: IndexMap<String, String>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ReleaseFile {
    pub fn is_sdist(&self) -> bool {
        self.packagetype == "sdist"
    }

    /// Lowercase algorithm name to digest.
    ///
    /// Both legacy `{algorithm}_digest` keys and the `digests` map are read;
    /// the map wins on conflicts.
    pub fn checksums(&self) -> IndexMap<String, String> {
        let mut checksums = IndexMap::new();
        for (key, value) in &self.extra {
            if let (Some(algorithm), Some(digest)) = (key.strip_suffix("_digest"), value.as_str()) {
                checksums.insert(algorithm.to_ascii_lowercase(), digest.to_string());
            }
        }
        for (algorithm, digest) in &self.digests {
            checksums.insert(algorithm.to_ascii_lowercase(), digest.clone());
        }
        checksums
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PypiProject {
    pub info: ProjectInfo,
    #[serde(default)]
    pub releases: HashMap<String, Vec<ReleaseFile>>,
    /// Files of the latest version
    #[serde(default)]
    pub urls: Vec<ReleaseFile>,
}

impl PypiProject {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn latest_version(&self) -> &str {
        &self.info.version
    }

    /// Source distribution of the latest version; the last one listed wins.
    pub fn latest_sdist(&self) -> Result<&ReleaseFile> {
        let files = self
            .releases
            .get(&self.info.version)
            .filter(|files| !files.is_empty())
            .unwrap_or(&self.urls);

        files.iter().rev().find(|file| file.is_sdist()).ok_or_else(|| {
            Error::Pypi(format!(
                "{} {} has no source distribution",
                self.info.name, self.info.version
            ))
        })
    }
}
