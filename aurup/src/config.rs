//! Run configuration
//!
//! Everything has a default, so a configuration file is optional. Command
//! line flags are applied on top of whatever the file provides.

use std::path::{Path, PathBuf};

use aurup_meta::AbiMapping;
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parent directory holding one directory per recipe
    pub recipes_dir: PathBuf,
    pub android: AndroidConfig,
    pub dsc: Vec<DscSource>,
    pub pypi: PypiConfig,
    /// Commit updated recipes with git
    pub commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recipes_dir: PathBuf::from("."),
            android: AndroidConfig::default(),
            dsc: vec![
                DscSource {
                    recipe: "xapian-omega".to_string(),
                    source_name: "xapian-omega_{}.orig.tar.xz".to_string(),
                    debian_package: Some("xapian-omega".to_string()),
                    pool_url: None,
                },
                DscSource {
                    recipe: "lubuntu-artwork".to_string(),
                    source_name: "lubuntu-artwork_{}.".to_string(),
                    debian_package: None,
                    pool_url: Some(
                        "http://archive.ubuntu.com/ubuntu/pool/universe/l/lubuntu-artwork/"
                            .to_string(),
                    ),
                },
            ],
            pypi: PypiConfig::default(),
            commit: true,
        }
    }
}

impl Config {
    /// Load from a YAML file, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                let config: Config = serde_yaml::from_str(&content)?;
                tracing::debug!("Loaded configuration from {}", path.display());
                config
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for source in &self.dsc {
            source.location()?;
            if !source.source_name.contains("{}") {
                return Err(Error::Config(format!(
                    "dsc source {}: source_name must contain {{}}",
                    source.recipe
                )));
            }
        }
        Ok(())
    }

    pub fn recipe_dir(&self, name: &str) -> PathBuf {
        self.recipes_dir.join(name)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AndroidConfig {
    /// Base of the repository; relative document URLs resolve against it
    pub base_url: String,
    /// Repository document name with `{delim}`/`{num}` slots
    pub repository_file: String,
    pub repository_max_index: u32,
    /// Add-on site list name with `{delim}`/`{num}` slots
    pub addons_list_file: String,
    pub addons_list_max_index: u32,
    pub abi_mapping: AbiMapping,
    /// Archives must target this OS or `any`
    pub host_os: String,
    pub excluded_types: Vec<String>,
    pub excluded_codenames: Vec<String>,
    /// Side-file regenerated in recipes that ship one
    pub properties_file: String,
}

impl Default for AndroidConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dl.google.com/android/repository/".to_string(),
            repository_file: "repository{delim}{num}.xml".to_string(),
            repository_max_index: 12,
            addons_list_file: "addons_list{delim}{num}.xml".to_string(),
            addons_list_max_index: 3,
            abi_mapping: AbiMapping::default(),
            host_os: "linux".to_string(),
            excluded_types: vec!["extra".to_string()],
            excluded_codenames: Vec::new(),
            properties_file: "source.properties".to_string(),
        }
    }
}

/// A recipe following a Debian or Ubuntu source package.
#[derive(Debug, Clone, Deserialize)]
pub struct DscSource {
    /// Recipe directory name
    pub recipe: String,
    /// Prefix of the tracked file in the checksum lists, `{}` is the version
    pub source_name: String,
    /// packages.debian.org package whose page links the `.dsc`
    #[serde(default)]
    pub debian_package: Option<String>,
    /// Archive pool directory listing the `.dsc` files
    #[serde(default)]
    pub pool_url: Option<String>,
}

/// Where a `.dsc` file is discovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DscLocation<'a> {
    DebianPackage(&'a str),
    PoolUrl(&'a str),
}

impl DscSource {
    pub fn location(&self) -> Result<DscLocation<'_>> {
        match (&self.debian_package, &self.pool_url) {
            (Some(package), None) => Ok(DscLocation::DebianPackage(package)),
            (None, Some(url)) => Ok(DscLocation::PoolUrl(url)),
            _ => Err(Error::Config(format!(
                "dsc source {}: set exactly one of debian_package and pool_url",
                self.recipe
            ))),
        }
    }

    /// Source file prefix for an upstream version.
    pub fn source_prefix(&self, version: &str) -> String {
        self.source_name.replace("{}", version)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PypiConfig {
    /// Recipe directories tracked explicitly
    pub recipes: Vec<String>,
    /// Also pick up every recipe declaring `_pypi_pkgname`
    pub scan: bool,
}

impl Default for PypiConfig {
    fn default() -> Self {
        Self {
            recipes: Vec::new(),
            scan: true,
        }
    }
}
