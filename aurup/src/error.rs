use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Recipe error: {0}")]
    Recipe(#[from] aurup_recipe::Error),

    #[error(transparent)]
    Meta(#[from] aurup_meta::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{pkgname}: recipe version {recorded} is newer than upstream {upstream}")]
    VersionRegression {
        pkgname: String,
        recorded: String,
        upstream: String,
    },

    #[error("{}: no checksum array for {}", recipe.display(), algorithms.join(", "))]
    NoChecksumArray {
        recipe: PathBuf,
        algorithms: Vec<String>,
    },

    #[error("No recipe in {0}")]
    RecipeMissing(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn is_regression(&self) -> bool {
        matches!(self, Error::VersionRegression { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
