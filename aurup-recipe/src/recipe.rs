//! PKGBUILD recipe handling
//!
//! A [`Recipe`] is read fully into memory, patched in place through
//! [`crate::patch`], and written back only when the text actually changed.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::patch::{find_array, find_scalar};
use crate::{Error, Result};

/// File name of a recipe inside its package directory.
pub const RECIPE_FILE: &str = "PKGBUILD";

/// An on-disk build recipe and its in-memory edits.
#[derive(Debug, Clone)]
pub struct Recipe {
    path: PathBuf,
    original: String,
    content: String,
}

impl Recipe {
    /// Read a recipe from a file path
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_content(path, content))
    }

    /// Read `PKGBUILD` from a package directory
    pub fn from_dir(dir: &Path) -> Result<Self> {
        Self::from_file(&dir.join(RECIPE_FILE))
    }

    /// Wrap already-loaded text; `path` is where [`Recipe::save`] writes.
    pub fn from_content(path: impl Into<PathBuf>, content: String) -> Self {
        Self {
            path: path.into(),
            original: content.clone(),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the recipe
    pub fn dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the patched text differs from what was read.
    pub fn is_modified(&self) -> bool {
        self.content != self.original
    }

    /// Current value of a scalar variable, unquoted and without comments.
    pub fn value(&self, name: &str) -> Result<String> {
        Ok(find_scalar(&self.content, name)?.value().to_string())
    }

    /// Like [`Recipe::value`], but a missing variable is `None`.
    pub fn optional_value(&self, name: &str) -> Result<Option<String>> {
        match self.value(name) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn has_array(&self, name: &str) -> bool {
        find_array(&self.content, name).is_ok()
    }

    /// Current elements of an array variable.
    pub fn array(&self, name: &str) -> Result<Vec<String>> {
        Ok(find_array(&self.content, name)?
            .elements()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        let updated = find_scalar(&self.content, name)?.replace(&[value])?;
        self.content = updated;
        Ok(())
    }

    /// Replace every element of an array; the value count must match.
    pub fn set_array<S: AsRef<str>>(&mut self, name: &str, values: &[S]) -> Result<()> {
        let updated = find_array(&self.content, name)?.replace(values)?;
        self.content = updated;
        Ok(())
    }

    /// Replace the leading elements of an array and keep the rest.
    pub fn set_array_head<S: AsRef<str>>(&mut self, name: &str, values: &[S]) -> Result<()> {
        let assignment = find_array(&self.content, name)?;
        let current = assignment.elements();
        if values.len() > current.len() {
            return Err(Error::SlotMismatch {
                name: name.to_string(),
                slots: current.len(),
                values: values.len(),
            });
        }

        let merged: Vec<&str> = values
            .iter()
            .map(|v| v.as_ref())
            .chain(current.into_iter().skip(values.len()))
            .collect();
        let updated = assignment.replace(&merged)?;
        self.content = updated;
        Ok(())
    }

    /// Write the recipe back if it was modified.
    ///
    /// The new text goes to a temporary file in the same directory which is
    /// then renamed over the recipe. Returns whether anything was written.
    pub fn save(&mut self) -> Result<bool> {
        if !self.is_modified() {
            return Ok(false);
        }

        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(self.content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Wrote {}", self.path.display());
        self.original = self.content.clone();
        Ok(true)
    }
}
