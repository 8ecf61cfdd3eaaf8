//! Update decisions
//!
//! A decision is made in two steps. Recorded and upstream version fields
//! are compared in order; the first field that differs decides between an
//! update and a regression. Only then is an [`UpdateDecision`] built and
//! applied to the recipe text.

use aurup_recipe::{Recipe, VersionOracle};

use crate::{Error, Result};

/// A recipe version variable and the value upstream wants it to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionField {
    pub name: String,
    pub recorded: String,
    pub upstream: String,
    /// Whether a recorded value ahead of upstream is refused
    pub monotonic: bool,
}

impl VersionField {
    pub fn new(
        name: impl Into<String>,
        recorded: impl Into<String>,
        upstream: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            recorded: recorded.into(),
            upstream: upstream.into(),
            monotonic: true,
        }
    }

    /// A field that only tells whether upstream differs, in either direction.
    ///
    /// For counters that restart, like a revision reset by a new API level
    /// the recipe does not record.
    pub fn changed(
        name: impl Into<String>,
        recorded: impl Into<String>,
        upstream: impl Into<String>,
    ) -> Self {
        Self {
            monotonic: false,
            ..Self::new(name, recorded, upstream)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    UpToDate,
    Outdated,
}

/// Compare version fields in order; the first non-equal field decides.
///
/// A recipe ahead of upstream is a [`Error::VersionRegression`].
pub fn compare_fields(
    pkgname: &str,
    fields: &[VersionField],
    oracle: &dyn VersionOracle,
) -> Result<Verdict> {
    for field in fields {
        let order = oracle.vercmp(&field.recorded, &field.upstream)?;
        if order > 0 && field.monotonic {
            return Err(Error::VersionRegression {
                pkgname: pkgname.to_string(),
                recorded: field.recorded.clone(),
                upstream: field.upstream.clone(),
            });
        }
        if order != 0 {
            tracing::debug!(
                "{}: {} {} -> {}",
                pkgname,
                field.name,
                field.recorded,
                field.upstream
            );
            return Ok(Verdict::Outdated);
        }
    }
    Ok(Verdict::UpToDate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMode {
    /// Every element is replaced; the value count must match
    Exact,
    /// Only the leading elements are replaced
    Head,
}

#[derive(Debug, Clone)]
pub struct ArrayPatch {
    pub name: String,
    pub values: Vec<String>,
    pub mode: ArrayMode,
}

impl ArrayPatch {
    pub fn exact(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
            mode: ArrayMode::Exact,
        }
    }

    /// Leading-slot update, for checksum arrays followed by local sources.
    pub fn head(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
            mode: ArrayMode::Head,
        }
    }
}

/// Head patches for every `{algorithm}sums` array the recipe has.
///
/// Algorithms without an array are skipped. A recipe that tracks none of
/// them cannot be updated without leaving stale checksums behind.
pub fn checksum_patches<I>(recipe: &Recipe, checksums: I) -> Result<Vec<ArrayPatch>>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut offered = Vec::new();
    let mut patches = Vec::new();
    for (algorithm, digest) in checksums {
        let name = format!("{}sums", algorithm);
        if recipe.has_array(&name) {
            patches.push(ArrayPatch::head(name, vec![digest]));
        } else {
            tracing::debug!("No {} array in {}", name, recipe.path().display());
        }
        offered.push(algorithm);
    }

    if patches.is_empty() {
        return Err(Error::NoChecksumArray {
            recipe: recipe.path().to_path_buf(),
            algorithms: offered,
        });
    }
    Ok(patches)
}

/// A generated file written next to the recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideFile {
    pub name: String,
    pub content: String,
}

/// The edits that bring a recipe to a new upstream version.
#[derive(Debug, Clone, Default)]
pub struct UpdateDecision {
    /// Used in the commit message only
    pub version_tag: String,
    pub scalars: Vec<(String, String)>,
    pub arrays: Vec<ArrayPatch>,
    pub side_files: Vec<SideFile>,
}

impl UpdateDecision {
    pub fn new(version_tag: impl Into<String>) -> Self {
        Self {
            version_tag: version_tag.into(),
            ..Default::default()
        }
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.scalars.push((name.into(), value.into()));
        self
    }

    pub fn array(mut self, patch: ArrayPatch) -> Self {
        self.arrays.push(patch);
        self
    }

    pub fn arrays(mut self, patches: impl IntoIterator<Item = ArrayPatch>) -> Self {
        self.arrays.extend(patches);
        self
    }

    pub fn side_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.side_files.push(SideFile {
            name: name.into(),
            content: content.into(),
        });
        self
    }

    /// Patch the recipe text in memory.
    pub fn apply(&self, recipe: &mut Recipe) -> Result<()> {
        for (name, value) in &self.scalars {
            recipe.set_value(name, value)?;
        }

        for patch in &self.arrays {
            match patch.mode {
                ArrayMode::Exact => recipe.set_array(&patch.name, &patch.values)?,
                ArrayMode::Head => recipe.set_array_head(&patch.name, &patch.values)?,
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurup_recipe::Vercmp;

    #[test]
    fn test_first_differing_field_decides() {
        let fields = vec![
            VersionField::new("_apilevel", "30", "31"),
            VersionField::new("_rev", "r05", "r01"),
        ];
        assert_eq!(
            compare_fields("android-platform", &fields, &Vercmp).unwrap(),
            Verdict::Outdated
        );

        let fields = vec![
            VersionField::new("_apilevel", "30", "30"),
            VersionField::new("_rev", "r03", "r03"),
        ];
        assert_eq!(
            compare_fields("android-platform", &fields, &Vercmp).unwrap(),
            Verdict::UpToDate
        );
    }

    #[test]
    fn test_regression() {
        let fields = vec![VersionField::new("pkgver", "2.0", "1.9")];
        let err = compare_fields("python-foo", &fields, &Vercmp).unwrap_err();
        match err {
            Error::VersionRegression {
                pkgname,
                recorded,
                upstream,
            } => {
                assert_eq!(pkgname, "python-foo");
                assert_eq!(recorded, "2.0");
                assert_eq!(upstream, "1.9");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_changed_field_accepts_reset() {
        let fields = vec![VersionField::changed("_rev", "r02", "r01")];
        assert_eq!(
            compare_fields("android-sources", &fields, &Vercmp).unwrap(),
            Verdict::Outdated
        );

        let fields = vec![VersionField::changed("_rev", "r02", "r02")];
        assert_eq!(
            compare_fields("android-sources", &fields, &Vercmp).unwrap(),
            Verdict::UpToDate
        );
    }

    #[test]
    fn test_array_patch_example() {
        let text = "pkgname=foo\npkgver=1\n\nsource=('http://old/a.tar.gz')\nsha256sums=('deadbeef')\n";
        let mut recipe = Recipe::from_content("PKGBUILD", text.to_string());

        UpdateDecision::new("2")
            .array(ArrayPatch::exact("source", vec!["http://new/b.tar.gz".into()]))
            .array(ArrayPatch::exact("sha256sums", vec!["cafef00d".into()]))
            .apply(&mut recipe)
            .unwrap();

        assert_eq!(
            recipe.content(),
            "pkgname=foo\npkgver=1\n\nsource=('http://new/b.tar.gz')\nsha256sums=('cafef00d')\n"
        );
    }

    #[test]
    fn test_checksum_head_patches() {
        let text = "pkgver=1.0\nsource=(\"$pkgname-$pkgver.tar.gz\" local.patch)\nsha256sums=('aaaa' 'SKIP')\n";
        let mut recipe = Recipe::from_content("PKGBUILD", text.to_string());

        let checksums = vec![
            ("md5".to_string(), "cccc".to_string()),
            ("sha256".to_string(), "bbbb".to_string()),
        ];
        let patches = checksum_patches(&recipe, checksums).unwrap();
        assert_eq!(patches.len(), 1);

        UpdateDecision::new("1.1")
            .set("pkgver", "1.1")
            .arrays(patches)
            .apply(&mut recipe)
            .unwrap();

        assert_eq!(
            recipe.content(),
            "pkgver=1.1\nsource=(\"$pkgname-$pkgver.tar.gz\" local.patch)\nsha256sums=('bbbb' 'SKIP')\n"
        );
    }

    #[test]
    fn test_no_checksum_array() {
        let recipe = Recipe::from_content("PKGBUILD", "pkgver=1\nsha256sums=('a')\n".to_string());
        let err = checksum_patches(&recipe, vec![("md5".to_string(), "c".to_string())]).unwrap_err();
        assert!(matches!(err, Error::NoChecksumArray { ref algorithms, .. } if algorithms == &["md5"]));

        let err = checksum_patches(&recipe, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::NoChecksumArray { .. }));
    }

    #[test]
    fn test_required_array_missing() {
        let mut recipe = Recipe::from_content("PKGBUILD", "pkgver=1\n".to_string());
        let err = UpdateDecision::new("2")
            .array(ArrayPatch::exact("source", vec!["x".into()]))
            .apply(&mut recipe)
            .unwrap_err();
        assert!(matches!(err, Error::Recipe(ref e) if e.is_not_found()));
    }
}
