//! Per-package update pipeline and run bookkeeping

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use aurup_recipe::{Recipe, VersionOracle, RECIPE_FILE};
use colored::Colorize;

use crate::decision::{compare_fields, UpdateDecision, Verdict, VersionField};
use crate::git::Committer;
use crate::{Error, Result};

/// Collaborators shared by every update of a run.
pub struct Context<'a> {
    pub oracle: &'a dyn VersionOracle,
    pub committer: &'a dyn Committer,
    /// Decide, but never write or commit
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No archive targets the host OS
    NoCompatibleArchive,
    /// No recipe exists for an upstream package
    RecipeMissing(PathBuf),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoCompatibleArchive => write!(f, "no compatible archive"),
            SkipReason::RecipeMissing(dir) => write!(f, "no recipe in {}", dir.display()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Updated { pkgname: String, version_tag: String },
    UpToDate { pkgname: String },
    Skipped(SkipReason),
}

/// Read the recipe of a package directory, `None` if there is none.
pub fn load_recipe(dir: &Path) -> Result<Option<Recipe>> {
    match Recipe::from_dir(dir) {
        Ok(recipe) => Ok(Some(recipe)),
        Err(aurup_recipe::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Compare, patch, write and commit one recipe.
///
/// `plan` is only consulted when upstream is newer; a regression leaves the
/// recipe untouched.
pub fn run_update<F>(
    ctx: &Context<'_>,
    mut recipe: Recipe,
    fields: &[VersionField],
    plan: F,
) -> Result<Outcome>
where
    F: FnOnce(&Recipe) -> Result<UpdateDecision>,
{
    let pkgname = recipe.value("pkgname")?;

    if compare_fields(&pkgname, fields, ctx.oracle)? == Verdict::UpToDate {
        tracing::info!("{} already updated", pkgname);
        return Ok(Outcome::UpToDate { pkgname });
    }

    let decision = plan(&recipe)?;
    decision.apply(&mut recipe)?;

    if ctx.dry_run {
        tracing::info!("{} would be updated to {}", pkgname, decision.version_tag);
        return Ok(Outcome::Updated {
            pkgname,
            version_tag: decision.version_tag,
        });
    }

    // A side file that cannot be written must leave the recipe untouched
    let mut side_files = Vec::with_capacity(decision.side_files.len());
    for side_file in &decision.side_files {
        std::fs::write(recipe.dir().join(&side_file.name), &side_file.content)?;
        side_files.push(side_file.name.clone());
    }
    recipe.save()?;

    ctx.committer
        .commit(recipe.dir(), &pkgname, &decision.version_tag, &side_files);
    tracing::info!("Updated {} to {}", pkgname, decision.version_tag);

    Ok(Outcome::Updated {
        pkgname,
        version_tag: decision.version_tag,
    })
}

/// Tally of a run, across sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub updated: usize,
    pub up_to_date: usize,
    pub skipped: usize,
    pub failed: usize,
    pub regressions: usize,
    /// Sources that failed before any package was processed
    pub failed_sources: Vec<String>,
}

impl Summary {
    /// Count one package result, logging failures.
    pub fn record(&mut self, package: &str, result: Result<Outcome>) {
        match result {
            Ok(Outcome::Updated { .. }) => self.updated += 1,
            Ok(Outcome::UpToDate { .. }) => self.up_to_date += 1,
            Ok(Outcome::Skipped(reason)) => {
                tracing::debug!("Skipping {}: {}", package, reason);
                self.skipped += 1;
            }
            Err(e @ Error::VersionRegression { .. }) => {
                tracing::error!("{}", e);
                self.regressions += 1;
                self.failed += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to update {}: {}", package, e);
                self.failed += 1;
            }
        }
    }

    pub fn source_failed(&mut self, source: &str, error: &Error) {
        tracing::error!("{} source failed: {}", source, error);
        self.failed_sources.push(source.to_string());
    }

    pub fn merge(&mut self, other: Summary) {
        self.updated += other.updated;
        self.up_to_date += other.up_to_date;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.regressions += other.regressions;
        self.failed_sources.extend(other.failed_sources);
    }

    pub fn total(&self) -> usize {
        self.updated + self.up_to_date + self.skipped + self.failed
    }

    /// Whether the run should exit unsuccessfully.
    pub fn is_failure(&self) -> bool {
        self.regressions > 0 || !self.failed_sources.is_empty()
    }

    pub fn print(&self, elapsed: Duration) {
        println!();
        println!(
            "[{}] {} package(s) updated",
            "+".bright_blue().bold(),
            self.updated
        );
        println!(
            "[{}] {} package(s) already up to date",
            "+".bright_blue().bold(),
            self.up_to_date
        );
        println!(
            "[{}] {} package(s) skipped",
            "+".bright_blue().bold(),
            self.skipped
        );
        println!(
            "[{}] {} package(s) failed",
            "+".bright_blue().bold(),
            self.failed
        );
        if self.regressions > 0 {
            println!(
                "[{}] {} recipe(s) ahead of upstream",
                "!".bright_red().bold(),
                self.regressions
            );
        }
        for source in &self.failed_sources {
            println!("[{}] {} source failed", "!".bright_red().bold(), source);
        }
        println!(
            "[{}] Processed {} package(s) in {:#?}",
            "+".bright_blue().bold(),
            self.total(),
            elapsed
        );
    }
}

/// Directory of a recipe file path.
pub fn recipe_dir_of(path: &Path) -> PathBuf {
    match path.file_name() {
        Some(name) if name == RECIPE_FILE => path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::path::{Path, PathBuf};

    use crate::git::Committer;

    /// Remembers every commit request.
    #[derive(Default)]
    pub struct RecordingCommitter {
        pub commits: RefCell<Vec<(PathBuf, String, String, Vec<String>)>>,
    }

    impl Committer for RecordingCommitter {
        fn commit(&self, dir: &Path, pkgname: &str, version_tag: &str, side_files: &[String]) {
            self.commits.borrow_mut().push((
                dir.to_path_buf(),
                pkgname.to_string(),
                version_tag.to_string(),
                side_files.to_vec(),
            ));
        }
    }

    pub fn write_recipe(parent: &Path, name: &str, content: &str) -> PathBuf {
        let dir = parent.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(aurup_recipe::RECIPE_FILE), content).unwrap();
        dir
    }
}
