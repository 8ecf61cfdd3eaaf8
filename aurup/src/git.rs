//! Committing updated recipes

use std::path::Path;
use std::process::Command;

use aurup_recipe::RECIPE_FILE;

/// Records an applied update.
///
/// Implementations never fail the update: a commit that cannot be made
/// (nothing staged, not a repository) is logged and dropped.
pub trait Committer {
    fn commit(&self, dir: &Path, pkgname: &str, version_tag: &str, side_files: &[String]);
}

pub fn commit_message(pkgname: &str, version_tag: &str) -> String {
    format!("[{}] Update pkg ({})", pkgname, version_tag)
}

/// Stages the recipe and its side-files, then commits them with `git`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCommitter;

impl GitCommitter {
    fn git(dir: &Path, args: &[&str]) -> bool {
        match Command::new("git").args(args).current_dir(dir).output() {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                tracing::warn!(
                    "git {} failed in {}: {}",
                    args.first().copied().unwrap_or_default(),
                    dir.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                false
            }
            Err(e) => {
                tracing::warn!("Failed to run git in {}: {}", dir.display(), e);
                false
            }
        }
    }
}

impl Committer for GitCommitter {
    fn commit(&self, dir: &Path, pkgname: &str, version_tag: &str, side_files: &[String]) {
        let mut paths: Vec<&str> = side_files.iter().map(String::as_str).collect();
        paths.push(RECIPE_FILE);

        let mut add = vec!["add", "--"];
        add.extend(&paths);
        if !Self::git(dir, &add) {
            return;
        }

        let message = commit_message(pkgname, version_tag);
        let mut commit = vec!["commit", "-m", message.as_str(), "--"];
        commit.extend(&paths);
        if Self::git(dir, &commit) {
            tracing::info!("Committed {} {}", pkgname, version_tag);
        }
    }
}

/// Leaves the working tree as it is.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCommitter;

impl Committer for NoopCommitter {
    fn commit(&self, dir: &Path, pkgname: &str, version_tag: &str, _side_files: &[String]) {
        tracing::debug!(
            "Not committing {} {} in {}",
            pkgname,
            version_tag,
            dir.display()
        );
    }
}
