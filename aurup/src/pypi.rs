//! Recipes following PyPI projects
//!
//! A recipe opts in by naming its project in `_pypi_pkgname`.

use std::path::{Path, PathBuf};

use aurup_meta::pypi::{project_url, PypiProject};
use aurup_meta::UpstreamClient;
use aurup_recipe::{Recipe, RECIPE_FILE};
use indexmap::IndexSet;

use crate::config::Config;
use crate::decision::{checksum_patches, UpdateDecision, VersionField};
use crate::update::{load_recipe, recipe_dir_of, run_update, Context, Outcome, SkipReason, Summary};
use crate::Result;

pub const PROJECT_VAR: &str = "_pypi_pkgname";

/// Recipe directories to check: the configured ones first, then every
/// recipe under the recipes directory that names a PyPI project.
pub fn recipe_dirs(config: &Config) -> Result<Vec<PathBuf>> {
    let mut dirs: IndexSet<PathBuf> = config
        .pypi
        .recipes
        .iter()
        .map(|name| config.recipe_dir(name))
        .collect();

    if config.pypi.scan {
        let pattern = config.recipes_dir.join("*").join(RECIPE_FILE);
        for entry in glob::glob(&pattern.to_string_lossy())? {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", e.path().display(), e.error());
                    continue;
                }
            };

            match Recipe::from_file(&path).map(|recipe| recipe.optional_value(PROJECT_VAR)) {
                Ok(Ok(Some(_))) => {
                    dirs.insert(recipe_dir_of(&path));
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) | Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    Ok(dirs.into_iter().collect())
}

/// Bring a recipe up to date with its project's latest release.
///
/// Every `{algorithm}sums` array the recipe has gets the digest of the
/// release's source distribution in its first slot; a recipe with none of
/// them is left alone.
pub fn update_package(ctx: &Context<'_>, recipe: Recipe, project: &PypiProject) -> Result<Outcome> {
    let version = project.latest_version();
    let fields = [VersionField::new("pkgver", recipe.value("pkgver")?, version)];

    run_update(ctx, recipe, &fields, |recipe| {
        let sdist = project.latest_sdist()?;
        tracing::debug!("{}: using {}", project.info.name, sdist.filename);

        Ok(UpdateDecision::new(version)
            .set("pkgver", version)
            .set("pkgrel", "1")
            .arrays(checksum_patches(recipe, sdist.checksums())?))
    })
}

fn update_recipe(ctx: &Context<'_>, client: &UpstreamClient, dir: &Path) -> Result<Outcome> {
    let Some(recipe) = load_recipe(dir)? else {
        return Ok(Outcome::Skipped(SkipReason::RecipeMissing(dir.to_path_buf())));
    };

    let project_name = recipe.value(PROJECT_VAR)?;
    let document = client.fetch(&project_url(&project_name))?;
    let project = PypiProject::from_json(&document.body)?;
    update_package(ctx, recipe, &project)
}

/// Update every PyPI recipe; only a bad scan pattern fails the source.
pub fn run(ctx: &Context<'_>, client: &UpstreamClient, config: &Config) -> Result<Summary> {
    let dirs = recipe_dirs(config)?;
    tracing::info!("{} PyPI recipes", dirs.len());

    let mut summary = Summary::default();
    for dir in dirs {
        summary.record(&dir.display().to_string(), update_recipe(ctx, client, &dir));
    }
    Ok(summary)
}
