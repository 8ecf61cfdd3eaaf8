//! Recipes following Debian or Ubuntu source packages

use std::cmp::Ordering;
use std::path::Path;

use aurup_meta::dsc::{dsc_link_from_package_page, dsc_links_from_listing, file_name, DscFile};
use aurup_meta::UpstreamClient;
use aurup_recipe::VersionOracle;
use url::Url;

use crate::config::{Config, DscLocation, DscSource};
use crate::decision::{checksum_patches, UpdateDecision, VersionField};
use crate::update::{load_recipe, run_update, Context, Outcome, SkipReason, Summary};
use crate::{Error, Result};

const DEBIAN_PACKAGE_PAGE: &str = "https://packages.debian.org/sid/";

/// Newest `.dsc` of a pool listing, ordered by file name with the oracle.
///
/// Among equal names the last listed wins.
pub fn latest_dsc(links: Vec<Url>, oracle: &dyn VersionOracle) -> Result<Option<Url>> {
    let mut latest: Option<Url> = None;
    for link in links {
        let newer = match &latest {
            None => true,
            Some(current) => {
                oracle.compare(file_name(current), file_name(&link))? != Ordering::Greater
            }
        };
        if newer {
            latest = Some(link);
        }
    }
    Ok(latest)
}

/// Locate the `.dsc` file a source tracks.
pub fn discover(
    client: &UpstreamClient,
    oracle: &dyn VersionOracle,
    source: &DscSource,
) -> Result<Url> {
    let url = match source.location()? {
        DscLocation::DebianPackage(package) => {
            let page = client.fetch(&format!("{}{}", DEBIAN_PACKAGE_PAGE, package))?;
            dsc_link_from_package_page(&page.body)?
        }
        DscLocation::PoolUrl(pool_url) => {
            let listing = client.fetch(pool_url)?;
            let links = dsc_links_from_listing(&listing.body, &listing.url)?;
            tracing::debug!("{} .dsc files in {}", links.len(), listing.url);
            latest_dsc(links, oracle)?
        }
    };

    url.ok_or_else(|| {
        Error::Meta(aurup_meta::Error::NotFound(format!(
            ".dsc file for {}",
            source.recipe
        )))
    })
}

/// Bring a recipe up to date with a parsed `.dsc` file.
///
/// Every `{algorithm}sums` array the recipe has gets the digest of the
/// tracked source file in its first slot. Nothing is written unless the
/// `.dsc` lists that file and the recipe has at least one such array.
pub fn update_package(
    ctx: &Context<'_>,
    dir: &Path,
    dsc: &DscFile,
    source: &DscSource,
) -> Result<Outcome> {
    let Some(recipe) = load_recipe(dir)? else {
        return Ok(Outcome::Skipped(SkipReason::RecipeMissing(dir.to_path_buf())));
    };

    let version = dsc.upstream_version();
    let fields = [VersionField::new("pkgver", recipe.value("pkgver")?, version)];

    run_update(ctx, recipe, &fields, |recipe| {
        let prefix = source.source_prefix(version);
        let checksums = dsc.checksums_for(&prefix);
        if checksums.is_empty() {
            return Err(aurup_meta::Error::Dsc(format!(
                "{} lists no file starting with {}",
                source.recipe, prefix
            ))
            .into());
        }

        Ok(UpdateDecision::new(version)
            .set("pkgver", version)
            .set("pkgrel", "1")
            .arrays(checksum_patches(recipe, checksums)?))
    })
}

fn update_source(
    ctx: &Context<'_>,
    client: &UpstreamClient,
    config: &Config,
    source: &DscSource,
) -> Result<Outcome> {
    let url = discover(client, ctx.oracle, source)?;
    tracing::info!("{}: using {}", source.recipe, url);
    let dsc = DscFile::parse(&client.fetch(url.as_str())?.body)?;
    update_package(ctx, &config.recipe_dir(&source.recipe), &dsc, source)
}

/// Update every configured `.dsc` source; each one fails on its own.
pub fn run(ctx: &Context<'_>, client: &UpstreamClient, config: &Config) -> Summary {
    let mut summary = Summary::default();
    for source in &config.dsc {
        summary.record(&source.recipe, update_source(ctx, client, config, source));
    }
    summary
}
