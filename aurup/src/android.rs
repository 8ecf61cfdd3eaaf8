//! Android SDK component recipes
//!
//! The repository index and every add-on site it lists are fetched,
//! normalized into package items and reduced to one latest item per
//! package name. Each item then updates the recipe directory named after it.

use std::path::Path;

use aurup_meta::checksum::digest_hex;
use aurup_meta::properties::source_properties;
use aurup_meta::sites::addon_sites;
use aurup_meta::tree::parse_xml;
use aurup_meta::{
    normalize_document, recipe_dir_name, retain_candidates, FetchedDocument, PackageItem,
    PackageNameResolver, PackageVersion, Selector, UpstreamClient, UrlPattern,
};
use chrono::Utc;
use indexmap::IndexMap;
use url::Url;

use crate::config::AndroidConfig;
use crate::decision::{ArrayPatch, UpdateDecision, VersionField};
use crate::update::{load_recipe, run_update, Context, Outcome, SkipReason, Summary};
use crate::Result;

/// Recipe variables describing an upstream version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionVars {
    /// `_apilevel`, for items that have one
    pub api_level: Option<String>,
    /// `_rev`
    pub rev: String,
    /// Commit message tag
    pub tag: String,
}

pub fn version_vars(item: &PackageItem) -> VersionVars {
    match item.version {
        PackageVersion::ApiLevel {
            api_level,
            revision,
        } => {
            let rev = format!("r{:0>2}", revision);
            VersionVars {
                api_level: Some(api_level.to_string()),
                tag: format!("{}_{}", api_level, rev),
                rev,
            }
        }
        PackageVersion::Semantic {
            major,
            minor,
            micro,
        } => {
            let rev = format!("{}.{}.{}", major, minor, micro);
            VersionVars {
                api_level: None,
                tag: rev.clone(),
                rev,
            }
        }
        PackageVersion::Revision(revision) => VersionVars {
            api_level: None,
            rev: revision.to_string(),
            tag: revision.to_string(),
        },
    }
}

fn document_pattern(base_url: &str, file: &str) -> UrlPattern {
    if base_url.ends_with('/') {
        UrlPattern::new(format!("{}{}", base_url, file))
    } else {
        UrlPattern::new(format!("{}/{}", base_url, file))
    }
}

/// Fetch the repository index and every add-on site document.
///
/// Only a missing repository index fails; unreachable add-on sites are
/// logged and left out.
pub fn discover(client: &UpstreamClient, config: &AndroidConfig) -> Result<Vec<FetchedDocument>> {
    let repository = client.open_latest(
        &document_pattern(&config.base_url, &config.repository_file),
        Some(config.repository_max_index),
    )?;
    let mut documents = vec![repository];

    let addons_list = match client.open_latest(
        &document_pattern(&config.base_url, &config.addons_list_file),
        Some(config.addons_list_max_index),
    ) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("No add-on site list: {}", e);
            return Ok(documents);
        }
    };

    let sites = parse_xml(&addons_list.body)
        .and_then(|tree| addon_sites(&tree, &addons_list.url));
    let sites = match sites {
        Ok(sites) => sites,
        Err(e) => {
            tracing::warn!("Invalid add-on site list {}: {}", addons_list.url, e);
            return Ok(documents);
        }
    };

    for (name, urls) in sites {
        for url in urls {
            match client.fetch(url.as_str()) {
                Ok(document) => {
                    tracing::debug!("Fetched {} site {}", name, document.url);
                    documents.push(document);
                }
                Err(e) => tracing::warn!("Failed to fetch {} site {}: {}", name, url, e),
            }
        }
    }

    Ok(documents)
}

/// Normalize every document; a malformed one is skipped as a whole.
pub fn collect_items(documents: &[FetchedDocument]) -> Vec<PackageItem> {
    let mut items = Vec::new();
    for document in documents {
        let normalized =
            parse_xml(&document.body).and_then(|tree| normalize_document(&tree, &document.url));
        match normalized {
            Ok(found) => {
                tracing::debug!("{} items in {}", found.len(), document.url);
                items.extend(found);
            }
            Err(e) => tracing::warn!("Skipping {}: {}", document.url, e),
        }
    }
    items
}

/// Latest candidate item per package name.
pub fn select_packages(config: &AndroidConfig, items: Vec<PackageItem>) -> IndexMap<String, PackageItem> {
    let candidates = retain_candidates(items, &config.excluded_types);
    Selector::new(PackageNameResolver::new(config.abi_mapping))
        .with_excluded_codenames(config.excluded_codenames.clone())
        .select_latest(candidates)
}

/// Bring one recipe directory up to date with an item.
pub fn update_package(
    ctx: &Context<'_>,
    config: &AndroidConfig,
    dir: &Path,
    item: &PackageItem,
) -> Result<Outcome> {
    let Some(archive) = item.compatible_archive(&config.host_os) else {
        return Ok(Outcome::Skipped(SkipReason::NoCompatibleArchive));
    };
    let Some(recipe) = load_recipe(dir)? else {
        return Ok(Outcome::Skipped(SkipReason::RecipeMissing(dir.to_path_buf())));
    };

    let vars = version_vars(item);
    let mut fields = Vec::with_capacity(2);

    // Source bundles and tools have no `_apilevel` in their recipes
    let tracked_api_level = match &vars.api_level {
        Some(api_level) => recipe
            .optional_value("_apilevel")?
            .map(|recorded| (recorded, api_level.clone())),
        None => None,
    };
    // Without it a new API level restarts `_rev`, so only a literal pkgver
    // holding the tag can still order the two versions
    let mut tracked_pkgver = false;
    match (&tracked_api_level, &vars.api_level) {
        (Some((recorded, api_level)), _) => {
            fields.push(VersionField::new("_apilevel", recorded.as_str(), api_level.as_str()));
            fields.push(VersionField::new("_rev", recipe.value("_rev")?, vars.rev.as_str()));
        }
        (None, Some(_)) => {
            if let Some(pkgver) = recipe.optional_value("pkgver")?.filter(|v| !v.contains('$')) {
                fields.push(VersionField::new("pkgver", pkgver, vars.tag.as_str()));
                tracked_pkgver = true;
            }
            fields.push(VersionField::changed("_rev", recipe.value("_rev")?, vars.rev.as_str()));
        }
        (None, None) => {
            fields.push(VersionField::new("_rev", recipe.value("_rev")?, vars.rev.as_str()));
        }
    }

    run_update(ctx, recipe, &fields, |recipe| {
        let algorithm = &archive.checksum.algorithm;
        let mut sources = vec![item.archive_url(archive)?.to_string()];
        let mut sums = vec![archive.checksum.digest.clone()];

        let mut decision = UpdateDecision::new(vars.tag.as_str());
        if let Some((_, api_level)) = &tracked_api_level {
            decision = decision.set("_apilevel", api_level.as_str());
        }
        if tracked_pkgver {
            decision = decision.set("pkgver", vars.tag.as_str());
        }
        decision = decision.set("_rev", vars.rev.as_str()).set("pkgrel", "1");

        if recipe.dir().join(&config.properties_file).exists() {
            let properties = source_properties(item, Utc::now());
            sources.push(config.properties_file.clone());
            sums.push(digest_hex(algorithm, properties.as_bytes())?);
            decision = decision.side_file(config.properties_file.as_str(), properties);
        }

        Ok(decision
            .array(ArrayPatch::exact("source", sources))
            .array(ArrayPatch::exact(format!("{}sums", algorithm), sums)))
    })
}

/// Update every recipe that has a selected upstream item.
pub fn update_all(
    ctx: &Context<'_>,
    config: &AndroidConfig,
    recipes_dir: &Path,
    documents: &[FetchedDocument],
) -> Summary {
    let packages = select_packages(config, collect_items(documents));
    tracing::info!("{} Android packages upstream", packages.len());

    let mut summary = Summary::default();
    for (name, item) in &packages {
        let dir = recipes_dir.join(recipe_dir_name(name));
        summary.record(name, update_package(ctx, config, &dir, item));
    }
    summary
}

/// Fetch and update; only discovery failures fail the source.
pub fn run(
    ctx: &Context<'_>,
    client: &UpstreamClient,
    config: &AndroidConfig,
    recipes_dir: &Path,
) -> Result<Summary> {
    let documents = discover(client, config)?;
    Ok(update_all(ctx, config, recipes_dir, &documents))
}

/// Package name to recipe directory for a local repository document.
pub fn package_names(
    config: &AndroidConfig,
    text: &str,
    source_url: &Url,
) -> Result<IndexMap<String, String>> {
    let tree = parse_xml(text)?;
    let items = normalize_document(&tree, source_url)?;
    Ok(select_packages(config, items)
        .into_keys()
        .map(|name| {
            let dir = recipe_dir_name(&name);
            (name, dir)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::testing::{write_recipe, RecordingCommitter};
    use aurup_recipe::{Vercmp, RECIPE_FILE};

    const REPOSITORY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sdk:sdk-repository xmlns:sdk="http://schemas.android.com/sdk/android/repository/12">
  <sdk:license id="android-sdk-license" type="text">Terms</sdk:license>
  <sdk:platform>
    <sdk:version>10</sdk:version>
    <sdk:api-level>29</sdk:api-level>
    <sdk:revision>5</sdk:revision>
    <sdk:uses-license ref="android-sdk-license"/>
    <sdk:archives>
      <sdk:archive>
        <sdk:checksum type="sha1">1111</sdk:checksum>
        <sdk:url>platform-29_r05.zip</sdk:url>
      </sdk:archive>
    </sdk:archives>
  </sdk:platform>
  <sdk:platform>
    <sdk:version>11</sdk:version>
    <sdk:api-level>30</sdk:api-level>
    <sdk:revision>3</sdk:revision>
    <sdk:uses-license ref="android-sdk-license"/>
    <sdk:archives>
      <sdk:archive>
        <sdk:checksum type="sha1">3333</sdk:checksum>
        <sdk:url>platform-30_r03.zip</sdk:url>
      </sdk:archive>
    </sdk:archives>
  </sdk:platform>
  <sdk:platform-tool>
    <sdk:revision><sdk:major>31</sdk:major><sdk:minor>0</sdk:minor><sdk:micro>2</sdk:micro></sdk:revision>
    <sdk:uses-license ref="android-sdk-license"/>
    <sdk:archives>
      <sdk:archive>
        <sdk:checksum type="sha1">4444</sdk:checksum>
        <sdk:url>platform-tools-windows.zip</sdk:url>
        <sdk:host-os>windows</sdk:host-os>
      </sdk:archive>
    </sdk:archives>
  </sdk:platform-tool>
  <sdk:extra>
    <sdk:revision>1</sdk:revision>
    <sdk:path>m2repository</sdk:path>
    <sdk:uses-license ref="android-sdk-license"/>
    <sdk:archives>
      <sdk:archive>
        <sdk:checksum type="sha1">5555</sdk:checksum>
        <sdk:url>m2.zip</sdk:url>
      </sdk:archive>
    </sdk:archives>
  </sdk:extra>
</sdk:sdk-repository>"#;

    const SYS_IMG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sdk:sdk-sys-img xmlns:sdk="http://schemas.android.com/sdk/android/sys-img/3">
  <sdk:license id="android-sdk-license" type="text">Terms</sdk:license>
  <sdk:system-image>
    <sdk:api-level>19</sdk:api-level>
    <sdk:revision>5</sdk:revision>
    <sdk:tag-id>default</sdk:tag-id>
    <sdk:abi>armeabi-v7a</sdk:abi>
    <sdk:uses-license ref="android-sdk-license"/>
    <sdk:archives>
      <sdk:archive>
        <sdk:checksum type="sha1">6666</sdk:checksum>
        <sdk:url>armeabi-v7a-19_r05.zip</sdk:url>
      </sdk:archive>
    </sdk:archives>
  </sdk:system-image>
</sdk:sdk-sys-img>"#;

    const PLATFORM_RECIPE: &str = "# Maintainer: someone\npkgname=android-platform\n_apilevel=29\n_rev=r05\npkgver=${_apilevel}_${_rev}\npkgrel=2\nsource=(\"https://old.example.com/platform-29_r05.zip\")\nsha1sums=('1111')\n";

    fn document(url: &str, body: &str) -> FetchedDocument {
        FetchedDocument {
            url: Url::parse(url).unwrap(),
            body: body.to_string(),
        }
    }

    fn documents() -> Vec<FetchedDocument> {
        vec![
            document(
                "https://dl.example.com/android/repository/repository-12.xml",
                REPOSITORY,
            ),
            document(
                "https://dl.example.com/android/repository/sys-img/android/sys-img.xml",
                SYS_IMG,
            ),
        ]
    }

    #[test]
    fn test_version_vars() {
        let items = collect_items(&documents());
        let vars = version_vars(&items[1]);
        assert_eq!(
            vars,
            VersionVars {
                api_level: Some("30".into()),
                rev: "r03".into(),
                tag: "30_r03".into(),
            }
        );

        let vars = version_vars(&items[2]);
        assert_eq!(vars.api_level, None);
        assert_eq!(vars.rev, "31.0.2");
        assert_eq!(vars.tag, "31.0.2");
    }

    #[test]
    fn test_selection_and_naming() {
        let config = AndroidConfig::default();
        let packages = select_packages(&config, collect_items(&documents()));

        let names: Vec<&str> = packages.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec!["platform", "platform-tool", "armv7a-eabi-system-image"]
        );
        assert_eq!(
            packages["platform"].version,
            PackageVersion::ApiLevel {
                api_level: 30,
                revision: 3
            }
        );
        assert_eq!(
            recipe_dir_name("armv7a-eabi-system-image"),
            "android-armv7a-eabi-system-image"
        );
    }

    #[test]
    fn test_malformed_document_is_skipped() {
        let mut docs = documents();
        docs.insert(
            0,
            document(
                "https://dl.example.com/android/repository/broken.xml",
                "<sdk:sdk-repository><sdk:platform>text<sdk:revision>1</sdk:revision></sdk:platform></sdk:sdk-repository>",
            ),
        );
        assert_eq!(collect_items(&docs).len(), 5);
    }

    #[test]
    fn test_update_platform_and_rerun() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_recipe(tmp.path(), "android-platform", PLATFORM_RECIPE);
        let committer = RecordingCommitter::default();
        let ctx = Context {
            oracle: &Vercmp,
            committer: &committer,
            dry_run: false,
        };
        let config = AndroidConfig::default();

        let summary = update_all(&ctx, &config, tmp.path(), &documents());
        assert_eq!(summary.updated, 1);
        // platform-tool has no linux archive, the system image no recipe
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);

        let written = std::fs::read_to_string(dir.join(RECIPE_FILE)).unwrap();
        assert_eq!(
            written,
            "# Maintainer: someone\npkgname=android-platform\n_apilevel=30\n_rev=r03\npkgver=${_apilevel}_${_rev}\npkgrel=1\nsource=(\"https://dl.example.com/android/repository/platform-30_r03.zip\")\nsha1sums=('3333')\n"
        );
        {
            let commits = committer.commits.borrow();
            assert_eq!(commits.len(), 1);
            assert_eq!(commits[0].1, "android-platform");
            assert_eq!(commits[0].2, "30_r03");
        }

        let summary = update_all(&ctx, &config, tmp.path(), &documents());
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.up_to_date, 1);
        assert_eq!(std::fs::read_to_string(dir.join(RECIPE_FILE)).unwrap(), written);
        assert_eq!(committer.commits.borrow().len(), 1);
    }

    #[test]
    fn test_update_with_properties_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_recipe(
            tmp.path(),
            "android-armv7a-eabi-system-image",
            "pkgname=android-armv7a-eabi-system-image\n_apilevel=19\n_rev=r04\npkgrel=1\nsource=(\"old.zip\" \"source.properties\")\nsha1sums=('aaaa' 'bbbb')\n",
        );
        std::fs::write(dir.join("source.properties"), "old").unwrap();
        let committer = RecordingCommitter::default();
        let ctx = Context {
            oracle: &Vercmp,
            committer: &committer,
            dry_run: false,
        };
        let config = AndroidConfig::default();

        let packages = select_packages(&config, collect_items(&documents()));
        let item = &packages["armv7a-eabi-system-image"];
        let outcome = update_package(&ctx, &config, &dir, item).unwrap();
        assert_eq!(
            outcome,
            Outcome::Updated {
                pkgname: "android-armv7a-eabi-system-image".into(),
                version_tag: "19_r05".into(),
            }
        );

        let properties = std::fs::read_to_string(dir.join("source.properties")).unwrap();
        assert!(properties.starts_with('#'));
        assert!(properties.contains("SystemImage.Abi=armeabi-v7a"));
        let digest = digest_hex("sha1", properties.as_bytes()).unwrap();

        let recipe = aurup_recipe::Recipe::from_dir(&dir).unwrap();
        assert_eq!(recipe.value("_rev").unwrap(), "r05");
        assert_eq!(
            recipe.array("source").unwrap(),
            vec![
                "https://dl.example.com/android/repository/sys-img/android/armeabi-v7a-19_r05.zip",
                "source.properties",
            ]
        );
        assert_eq!(recipe.array("sha1sums").unwrap(), vec!["6666".to_string(), digest]);
        assert_eq!(committer.commits.borrow()[0].3, vec!["source.properties"]);
    }

    #[test]
    fn test_recipe_without_api_level() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_recipe(
            tmp.path(),
            "android-sources",
            "pkgname=android-sources\n_rev=r02\npkgrel=3\nsource=(\"old.zip\")\nsha1sums=('aaaa')\n",
        );
        let committer = RecordingCommitter::default();
        let ctx = Context {
            oracle: &Vercmp,
            committer: &committer,
            dry_run: false,
        };

        let items = collect_items(&documents());
        let outcome = update_package(&ctx, &AndroidConfig::default(), &dir, &items[1]).unwrap();
        assert!(matches!(outcome, Outcome::Updated { .. }));

        let recipe = aurup_recipe::Recipe::from_dir(&dir).unwrap();
        assert_eq!(recipe.value("_rev").unwrap(), "r03");
        assert_eq!(recipe.value("pkgrel").unwrap(), "1");
        assert!(recipe.optional_value("_apilevel").unwrap().is_none());
    }

    #[test]
    fn test_rev_reset_by_new_api_level() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = write_recipe(
            tmp.path(),
            "android-sources",
            "pkgname=android-sources\n_rev=r05\npkgver=29_r05\npkgrel=2\nsource=(\"old.zip\")\nsha1sums=('aaaa')\n",
        );
        let committer = RecordingCommitter::default();
        let ctx = Context {
            oracle: &Vercmp,
            committer: &committer,
            dry_run: false,
        };

        // Platform 30 r03 follows 29 r05
        let items = collect_items(&documents());
        let outcome = update_package(&ctx, &AndroidConfig::default(), &dir, &items[1]).unwrap();
        assert!(matches!(outcome, Outcome::Updated { ref version_tag, .. } if version_tag == "30_r03"));

        let recipe = aurup_recipe::Recipe::from_dir(&dir).unwrap();
        assert_eq!(recipe.value("pkgver").unwrap(), "30_r03");
        assert_eq!(recipe.value("_rev").unwrap(), "r03");
        assert_eq!(committer.commits.borrow().len(), 1);

        let outcome = update_package(&ctx, &AndroidConfig::default(), &dir, &items[1]).unwrap();
        assert!(matches!(outcome, Outcome::UpToDate { .. }));

        // An older tag is still refused
        let err = update_package(&ctx, &AndroidConfig::default(), &dir, &items[0]).unwrap_err();
        assert!(err.is_regression());
        assert_eq!(committer.commits.borrow().len(), 1);
    }

    #[test]
    fn test_rev_reset_with_derived_pkgver() {
        let tmp = tempfile::tempdir().unwrap();
        let content = "pkgname=android-sources\n_rev=r05\npkgver=${_rev}\npkgrel=2\nsource=(\"old.zip\")\nsha1sums=('aaaa')\n";
        let dir = write_recipe(tmp.path(), "android-sources", content);
        let committer = RecordingCommitter::default();
        let ctx = Context {
            oracle: &Vercmp,
            committer: &committer,
            dry_run: false,
        };

        let items = collect_items(&documents());
        let outcome = update_package(&ctx, &AndroidConfig::default(), &dir, &items[1]).unwrap();
        assert!(matches!(outcome, Outcome::Updated { .. }));

        let recipe = aurup_recipe::Recipe::from_dir(&dir).unwrap();
        assert_eq!(recipe.value("pkgver").unwrap(), "${_rev}");
        assert_eq!(recipe.value("_rev").unwrap(), "r03");
    }

    #[test]
    fn test_package_names() {
        let names = package_names(
            &AndroidConfig::default(),
            SYS_IMG,
            &Url::parse("https://dl.example.com/android/repository/sys-img/android/sys-img.xml")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(
            names["armv7a-eabi-system-image"],
            "android-armv7a-eabi-system-image"
        );
    }
}
