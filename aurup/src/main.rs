//! aurup CLI
//!
//! Checks upstream sources and updates the recipes that fall behind.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use url::Url;

use aurup::{android, dsc, pypi, Committer, Config, Context, GitCommitter, NoopCommitter, Result, Summary};
use aurup_meta::{AbiMapping, UpstreamClient};
use aurup_recipe::detect_oracle;

#[derive(Parser)]
#[command(name = "aurup")]
#[command(about = "Update package recipes from upstream release metadata", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(long, env = "AURUP_CONFIG")]
    config: Option<PathBuf>,

    /// Parent directory of the recipe directories
    #[arg(long, env = "AURUP_RECIPES")]
    recipes: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Decide updates without writing or committing anything
    #[arg(long)]
    dry_run: bool,

    /// Write updated recipes but do not commit them
    #[arg(long)]
    no_commit: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Update Android SDK component recipes
    Android {
        /// Spelling of armeabi-v7a in package names (current, legacy)
        #[arg(long)]
        abi_mapping: Option<AbiMapping>,
    },

    /// Update recipes tracking Debian .dsc files
    Dsc,

    /// Update recipes tracking PyPI projects
    Pypi,

    /// Run every source in turn
    All {
        /// Spelling of armeabi-v7a in package names (current, legacy)
        #[arg(long)]
        abi_mapping: Option<AbiMapping>,
    },

    /// Print package names and recipe directories of a repository document
    Name {
        /// Local repository XML file
        file: PathBuf,

        /// URL the document was published at
        #[arg(long, default_value = "https://dl.google.com/android/repository/repository.xml")]
        url: Url,

        /// Spelling of armeabi-v7a in package names (current, legacy)
        #[arg(long)]
        abi_mapping: Option<AbiMapping>,
    },
}

fn setup_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn main() {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "error:".bright_red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Returns whether the run succeeded.
fn run(cli: Cli) -> Result<bool> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(recipes) = cli.recipes {
        config.recipes_dir = recipes;
    }
    if cli.no_commit {
        config.commit = false;
    }

    match cli.command {
        Commands::Android { abi_mapping } => {
            apply_abi_mapping(&mut config, abi_mapping);
            cmd_update(&config, cli.dry_run, &[Source::Android])
        }
        Commands::Dsc => cmd_update(&config, cli.dry_run, &[Source::Dsc]),
        Commands::Pypi => cmd_update(&config, cli.dry_run, &[Source::Pypi]),
        Commands::All { abi_mapping } => {
            apply_abi_mapping(&mut config, abi_mapping);
            cmd_update(
                &config,
                cli.dry_run,
                &[Source::Android, Source::Dsc, Source::Pypi],
            )
        }
        Commands::Name {
            file,
            url,
            abi_mapping,
        } => {
            apply_abi_mapping(&mut config, abi_mapping);
            cmd_name(&config, file, url)
        }
    }
}

fn apply_abi_mapping(config: &mut Config, abi_mapping: Option<AbiMapping>) {
    if let Some(abi_mapping) = abi_mapping {
        config.android.abi_mapping = abi_mapping;
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Android,
    Dsc,
    Pypi,
}

impl Source {
    fn name(self) -> &'static str {
        match self {
            Source::Android => "android",
            Source::Dsc => "dsc",
            Source::Pypi => "pypi",
        }
    }
}

fn cmd_update(config: &Config, dry_run: bool, sources: &[Source]) -> Result<bool> {
    let start = Instant::now();
    let oracle = detect_oracle();
    let committer: Box<dyn Committer> = if config.commit && !dry_run {
        Box::new(GitCommitter)
    } else {
        Box::new(NoopCommitter)
    };
    let ctx = Context {
        oracle: oracle.as_ref(),
        committer: committer.as_ref(),
        dry_run,
    };
    let client = UpstreamClient::new()?;

    info!("Updating recipes in {}", config.recipes_dir.display());

    let mut summary = Summary::default();
    for &source in sources {
        info!("Checking {} source", source.name());
        let result = match source {
            Source::Android => android::run(&ctx, &client, &config.android, &config.recipes_dir),
            Source::Dsc => Ok(dsc::run(&ctx, &client, config)),
            Source::Pypi => pypi::run(&ctx, &client, config),
        };
        match result {
            Ok(source_summary) => summary.merge(source_summary),
            Err(e) => summary.source_failed(source.name(), &e),
        }
    }

    summary.print(start.elapsed());
    Ok(!summary.is_failure())
}

fn cmd_name(config: &Config, file: PathBuf, url: Url) -> Result<bool> {
    let text = std::fs::read_to_string(&file)?;
    let names = android::package_names(&config.android, &text, &url)?;

    for (name, dir) in &names {
        println!("{} {} {}", name, "->".bright_black(), dir.bright_green());
    }
    println!(
        "\n[{}] {} package(s) in {}",
        "+".bright_blue().bold(),
        names.len(),
        file.display()
    );
    Ok(true)
}
