//! aurup: keep package recipes in step with upstream releases
//!
//! This crate provides:
//! - Update decisions: version comparison, regression refusal and recipe
//!   patch plans
//! - Update flows for Android SDK components, Debian `.dsc` files and PyPI
//!   projects
//! - Git commits of updated recipes
//! - Run configuration and summaries

pub mod android;
pub mod config;
pub mod decision;
pub mod dsc;
pub mod error;
pub mod git;
pub mod pypi;
pub mod update;

pub use config::Config;
pub use decision::{ArrayPatch, UpdateDecision, Verdict, VersionField};
pub use error::{Error, Result};
pub use git::{Committer, GitCommitter, NoopCommitter};
pub use update::{Context, Outcome, SkipReason, Summary};
