//! aurup-recipe: PKGBUILD recipe patching
//!
//! This crate provides:
//! - Locating scalar (`name=value`) and array (`name=(...)`) assignments
//! - Template-based replacement that leaves the rest of the file untouched
//! - Recipe file lifecycle (read, patch, atomic write-back)
//! - pacman-style version comparison

pub mod error;
pub mod patch;
pub mod recipe;
pub mod vercmp;

pub use error::{Error, Result};
pub use patch::{find_array, find_scalar, Assignment, AssignmentKind, Template};
pub use recipe::{Recipe, RECIPE_FILE};
pub use vercmp::{detect_oracle, Vercmp, VercmpCommand, VersionOracle};
