//! Version comparison with pacman `vercmp` semantics
//!
//! Versions look like `[epoch:]version[-release]`. Each part is compared
//! segment by segment: runs of digits compare numerically (leading zeros
//! ignored), runs of letters compare lexically, a numeric segment is newer
//! than an alphabetic one, and a trailing alphabetic segment (`1.0a`) is
//! older than the bare version.

use std::cmp::Ordering;
use std::path::PathBuf;
use std::process::Command;

use crate::{Error, Result};

/// Compares two version strings.
pub trait VersionOracle {
    /// Negative if `a` is older than `b`, zero if equal, positive if newer.
    fn vercmp(&self, a: &str, b: &str) -> Result<i32>;

    fn compare(&self, a: &str, b: &str) -> Result<Ordering> {
        Ok(self.vercmp(a, b)?.cmp(&0))
    }
}

/// In-process implementation of pacman's comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct Vercmp;

impl VersionOracle for Vercmp {
    fn vercmp(&self, a: &str, b: &str) -> Result<i32> {
        Ok(match pkg_vercmp(a, b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        })
    }
}

/// Runs the external `vercmp` program.
#[derive(Debug, Clone)]
pub struct VercmpCommand {
    program: PathBuf,
}

impl VercmpCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl VersionOracle for VercmpCommand {
    fn vercmp(&self, a: &str, b: &str) -> Result<i32> {
        let output = Command::new(&self.program).arg(a).arg(b).output()?;
        if !output.status.success() {
            return Err(Error::Vercmp(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse::<i32>()
            .map_err(|_| Error::Vercmp(format!("unexpected output: {:?}", stdout.trim())))
    }
}

/// Use the system `vercmp` when available, the native comparison otherwise.
pub fn detect_oracle() -> Box<dyn VersionOracle> {
    match which::which("vercmp") {
        Ok(path) => {
            tracing::debug!("Using {} for version comparison", path.display());
            Box::new(VercmpCommand::new(path))
        }
        Err(_) => {
            tracing::debug!("vercmp not found, using built-in comparison");
            Box::new(Vercmp)
        }
    }
}

fn pkg_vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (epoch1, ver1, rel1) = parse_evr(a);
    let (epoch2, ver2, rel2) = parse_evr(b);

    rpmvercmp(epoch1, epoch2)
        .then_with(|| rpmvercmp(ver1, ver2))
        .then_with(|| match (rel1, rel2) {
            (Some(r1), Some(r2)) => rpmvercmp(r1, r2),
            _ => Ordering::Equal,
        })
}

fn parse_evr(evr: &str) -> (&str, &str, Option<&str>) {
    let digits = evr.bytes().take_while(u8::is_ascii_digit).count();
    let (epoch, rest) = if evr[digits..].starts_with(':') {
        let epoch = &evr[..digits];
        (if epoch.is_empty() { "0" } else { epoch }, &evr[digits + 1..])
    } else {
        ("0", evr)
    };

    match rest.rfind('-') {
        Some(idx) => (epoch, &rest[..idx], Some(&rest[idx + 1..])),
        None => (epoch, rest, None),
    }
}

fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let (a, b) = (a.as_bytes(), b.as_bytes());
    let (mut one, mut two) = (0usize, 0usize);
    let (mut ptr1, mut ptr2) = (0usize, 0usize);

    while one < a.len() && two < b.len() {
        while one < a.len() && !a[one].is_ascii_alphanumeric() {
            one += 1;
        }
        while two < b.len() && !b[two].is_ascii_alphanumeric() {
            two += 1;
        }
        if one >= a.len() || two >= b.len() {
            break;
        }

        // Separator runs of different length decide
        if one - ptr1 != two - ptr2 {
            return (one - ptr1).cmp(&(two - ptr2));
        }

        ptr1 = one;
        ptr2 = two;
        let is_num = a[ptr1].is_ascii_digit();
        if is_num {
            while ptr1 < a.len() && a[ptr1].is_ascii_digit() {
                ptr1 += 1;
            }
            while ptr2 < b.len() && b[ptr2].is_ascii_digit() {
                ptr2 += 1;
            }
        } else {
            while ptr1 < a.len() && a[ptr1].is_ascii_alphabetic() {
                ptr1 += 1;
            }
            while ptr2 < b.len() && b[ptr2].is_ascii_alphabetic() {
                ptr2 += 1;
            }
        }

        // Segments of different kinds: numeric is newer
        if two == ptr2 {
            return if is_num {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let mut seg1 = &a[one..ptr1];
        let mut seg2 = &b[two..ptr2];
        if is_num {
            seg1 = strip_zeros(seg1);
            seg2 = strip_zeros(seg2);
            match seg1.len().cmp(&seg2.len()) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        match seg1.cmp(seg2) {
            Ordering::Equal => {}
            other => return other,
        }

        one = ptr1;
        two = ptr2;
    }

    let end1 = one >= a.len();
    let end2 = two >= b.len();
    if end1 && end2 {
        return Ordering::Equal;
    }

    if (end1 && !b[two].is_ascii_alphabetic()) || (!end1 && a[one].is_ascii_alphabetic()) {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

fn strip_zeros(segment: &[u8]) -> &[u8] {
    let zeros = segment.iter().take_while(|&&c| c == b'0').count();
    &segment[zeros..]
}
