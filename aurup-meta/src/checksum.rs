//! Digest computation for generated side-files
//!
//! Algorithm names follow the recipe convention: the name used in
//! `{name}sums` arrays and in upstream checksum attributes.

use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use crate::{Error, Result};

/// Algorithms a side-file digest can be computed with.
pub const SUPPORTED_ALGORITHMS: &[&str] = &["sha1", "sha224", "sha256", "sha384", "sha512"];

/// Hex digest of `data` using the named algorithm.
pub fn digest_hex(algorithm: &str, data: &[u8]) -> Result<String> {
    match algorithm.to_ascii_lowercase().as_str() {
        "sha1" => Ok(hex::<Sha1>(data)),
        "sha224" => Ok(hex::<Sha224>(data)),
        "sha256" => Ok(hex::<Sha256>(data)),
        "sha384" => Ok(hex::<Sha384>(data)),
        "sha512" => Ok(hex::<Sha512>(data)),
        _ => Err(Error::UnsupportedChecksum(algorithm.to_string())),
    }
}

fn hex<D: Digest>(data: &[u8]) -> String
where
    sha2::digest::Output<D>: std::fmt::LowerHex,
{
    let mut hasher = D::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
