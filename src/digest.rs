//! SHA-1 digests as used by v1 signatures.
//!
//! There are three levels:
//!
//!  - the digest of an entry's content goes into the manifest
//!  - the digest of an entry's serialized manifest block goes into the signature file
//!  - the digest of the whole serialized manifest goes into the signature file's main section
//!
//! The last two are computed by running the manifest writer straight into the hasher, so what
//! gets hashed is always exactly what gets written.

use std::{
    fmt,
    io::{self, Read, Write},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha1::{digest::Output, Digest, Sha1};

use crate::manifest::Manifest;

/// Attribute holding an entry digest, in both the manifest and the signature file.
pub const DIGEST_ATTRIBUTE: &str = "SHA1-Digest";

/// Main-section attribute of the signature file holding the digest of the whole manifest.
pub const MANIFEST_DIGEST_ATTRIBUTE: &str = "SHA1-Digest-Manifest";

/// A SHA-1 digest in binary.
///
/// Displays as standard (padded) base64, which is the form used in manifests.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Sha1Digest([u8; 20]);

impl Sha1Digest {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<Output<Sha1>> for Sha1Digest {
    fn from(value: Output<Sha1>) -> Self {
        Self(value.into())
    }
}

impl fmt::Debug for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha1:{}", self.to_hex())
    }
}

impl fmt::Display for Sha1Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

pub fn digest_bytes(data: &[u8]) -> Sha1Digest {
    Sha1::digest(data).into()
}

/// Hashes everything that can be read from `reader`.
pub fn digest_reader(reader: &mut impl Read) -> io::Result<Sha1Digest> {
    let mut hasher = Sha1::new();
    io::copy(reader, &mut hasher)?;
    Ok(hasher.finalize().into())
}

/// Digest of the serialized manifest, for `SHA1-Digest-Manifest`.
pub fn manifest_digest(manifest: &Manifest) -> io::Result<Sha1Digest> {
    let mut hasher = Sha1::new();
    manifest.write_to(&mut hasher)?;
    Ok(hasher.finalize().into())
}

/// Digest of one entry's serialized manifest block, including the blank line that ends it.
///
/// This is the value recorded for the entry in the signature file.  It covers the manifest text
/// rather than the file content, so a change in how the manifest is wrapped changes it too.
pub fn entry_block_digest(manifest: &Manifest, name: &str) -> io::Result<Sha1Digest> {
    let mut hasher = Sha1::new();
    manifest.write_entry(&mut hasher, name)?;
    hasher.write_all(b"\r\n")?;
    Ok(hasher.finalize().into())
}
