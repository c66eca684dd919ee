//! Recognizing the signing metadata of an already-signed archive.
//!
//! See https://docs.oracle.com/javase/7/docs/technotes/guides/jar/jar.html#Signed_JAR_File

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use once_cell::sync::Lazy;

use crate::MANIFEST_PATH;

/// Signature-related files, relative to the archive root.  `*` never matches a `/`.
const SIGNING_METADATA_PATTERNS: &[&str] = &[
    MANIFEST_PATH,
    "META-INF/*.SF",
    "META-INF/*.RSA",
    "META-INF/*.DSA",
    "META-INF/*.EC", // observed in ECDSA-signed .apk files
    "META-INF/SIG-*",
];

static SIGNING_METADATA: Lazy<GlobSet> = Lazy::new(|| {
    let mut builder = GlobSetBuilder::new();
    for pattern in SIGNING_METADATA_PATTERNS {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .expect("signing metadata patterns are valid globs");
        builder.add(glob);
    }
    builder
        .build()
        .expect("signing metadata patterns form a valid glob set")
});

/// Returns true if `name` is one of the special paths that must not be taken into account when
/// calculating the digests of an archive.  Those same files are also not copied to the signed
/// output, since signing generates them anew.
///
/// Matching is case-sensitive.  Directory entries are not handled here: they are never signed,
/// whatever their name.
pub fn is_signing_metadata(name: &str) -> bool {
    // small optimization
    if !name.starts_with("META-INF/") {
        return false;
    }
    SIGNING_METADATA.is_match(name)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_signing_metadata() {
        for name in [
            "META-INF/MANIFEST.MF",
            "META-INF/CERT.SF",
            "META-INF/CERT.RSA",
            "META-INF/CERT.EC",
            "META-INF/CERT.DSA",
            "META-INF/FOO.SF",
            "META-INF/SIG-BAR",
            "META-INF/SIG-",
            "META-INF/.SF",
        ] {
            assert!(is_signing_metadata(name), "{name} should be excluded");
        }
    }

    #[test]
    fn test_regular_content() {
        for name in [
            "META-INF/other.txt",
            "assets/x.png",
            "META-INF/manifest.mf",
            "META-INF/cert.sf",
            "META-INF/sub/CERT.SF",
            "META-INF/services/SIG-x",
            "assets/META-INF/CERT.SF",
            "META-INF/MANIFEST.MF.bak",
            "META-INF/",
            "",
        ] {
            assert!(!is_signing_metadata(name), "{name} should be kept");
        }
    }
}
