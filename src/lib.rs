//! Signing of JAR and APK archives with the v1 (manifest based) signature scheme.
//!
//! The pieces, bottom up:
//!
//!  - [`wrap`]: the 72-byte line wrapping applied to every manifest-format file
//!  - [`manifest`]: parsing and serializing `MANIFEST.MF`-style documents
//!  - [`digest`]: SHA-1 digests of entry contents, whole manifests and single manifest sections
//!  - [`exclude`]: recognizing signing metadata left over from a previous signature
//!  - [`archive`]: the archive container seam, with ZIP, directory and in-memory backends
//!  - [`signing`]: loading keys and producing the PKCS#7 signature block
//!  - [`sign`]: putting it all together

pub mod archive;
pub mod digest;
pub mod exclude;
pub mod manifest;
pub mod sign;
pub mod signing;
pub mod wrap;

/// The path of the manifest inside a signed archive.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

/// The path of the signature file inside a signed archive.
pub const SIGNATURE_FILE_PATH: &str = "META-INF/CERT.SF";
