//! Signing an archive with the v1 (JAR) signature scheme.
//!
//! Signing produces three entries:
//!
//!  - `META-INF/MANIFEST.MF`: the SHA-1 digest of every signed entry
//!  - `META-INF/CERT.SF`: the digest of the manifest, and of every entry's manifest block
//!  - `META-INF/CERT.RSA` or `META-INF/CERT.EC`: a detached PKCS#7 signature over `CERT.SF`
//!
//! followed by a copy of every signed entry.  Any previous signing metadata in the source is
//! dropped and regenerated.  Only the main section of an existing manifest and the non-digest
//! attributes of its entry sections are carried over.

use std::io::{self, Write};

use anyhow::{Context, Result};
use log::{debug, info, trace};

use crate::{
    archive::{ArchiveEntry, ArchiveReader, ArchiveWriter, EntryOptions},
    digest::{
        digest_bytes, digest_reader, entry_block_digest, manifest_digest, Sha1Digest,
        DIGEST_ATTRIBUTE, MANIFEST_DIGEST_ATTRIBUTE,
    },
    exclude::is_signing_metadata,
    manifest::{Attributes, Manifest},
    signing::SignatureProvider,
    MANIFEST_PATH, SIGNATURE_FILE_PATH,
};

/// Settings for a signing run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignerConfig {
    /// Value of the `Created-By` attribute of the signature file, and of a freshly created
    /// manifest.
    pub created_by: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            created_by: "1.0 (Android SignApk)".to_string(),
        }
    }
}

impl SignerConfig {
    /// The main section used when the source has no manifest.
    pub fn default_main_section(&self) -> Attributes {
        Attributes::from([
            "Manifest-Version: 1.0".to_string(),
            format!("Created-By: {}", self.created_by),
        ])
    }
}

/// What a signing run produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningReport {
    /// The digest of the written `META-INF/MANIFEST.MF`
    pub manifest_digest: Sha1Digest,
    /// Where the signature block was written
    pub signature_path: &'static str,
    /// The number of entries covered by the signature
    pub signed_entries: usize,
}

/// Entries that get digested and copied: no directories, and no old signing metadata.
fn is_signable(entry: &ArchiveEntry) -> bool {
    !entry.is_dir && !is_signing_metadata(&entry.name)
}

/// Returns the signable entries of the source, sorted by name for determinism.
fn signable_entries(reader: &impl ArchiveReader) -> Vec<ArchiveEntry> {
    let mut entries: Vec<_> = reader
        .entries()
        .iter()
        .filter(|entry| is_signable(entry))
        .cloned()
        .collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Returns the parsed `META-INF/MANIFEST.MF` of the source, or a new manifest with an
/// initialized main section if there is none.
pub fn read_or_init_manifest(
    reader: &mut impl ArchiveReader,
    config: &SignerConfig,
) -> Result<Manifest> {
    let has_manifest = reader
        .entries()
        .iter()
        .any(|entry| entry.name == MANIFEST_PATH && !entry.is_dir);
    if !has_manifest {
        debug!("no {MANIFEST_PATH} in source, starting a new one");
        return Ok(Manifest::with_main(config.default_main_section()));
    }

    let content = reader.open(MANIFEST_PATH)?;
    Manifest::parse(content).with_context(|| format!("reading {MANIFEST_PATH}"))
}

/// Builds the manifest for the signed archive.
///
/// The main section is taken from `old`.  Every signable entry gets a section with its content
/// digest.  If `old` already has a section for the entry, its other attributes are kept and only
/// the stale digest is replaced.
pub fn build_manifest(reader: &mut impl ArchiveReader, old: &Manifest) -> Result<Manifest> {
    let mut manifest = Manifest::with_main(old.main().cloned().unwrap_or_default());

    for entry in signable_entries(reader) {
        let digest = {
            let mut content = reader.open(&entry.name)?;
            digest_reader(&mut content).with_context(|| format!("reading {}", entry.name))?
        };
        trace!("{} {digest:?}", entry.name);

        let mut attributes = old
            .section(&entry.name)
            .cloned()
            .unwrap_or_default()
            .without(DIGEST_ATTRIBUTE);
        attributes.insert(DIGEST_ATTRIBUTE, &digest.to_base64());
        manifest.insert(entry.name, attributes);
    }

    Ok(manifest)
}

/// Builds the signature file for a manifest.
///
/// Its main section holds the digest of the whole manifest, and there is one section per
/// non-empty manifest section holding the digest of that section's serialized block.
pub fn build_signature_file(manifest: &Manifest, config: &SignerConfig) -> io::Result<Manifest> {
    let mut main = Attributes::new();
    main.insert("Signature-Version", "1.0");
    main.insert("Created-By", &config.created_by);
    main.insert(
        MANIFEST_DIGEST_ATTRIBUTE,
        &manifest_digest(manifest)?.to_base64(),
    );

    let mut signature_file = Manifest::with_main(main);
    for (name, attributes) in manifest.entries() {
        if attributes.is_empty() {
            continue;
        }
        let digest = entry_block_digest(manifest, name)?;
        let mut section = Attributes::new();
        section.insert(DIGEST_ATTRIBUTE, &digest.to_base64());
        signature_file.insert(name, section);
    }

    Ok(signature_file)
}

fn write_entry(writer: &mut impl ArchiveWriter, name: &str, data: &[u8]) -> Result<()> {
    writer
        .start_entry(name, EntryOptions::default())?
        .write_all(data)
        .with_context(|| format!("writing {name} to output archive"))
}

/// Signs the contents of `reader`, writing the signed archive to `writer`.
///
/// The writer is not finished, that's up to the caller.  On error, whatever was written so far
/// is incomplete and should be discarded.
pub fn sign_archive(
    reader: &mut impl ArchiveReader,
    writer: &mut impl ArchiveWriter,
    signer: &impl SignatureProvider,
    config: &SignerConfig,
) -> Result<SigningReport> {
    // Copy main section of manifest from old archive, or create new one if absent, and
    // calculate the digests of all files
    let old_manifest = read_or_init_manifest(reader, config)?;
    let manifest = build_manifest(reader, &old_manifest)?;
    let manifest_bytes = manifest.to_bytes();
    write_entry(writer, MANIFEST_PATH, &manifest_bytes)?;

    // Generate the signature file, keeping its exact bytes for signing
    let signature_file =
        build_signature_file(&manifest, config).context("computing manifest digests")?;
    let signature_file_bytes = signature_file.to_bytes();
    write_entry(writer, SIGNATURE_FILE_PATH, &signature_file_bytes)?;

    let signature = signer
        .sign_detached(&signature_file_bytes)
        .with_context(|| format!("signing {SIGNATURE_FILE_PATH}"))?;
    let signature_path = signer.key_algorithm().signature_path();
    write_entry(writer, signature_path, &signature)?;

    // Copy all remaining files
    let entries = signable_entries(reader);
    for entry in &entries {
        debug!("+ {}", entry.name);
        let mut content = reader.open(&entry.name)?;
        let sink = writer.start_entry(&entry.name, entry.options())?;
        io::copy(&mut content, sink)
            .with_context(|| format!("cannot copy file {:?} to output archive", entry.name))?;
    }

    let report = SigningReport {
        manifest_digest: digest_bytes(&manifest_bytes),
        signature_path,
        signed_entries: entries.len(),
    };
    info!(
        "signed {} entries, manifest {:?}, signature in {}",
        report.signed_entries, report.manifest_digest, report.signature_path
    );
    Ok(report)
}
