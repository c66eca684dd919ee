//! PKCS#7 detached signatures over the signature file.
//!
//! The signing core only decides which bytes get signed; producing the signature container is
//! behind the [`SignatureProvider`] trait.  [`Pkcs7Signer`] implements it with OpenSSL, producing
//! the DER-encoded PKCS#7 `SignedData` that goes into `META-INF/CERT.RSA` or `META-INF/CERT.EC`.
//!
//! Equivalent signatures can be produced with the `openssl` command-line tool:
//!
//! ```bash
//! openssl smime -sign -binary -in CERT.SF -signer cert.pem -inkey key.pem \
//!     -outform DER -noattr -out CERT.RSA
//! ```

use std::{fs, path::Path};

use anyhow::Context;
use log::debug;
use openssl::{
    error::ErrorStack,
    pkcs7::{Pkcs7, Pkcs7Flags},
    pkey::{Id, PKey, Private},
    stack::Stack,
    x509::X509,
};
use thiserror::Error;

/// Loading a key or signing with it failed.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("malformed certificate")]
    MalformedCertificate(#[source] ErrorStack),
    #[error("malformed private key")]
    MalformedKey(#[source] ErrorStack),
    #[error("encrypted certificates currently not supported")]
    EncryptedCertificate,
    #[error("encrypted private keys currently not supported")]
    EncryptedKey,
    #[error("unhandled type of private key: {0}")]
    UnsupportedKeyType(String),
    #[error("certificate public key does not match the provided private key")]
    KeyMismatch,
    #[error("PKCS#7 signing failed")]
    Sign(#[source] ErrorStack),
}

/// The family of the signing key, which determines the name of the signature entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Ec,
}

impl KeyAlgorithm {
    /// The archive path of the signature block for this kind of key.
    pub fn signature_path(self) -> &'static str {
        match self {
            KeyAlgorithm::Rsa => "META-INF/CERT.RSA",
            // *.EC is what ECDSA-signed .apk files use
            KeyAlgorithm::Ec => "META-INF/CERT.EC",
        }
    }
}

/// Something that can produce a detached signature container over a byte payload.
pub trait SignatureProvider {
    fn key_algorithm(&self) -> KeyAlgorithm;

    /// Signs `payload`, returning the signature container.  The payload itself is not embedded.
    fn sign_detached(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>>;
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn is_pem(data: &[u8]) -> bool {
    data.trim_ascii_start().starts_with(b"-----BEGIN ")
}

fn key_type_name(id: Id) -> String {
    match id {
        Id::DSA => "DSA".to_string(),
        Id::DH => "DH".to_string(),
        other => format!("{other:?}"),
    }
}

/// Parses a certificate in PEM or DER form.
pub fn parse_certificate(data: &[u8]) -> Result<X509, KeyError> {
    if !is_pem(data) {
        return X509::from_der(data).map_err(KeyError::MalformedCertificate);
    }
    if contains(data, b"Proc-Type: 4,ENCRYPTED") {
        return Err(KeyError::EncryptedCertificate);
    }
    X509::from_pem(data).map_err(KeyError::MalformedCertificate)
}

/// Parses an unencrypted PKCS#8 private key, either raw DER (the usual `.pk8` file) or PEM.
pub fn parse_private_key(data: &[u8]) -> Result<PKey<Private>, KeyError> {
    if !is_pem(data) {
        return PKey::private_key_from_pkcs8(data).map_err(KeyError::MalformedKey);
    }
    // Refuse before OpenSSL gets a chance to ask for a passphrase
    if contains(data, b"ENCRYPTED") {
        return Err(KeyError::EncryptedKey);
    }
    PKey::private_key_from_pem(data).map_err(KeyError::MalformedKey)
}

/// A certificate and private key pair producing PKCS#7 detached signatures.
pub struct Pkcs7Signer {
    cert: X509,
    key: PKey<Private>,
    algorithm: KeyAlgorithm,
}

impl std::fmt::Debug for Pkcs7Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs7Signer")
            .field("cert_subject", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

impl Pkcs7Signer {
    /// Pairs a certificate with its private key.
    ///
    /// Fails if the key is neither RSA nor EC, or if the certificate belongs to another key.
    /// Doing these checks here means a bad key is reported before any output is written.
    pub fn new(cert: X509, key: PKey<Private>) -> Result<Self, KeyError> {
        let algorithm = match key.id() {
            Id::RSA => KeyAlgorithm::Rsa,
            Id::EC => KeyAlgorithm::Ec,
            other => return Err(KeyError::UnsupportedKeyType(key_type_name(other))),
        };

        let cert_pubkey = cert.public_key().map_err(KeyError::MalformedCertificate)?;
        if !cert_pubkey.public_eq(&key) {
            return Err(KeyError::KeyMismatch);
        }

        Ok(Self {
            cert,
            key,
            algorithm,
        })
    }

    /// Loads from certificate and key data, see [`parse_certificate()`] and
    /// [`parse_private_key()`] for the accepted formats.
    pub fn from_bytes(cert: &[u8], key: &[u8]) -> Result<Self, KeyError> {
        Self::new(parse_certificate(cert)?, parse_private_key(key)?)
    }

    pub fn from_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let (cert_path, key_path) = (cert_path.as_ref(), key_path.as_ref());
        let cert_data =
            fs::read(cert_path).with_context(|| format!("reading {}", cert_path.display()))?;
        let key_data =
            fs::read(key_path).with_context(|| format!("reading {}", key_path.display()))?;

        let cert =
            parse_certificate(&cert_data).with_context(|| cert_path.display().to_string())?;
        let key =
            parse_private_key(&key_data).with_context(|| key_path.display().to_string())?;
        let signer = Self::new(cert, key)
            .with_context(|| format!("{} and {}", cert_path.display(), key_path.display()))?;

        debug!("loaded {:?} signing key from {}", signer.algorithm, key_path.display());
        Ok(signer)
    }
}

impl SignatureProvider for Pkcs7Signer {
    fn key_algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    fn sign_detached(&self, payload: &[u8]) -> anyhow::Result<Vec<u8>> {
        let certs = Stack::new().map_err(KeyError::Sign)?;
        let flags = Pkcs7Flags::DETACHED | Pkcs7Flags::BINARY | Pkcs7Flags::NOATTR;

        let pkcs7 = Pkcs7::sign(&self.cert, &self.key, &certs, payload, flags)
            .map_err(KeyError::Sign)?;

        Ok(pkcs7.to_der().map_err(KeyError::Sign)?)
    }
}
