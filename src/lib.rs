//! Read and write Java KeyStore (JKS) files.
//!
//! The JKS container is a password-authenticated archive of named entries,
//! each holding either a PKCS#8 private key with its X.509 certificate chain
//! or a single trusted certificate. Private keys are wrapped with the
//! proprietary "JavaSoft JKS Key Protector" stream cipher
//! (OID 1.3.6.1.4.1.42.2.17.1.1), and the whole file is sealed with a SHA-1
//! digest over the store password, a fixed whitener string, and the body.
//!
//! Certificates and keys are opaque byte sequences at this layer; parsing
//! them is left to the caller.
//!
//! ```
//! use jks::{Certificate, KeyStore, TrustedCertificateEntry};
//!
//! let mut ks = KeyStore::new();
//! ks.set_trusted_certificate_entry(
//!     "root",
//!     TrustedCertificateEntry {
//!         creation_time: 0,
//!         certificate: Certificate {
//!             cert_type: "X509".to_string(),
//!             content: vec![0x30, 0x03, 0x02, 0x01, 0x01],
//!         },
//!     },
//! )?;
//!
//! let mut out = Vec::new();
//! ks.store(&mut out, b"changeit")?;
//!
//! let mut reloaded = KeyStore::new();
//! reloaded.load(out.as_slice(), b"changeit")?;
//! assert!(reloaded.is_trusted_certificate_entry("root"));
//! # Ok::<(), jks::Error>(())
//! ```

mod decoder;
mod encoder;
mod entry;
mod error;
mod keyprotector;
mod keystore;
mod password;

pub use entry::{Certificate, Entry, PrivateKeyEntry, TrustedCertificateEntry};
pub use error::{Error, Result};
pub use keystore::KeyStore;

/// Certificate type synthesized for version-1 files, which omit the type string.
pub const DEFAULT_CERTIFICATE_TYPE: &str = "X509";

// JKS wire-format constants.
pub(crate) const MAGIC: u32 = 0xFEEDFEED;
pub(crate) const VERSION_1: u32 = 1;
pub(crate) const VERSION_2: u32 = 2;
pub(crate) const PRIVATE_KEY_TAG: u32 = 1;
pub(crate) const TRUSTED_CERTIFICATE_TAG: u32 = 2;
pub(crate) const WHITENER: &[u8] = b"Mighty Aphrodite";
pub(crate) const DIGEST_LEN: usize = 20;
pub(crate) const SALT_LEN: usize = 20;
