use std::fmt;

use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::keyprotector;

/// A keystore entry.
#[derive(Clone, Debug)]
pub enum Entry {
    PrivateKey(PrivateKeyEntry),
    TrustedCert(TrustedCertificateEntry),
}

/// An encoded certificate with its type, commonly `"X509"`. The content is
/// an opaque DER blob; this crate never parses it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Certificate {
    pub cert_type: String,
    pub content: Vec<u8>,
}

impl Certificate {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.cert_type.is_empty() {
            return Err(Error::EmptyCertificateType);
        }
        if self.content.is_empty() {
            return Err(Error::EmptyCertificateContent);
        }
        Ok(())
    }
}

/// A trusted certificate entry: one certificate and its creation time in
/// unix-epoch milliseconds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TrustedCertificateEntry {
    pub creation_time: i64,
    pub certificate: Certificate,
}

impl TrustedCertificateEntry {
    pub(crate) fn validate(&self) -> Result<()> {
        self.certificate.validate()
    }
}

/// Key material is either the plaintext PKCS#8 key or the wrapped blob the
/// key protector produced; never both. Moving between the states goes
/// through the explicit transitions below. Plaintext is wiped on drop.
#[derive(Clone)]
enum KeyMaterial {
    Plain(Zeroizing<Vec<u8>>),
    Encrypted(Vec<u8>),
}

/// A private key entry: PKCS#8 key material and its certificate chain,
/// leaf first.
///
/// Entries are constructed with [`PrivateKeyEntry::new`] around a plaintext
/// key. Inside a [`crate::KeyStore`] the key is always held encrypted;
/// plaintext is only reachable on the copies
/// [`crate::KeyStore::get_private_key_entry`] hands out.
#[derive(Clone)]
pub struct PrivateKeyEntry {
    /// Creation time in unix-epoch milliseconds.
    pub creation_time: i64,
    pub certificate_chain: Vec<Certificate>,
    key: KeyMaterial,
}

impl PrivateKeyEntry {
    pub fn new(
        creation_time: i64,
        private_key: Vec<u8>,
        certificate_chain: Vec<Certificate>,
    ) -> Self {
        Self {
            creation_time,
            certificate_chain,
            key: KeyMaterial::Plain(Zeroizing::new(private_key)),
        }
    }

    pub(crate) fn from_encrypted(
        creation_time: i64,
        encrypted_key: Vec<u8>,
        certificate_chain: Vec<Certificate>,
    ) -> Self {
        Self {
            creation_time,
            certificate_chain,
            key: KeyMaterial::Encrypted(encrypted_key),
        }
    }

    /// The plaintext PKCS#8 key, present only while the entry is in the
    /// decrypted state.
    pub fn private_key(&self) -> Option<&[u8]> {
        match &self.key {
            KeyMaterial::Plain(key) => Some(key.as_slice()),
            KeyMaterial::Encrypted(_) => None,
        }
    }

    pub(crate) fn encrypted_key(&self) -> Option<&[u8]> {
        match &self.key {
            KeyMaterial::Plain(_) => None,
            KeyMaterial::Encrypted(blob) => Some(blob),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let KeyMaterial::Plain(key) = &self.key {
            if key.is_empty() {
                return Err(Error::EmptyPrivateKey);
            }
        }
        for cert in &self.certificate_chain {
            cert.validate()?;
        }
        Ok(())
    }

    /// Transition to the encrypted state. The plaintext buffer is consumed
    /// and wiped; an already-encrypted entry passes through unchanged.
    pub(crate) fn into_encrypted(self, rng: &mut dyn RngCore, password: &[u8]) -> Result<Self> {
        let plain = match self.key {
            KeyMaterial::Plain(plain) => plain,
            KeyMaterial::Encrypted(_) => return Ok(self),
        };

        let blob = keyprotector::encrypt(rng, &plain, password)?;

        Ok(Self {
            creation_time: self.creation_time,
            certificate_chain: self.certificate_chain,
            key: KeyMaterial::Encrypted(blob),
        })
    }

    /// Produces a decrypted copy, dropping the wrapped blob from it.
    pub(crate) fn to_decrypted(&self, password: &[u8]) -> Result<Self> {
        let blob = match &self.key {
            KeyMaterial::Encrypted(blob) => blob,
            KeyMaterial::Plain(_) => return Ok(self.clone()),
        };

        let plain = keyprotector::decrypt(blob, password)?;

        Ok(Self {
            creation_time: self.creation_time,
            certificate_chain: self.certificate_chain.clone(),
            key: KeyMaterial::Plain(Zeroizing::new(plain)),
        })
    }
}

impl fmt::Debug for PrivateKeyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.key {
            KeyMaterial::Plain(_) => "[REDACTED]",
            KeyMaterial::Encrypted(_) => "[ENCRYPTED]",
        };
        f.debug_struct("PrivateKeyEntry")
            .field("creation_time", &self.creation_time)
            .field("certificate_chain", &self.certificate_chain)
            .field("private_key", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn cert(content: &[u8]) -> Certificate {
        Certificate {
            cert_type: "X509".to_string(),
            content: content.to_vec(),
        }
    }

    #[test]
    fn new_entry_exposes_plaintext() {
        let entry = PrivateKeyEntry::new(1, vec![1, 2, 3], vec![cert(&[9])]);
        assert_eq!(entry.private_key(), Some(&[1u8, 2, 3][..]));
        assert!(entry.encrypted_key().is_none());
    }

    #[test]
    fn encrypted_state_hides_plaintext() {
        let entry = PrivateKeyEntry::new(1, vec![1, 2, 3], vec![]);
        let mut rng = StepRng::new(0, 1);
        let entry = entry.into_encrypted(&mut rng, b"pw").unwrap();
        assert!(entry.private_key().is_none());
        assert!(entry.encrypted_key().is_some());
    }

    #[test]
    fn transitions_round_trip() {
        let entry = PrivateKeyEntry::new(7, vec![0xAA; 33], vec![cert(&[1, 2])]);
        let mut rng = StepRng::new(0, 1);
        let sealed = entry.into_encrypted(&mut rng, b"pw").unwrap();
        let opened = sealed.to_decrypted(b"pw").unwrap();
        assert_eq!(opened.private_key(), Some(&[0xAA; 33][..]));
        assert!(opened.encrypted_key().is_none());
        assert_eq!(opened.creation_time, 7);
        assert_eq!(opened.certificate_chain, vec![cert(&[1, 2])]);
    }

    #[test]
    fn validate_rejects_empty_private_key() {
        let entry = PrivateKeyEntry::new(0, vec![], vec![]);
        assert!(matches!(entry.validate(), Err(Error::EmptyPrivateKey)));
    }

    #[test]
    fn validate_rejects_bad_chain_certificates() {
        let mut bad_type = cert(&[1]);
        bad_type.cert_type.clear();
        let entry = PrivateKeyEntry::new(0, vec![1], vec![bad_type]);
        assert!(matches!(entry.validate(), Err(Error::EmptyCertificateType)));

        let entry = PrivateKeyEntry::new(0, vec![1], vec![cert(&[])]);
        assert!(matches!(
            entry.validate(),
            Err(Error::EmptyCertificateContent)
        ));
    }

    #[test]
    fn empty_chain_is_valid() {
        let entry = PrivateKeyEntry::new(0, vec![1], vec![]);
        assert!(entry.validate().is_ok());
    }

    #[test]
    fn debug_redacts_key_material() {
        let entry = PrivateKeyEntry::new(0, b"topsecret".to_vec(), vec![]);
        let printed = format!("{:?}", entry);
        assert!(!printed.contains("topsecret"));
        assert!(printed.contains("[REDACTED]"));
    }
}
