use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::entry::{Certificate, Entry, PrivateKeyEntry, TrustedCertificateEntry};
use crate::error::{Error, Result};
use crate::keyprotector::constant_time_eq;
use crate::password::WidenedPassword;
use crate::{MAGIC, VERSION_1, VERSION_2, WHITENER};

/// A JKS keystore: a mapping from alias to entry, with the load and store
/// operations of the binary container format.
///
/// Aliases are lowercased on every insert, lookup, and delete unless
/// [`KeyStore::with_case_exact_aliases`] is set. Private keys are encrypted
/// when they are inserted, with a password that may differ from the store
/// password, and decrypted only on demand.
pub struct KeyStore {
    entries: HashMap<String, Entry>,
    rng: Box<dyn RngCore>,
    ordered_aliases: bool,
    case_exact_aliases: bool,
    min_password_len: usize,
}

impl KeyStore {
    /// Creates an empty keystore with the system CSPRNG and default options.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            rng: Box::new(OsRng),
            ordered_aliases: false,
            case_exact_aliases: false,
            min_password_len: 0,
        }
    }

    /// Sorts aliases alphabetically in [`KeyStore::aliases`] and in the
    /// serialization order of [`KeyStore::store`].
    pub fn with_ordered_aliases(mut self) -> Self {
        self.ordered_aliases = true;
        self
    }

    /// Preserves the original case of aliases instead of lowercasing them.
    pub fn with_case_exact_aliases(mut self) -> Self {
        self.case_exact_aliases = true;
        self
    }

    /// Rejects store and key passwords shorter than `min` bytes.
    pub fn with_min_password_len(mut self, min: usize) -> Self {
        self.min_password_len = min;
        self
    }

    /// Replaces the salt source used when encrypting private keys. The
    /// default is the operating system CSPRNG; tests inject deterministic
    /// generators.
    pub fn with_rng<R: RngCore + 'static>(mut self, rng: R) -> Self {
        self.rng = Box::new(rng);
        self
    }

    /// Serializes the keystore, sealing it with a SHA-1 digest derived from
    /// `password`.
    pub fn store<W: Write>(&self, writer: W, password: &[u8]) -> Result<()> {
        self.check_password(password)?;

        let mut enc = Encoder::new(writer);
        let widened = WidenedPassword::new(password);
        enc.absorb(widened.as_bytes());
        drop(widened);
        enc.absorb(WHITENER);

        enc.write_u32(MAGIC, "magic")?;
        // The writer always emits the latest version.
        enc.write_u32(VERSION_2, "version")?;

        let count = self.entries.len();
        if count as u64 > u64::from(u32::MAX) {
            return Err(Error::SequenceTooLong {
                what: "entry count",
                len: count,
                max: u64::from(u32::MAX),
            });
        }
        enc.write_u32(count as u32, "entry count")?;

        let mut items: Vec<(&String, &Entry)> = self.entries.iter().collect();
        if self.ordered_aliases {
            items.sort_by(|a, b| a.0.cmp(b.0));
        }

        for (alias, entry) in items {
            match entry {
                Entry::PrivateKey(pke) => enc.write_private_key_entry(alias, pke)?,
                Entry::TrustedCert(tce) => enc.write_trusted_certificate_entry(alias, tce)?,
            }
        }

        enc.write_trailer_digest()
    }

    /// Reads a keystore from `reader` and verifies the trailing digest with
    /// `password`. Entries are merged into this instance, last write wins
    /// for duplicate aliases. On error the map may be partially populated
    /// and the instance should be discarded.
    pub fn load<R: Read>(&mut self, reader: R, password: &[u8]) -> Result<()> {
        let mut dec = Decoder::new(reader);
        let widened = WidenedPassword::new(password);
        dec.absorb(widened.as_bytes());
        drop(widened);
        dec.absorb(WHITENER);

        let magic = dec.read_u32("magic")?;
        if magic != MAGIC {
            return Err(Error::BadMagic(magic));
        }

        let version = dec.read_u32("version")?;
        if version != VERSION_1 && version != VERSION_2 {
            return Err(Error::UnknownVersion(version));
        }

        let count = dec.read_u32("entry count")?;
        for _ in 0..count {
            let (alias, entry) = dec.read_entry(version)?;
            self.entries.insert(self.convert_alias(&alias), entry);
        }

        let computed = dec.digest();
        let actual = dec.read_trailer_digest()?;
        if !constant_time_eq(&computed, &actual) {
            return Err(Error::BadDigest);
        }

        Ok(())
    }

    /// Validates and inserts a private key entry, encrypting its key with
    /// `password`. The password may differ from the store password; the
    /// plaintext is wiped once the wrapped blob exists.
    pub fn set_private_key_entry(
        &mut self,
        alias: &str,
        entry: PrivateKeyEntry,
        password: &[u8],
    ) -> Result<()> {
        entry.validate()?;
        self.check_password(password)?;

        let entry = entry.into_encrypted(self.rng.as_mut(), password)?;
        self.entries
            .insert(self.convert_alias(alias), Entry::PrivateKey(entry));

        Ok(())
    }

    /// Returns a decrypted copy of the private key entry under `alias`.
    /// A wrong `password` surfaces as [`Error::InvalidPrivateKey`].
    pub fn get_private_key_entry(&self, alias: &str, password: &[u8]) -> Result<PrivateKeyEntry> {
        match self.entries.get(&self.convert_alias(alias)) {
            Some(Entry::PrivateKey(pke)) => pke.to_decrypted(password),
            Some(Entry::TrustedCert(_)) => Err(Error::WrongEntryType(alias.to_string())),
            None => Err(Error::EntryNotFound(alias.to_string())),
        }
    }

    /// Returns the certificate chain of the private key entry under `alias`
    /// without touching the encrypted key.
    pub fn get_private_key_entry_certificate_chain(&self, alias: &str) -> Result<Vec<Certificate>> {
        match self.entries.get(&self.convert_alias(alias)) {
            Some(Entry::PrivateKey(pke)) => Ok(pke.certificate_chain.clone()),
            Some(Entry::TrustedCert(_)) => Err(Error::WrongEntryType(alias.to_string())),
            None => Err(Error::EntryNotFound(alias.to_string())),
        }
    }

    /// Validates and inserts a trusted certificate entry.
    pub fn set_trusted_certificate_entry(
        &mut self,
        alias: &str,
        entry: TrustedCertificateEntry,
    ) -> Result<()> {
        entry.validate()?;
        self.entries
            .insert(self.convert_alias(alias), Entry::TrustedCert(entry));

        Ok(())
    }

    pub fn get_trusted_certificate_entry(&self, alias: &str) -> Result<TrustedCertificateEntry> {
        match self.entries.get(&self.convert_alias(alias)) {
            Some(Entry::TrustedCert(tce)) => Ok(tce.clone()),
            Some(Entry::PrivateKey(_)) => Err(Error::WrongEntryType(alias.to_string())),
            None => Err(Error::EntryNotFound(alias.to_string())),
        }
    }

    /// True if a private key entry exists under `alias`.
    pub fn is_private_key_entry(&self, alias: &str) -> bool {
        matches!(
            self.entries.get(&self.convert_alias(alias)),
            Some(Entry::PrivateKey(_))
        )
    }

    /// True if a trusted certificate entry exists under `alias`.
    pub fn is_trusted_certificate_entry(&self, alias: &str) -> bool {
        matches!(
            self.entries.get(&self.convert_alias(alias)),
            Some(Entry::TrustedCert(_))
        )
    }

    /// Removes the entry under `alias`, if any.
    pub fn delete_entry(&mut self, alias: &str) {
        self.entries.remove(&self.convert_alias(alias));
    }

    /// Snapshot of all aliases, sorted alphabetically when the keystore was
    /// created with [`KeyStore::with_ordered_aliases`].
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.entries.keys().cloned().collect();
        if self.ordered_aliases {
            aliases.sort();
        }
        aliases
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn convert_alias(&self, alias: &str) -> String {
        if self.case_exact_aliases {
            alias.to_string()
        } else {
            alias.to_lowercase()
        }
    }

    fn check_password(&self, password: &[u8]) -> Result<()> {
        if password.len() < self.min_password_len {
            return Err(Error::ShortPassword {
                len: password.len(),
                min: self.min_password_len,
            });
        }
        Ok(())
    }
}

impl Default for KeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("entries", &self.entries)
            .field("ordered_aliases", &self.ordered_aliases)
            .field("case_exact_aliases", &self.case_exact_aliases)
            .field("min_password_len", &self.min_password_len)
            .finish()
    }
}
