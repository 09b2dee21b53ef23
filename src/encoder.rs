//! Digesting writer, the mirror of the decoder: every byte pushed to the
//! sink is folded into a running SHA-1 so the trailing integrity digest
//! falls out of the same pass that wrote the body.

use digest::Digest;
use sha1::Sha1;
use std::io::Write;

use crate::entry::{Certificate, PrivateKeyEntry, TrustedCertificateEntry};
use crate::error::{Error, Result};
use crate::{DIGEST_LEN, PRIVATE_KEY_TAG, TRUSTED_CERTIFICATE_TAG};

pub(crate) struct Encoder<W: Write> {
    writer: W,
    hasher: Sha1,
}

impl<W: Write> Encoder<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self {
            writer,
            hasher: Sha1::new(),
        }
    }

    /// Folds bytes into the running digest without emitting them.
    pub(crate) fn absorb(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub(crate) fn digest(&self) -> [u8; DIGEST_LEN] {
        self.hasher.clone().finalize().into()
    }

    fn put(&mut self, data: &[u8], what: &'static str) -> Result<()> {
        self.writer
            .write_all(data)
            .map_err(|e| Error::from_write(e, what))?;
        self.hasher.update(data);
        Ok(())
    }

    pub(crate) fn write_u16(&mut self, value: u16, what: &'static str) -> Result<()> {
        self.put(&value.to_be_bytes(), what)
    }

    pub(crate) fn write_u32(&mut self, value: u32, what: &'static str) -> Result<()> {
        self.put(&value.to_be_bytes(), what)
    }

    pub(crate) fn write_u64(&mut self, value: u64, what: &'static str) -> Result<()> {
        self.put(&value.to_be_bytes(), what)
    }

    pub(crate) fn write_string(&mut self, value: &str, what: &'static str) -> Result<()> {
        let len = value.len();
        if len > usize::from(u16::MAX) {
            return Err(Error::SequenceTooLong {
                what,
                len,
                max: u64::from(u16::MAX),
            });
        }
        self.write_u16(len as u16, what)?;
        self.put(value.as_bytes(), what)
    }

    /// Writes a `U32 length` prefix followed by the raw bytes.
    pub(crate) fn write_blob(&mut self, value: &[u8], what: &'static str) -> Result<()> {
        let len = value.len();
        if len as u64 > u64::from(u32::MAX) {
            return Err(Error::SequenceTooLong {
                what,
                len,
                max: u64::from(u32::MAX),
            });
        }
        self.write_u32(len as u32, what)?;
        self.put(value, what)
    }

    /// Writes the final digest. The trailer goes to the sink only; it is
    /// never folded back into the hash state.
    pub(crate) fn write_trailer_digest(&mut self) -> Result<()> {
        let digest = self.digest();
        self.writer
            .write_all(&digest)
            .map_err(|e| Error::from_write(e, "trailing digest"))?;
        Ok(())
    }

    // Certificates are always written in the version-2 encoding, with an
    // explicit type string.
    fn write_certificate(&mut self, cert: &Certificate) -> Result<()> {
        self.write_string(&cert.cert_type, "certificate type")?;
        self.write_blob(&cert.content, "certificate content")
    }

    pub(crate) fn write_private_key_entry(
        &mut self,
        alias: &str,
        entry: &PrivateKeyEntry,
    ) -> Result<()> {
        let encrypted_key = entry
            .encrypted_key()
            .ok_or(Error::InvalidPrivateKey("key has not been encrypted"))?;

        self.write_u32(PRIVATE_KEY_TAG, "entry tag")?;
        self.write_string(alias, "alias")?;
        self.write_u64(entry.creation_time as u64, "creation timestamp")?;
        self.write_blob(encrypted_key, "encrypted private key")?;

        let cert_count = entry.certificate_chain.len();
        if cert_count as u64 > u64::from(u32::MAX) {
            return Err(Error::SequenceTooLong {
                what: "certificate chain",
                len: cert_count,
                max: u64::from(u32::MAX),
            });
        }
        self.write_u32(cert_count as u32, "certificate count")?;
        for cert in &entry.certificate_chain {
            self.write_certificate(cert)?;
        }

        Ok(())
    }

    pub(crate) fn write_trusted_certificate_entry(
        &mut self,
        alias: &str,
        entry: &TrustedCertificateEntry,
    ) -> Result<()> {
        self.write_u32(TRUSTED_CERTIFICATE_TAG, "entry tag")?;
        self.write_string(alias, "alias")?;
        self.write_u64(entry.creation_time as u64, "creation timestamp")?;
        self.write_certificate(&entry.certificate)
    }
}
