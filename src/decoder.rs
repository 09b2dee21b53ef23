//! Digesting reader: every byte pulled off the stream is folded into a
//! running SHA-1, so the trailing integrity digest can be checked in a
//! single pass.

use digest::Digest;
use sha1::Sha1;
use std::io::Read;

use crate::entry::{Certificate, Entry, PrivateKeyEntry, TrustedCertificateEntry};
use crate::error::{Error, Result};
use crate::{
    DEFAULT_CERTIFICATE_TYPE, DIGEST_LEN, PRIVATE_KEY_TAG, TRUSTED_CERTIFICATE_TAG, VERSION_1,
    VERSION_2,
};

const CHUNK_SIZE: usize = 4096;

pub(crate) struct Decoder<R: Read> {
    reader: R,
    hasher: Sha1,
}

impl<R: Read> Decoder<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            hasher: Sha1::new(),
        }
    }

    /// Folds bytes into the running digest without consuming any input.
    /// Used to seed the hash with the widened password and the whitener
    /// before the first body byte.
    pub(crate) fn absorb(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Snapshot of the digest over everything consumed so far.
    pub(crate) fn digest(&self) -> [u8; DIGEST_LEN] {
        self.hasher.clone().finalize().into()
    }

    fn fill(&mut self, buf: &mut [u8], what: &'static str) -> Result<()> {
        self.reader
            .read_exact(buf)
            .map_err(|e| Error::from_read(e, what))?;
        self.hasher.update(&buf[..]);
        Ok(())
    }

    pub(crate) fn read_u16(&mut self, what: &'static str) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.fill(&mut buf, what)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub(crate) fn read_u32(&mut self, what: &'static str) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.fill(&mut buf, what)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub(crate) fn read_u64(&mut self, what: &'static str) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.fill(&mut buf, what)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Reads exactly `len` bytes. Read in bounded chunks so a corrupted
    /// length prefix cannot force a huge up-front allocation; the digest is
    /// updated only once the full run has arrived.
    pub(crate) fn read_bytes(&mut self, len: u32, what: &'static str) -> Result<Vec<u8>> {
        let len = len as usize;
        let mut out = Vec::with_capacity(len.min(CHUNK_SIZE));
        let mut buf = [0u8; CHUNK_SIZE];
        let mut remaining = len;

        while remaining > 0 {
            let n = remaining.min(CHUNK_SIZE);
            self.reader
                .read_exact(&mut buf[..n])
                .map_err(|e| Error::from_read(e, what))?;
            out.extend_from_slice(&buf[..n]);
            remaining -= n;
        }

        self.hasher.update(&out);
        Ok(out)
    }

    pub(crate) fn read_string(&mut self, what: &'static str) -> Result<String> {
        let len = self.read_u16(what)?;
        let body = self.read_bytes(u32::from(len), what)?;
        String::from_utf8(body).map_err(|_| Error::InvalidString(what))
    }

    /// Reads the 20 trailing digest bytes. These are deliberately not folded
    /// into the running hash.
    pub(crate) fn read_trailer_digest(&mut self) -> Result<[u8; DIGEST_LEN]> {
        let mut buf = [0u8; DIGEST_LEN];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| Error::from_read(e, "trailing digest"))?;
        Ok(buf)
    }

    fn read_certificate(&mut self, version: u32) -> Result<Certificate> {
        let cert_type = match version {
            // Version 1 files carry no type string.
            VERSION_1 => DEFAULT_CERTIFICATE_TYPE.to_string(),
            VERSION_2 => self.read_string("certificate type")?,
            other => return Err(Error::UnknownVersion(other)),
        };

        let len = self.read_u32("certificate length")?;
        let content = self.read_bytes(len, "certificate content")?;

        Ok(Certificate { cert_type, content })
    }

    fn read_private_key_entry(&mut self, version: u32) -> Result<PrivateKeyEntry> {
        let creation_time = self.read_u64("creation timestamp")? as i64;

        let key_len = self.read_u32("encrypted key length")?;
        let encrypted_key = self.read_bytes(key_len, "encrypted private key")?;

        let cert_count = self.read_u32("certificate count")?;
        let mut chain = Vec::new();
        for _ in 0..cert_count {
            chain.push(self.read_certificate(version)?);
        }

        // The key stays wrapped until the caller asks for it with the key
        // password.
        Ok(PrivateKeyEntry::from_encrypted(
            creation_time,
            encrypted_key,
            chain,
        ))
    }

    fn read_trusted_certificate_entry(&mut self, version: u32) -> Result<TrustedCertificateEntry> {
        let creation_time = self.read_u64("creation timestamp")? as i64;
        let certificate = self.read_certificate(version)?;

        Ok(TrustedCertificateEntry {
            creation_time,
            certificate,
        })
    }

    pub(crate) fn read_entry(&mut self, version: u32) -> Result<(String, Entry)> {
        let tag = self.read_u32("entry tag")?;
        let alias = self.read_string("alias")?;

        match tag {
            PRIVATE_KEY_TAG => {
                let entry = self.read_private_key_entry(version)?;
                Ok((alias, Entry::PrivateKey(entry)))
            }
            TRUSTED_CERTIFICATE_TAG => {
                let entry = self.read_trusted_certificate_entry(version)?;
                Ok((alias, Entry::TrustedCert(entry)))
            }
            other => Err(Error::UnknownEntryTag(other)),
        }
    }
}
