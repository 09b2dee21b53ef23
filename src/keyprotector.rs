//! The proprietary "JavaSoft JKS Key Protector" stream cipher
//! (OID 1.3.6.1.4.1.42.2.17.1.1).
//!
//! A private key is wrapped as `salt(20) || ciphertext || digest(20)` inside
//! a DER `EncryptedPrivateKeyInfo`. The keystream is an iterated SHA-1 over
//! the widened password and the previous block, seeded with the salt; the
//! trailing digest is SHA-1 over the widened password and the plaintext and
//! doubles as the wrong-password check.

use der::asn1::{Null, ObjectIdentifier, OctetStringRef};
use der::{Decode, Encode, Sequence};
use digest::Digest;
use rand::RngCore;
use sha1::Sha1;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::password::WidenedPassword;
use crate::{DIGEST_LEN, SALT_LEN};

const KEY_PROTECTOR_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.6.1.4.1.42.2.17.1.1");

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct AlgorithmIdentifier {
    algorithm: ObjectIdentifier,
    parameters: Null,
}

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct EncryptedPrivateKeyInfo<'a> {
    algorithm: AlgorithmIdentifier,
    private_key: OctetStringRef<'a>,
}

/// Encrypts a plaintext key blob and wraps it in the DER structure.
pub(crate) fn encrypt(rng: &mut dyn RngCore, plain: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    let widened = WidenedPassword::new(password);

    let mut salt = [0u8; SALT_LEN];
    rng.fill_bytes(&mut salt);

    let keystream = keystream(&widened, &salt, plain.len());

    let mut inner = Vec::with_capacity(SALT_LEN + plain.len() + DIGEST_LEN);
    inner.extend_from_slice(&salt);
    inner.extend(plain.iter().zip(keystream.iter()).map(|(p, k)| p ^ k));
    inner.extend_from_slice(&verification_digest(&widened, plain));

    let info = EncryptedPrivateKeyInfo {
        algorithm: AlgorithmIdentifier {
            algorithm: KEY_PROTECTOR_OID,
            parameters: Null,
        },
        private_key: OctetStringRef::new(&inner)
            .map_err(|_| Error::InvalidPrivateKey("encrypted key does not fit an octet string"))?,
    };

    info.to_der()
        .map_err(|_| Error::InvalidPrivateKey("failed to encode encrypted key"))
}

/// Unwraps and decrypts a key blob. A verification digest mismatch is the
/// wrong-key-password signal.
pub(crate) fn decrypt(blob: &[u8], password: &[u8]) -> Result<Vec<u8>> {
    // from_der rejects trailing bytes as well as malformed structures.
    let info = EncryptedPrivateKeyInfo::from_der(blob)
        .map_err(|_| Error::InvalidPrivateKey("malformed encrypted key encoding"))?;

    if info.algorithm.algorithm != KEY_PROTECTOR_OID {
        return Err(Error::UnsupportedAlgorithm(
            info.algorithm.algorithm.to_string(),
        ));
    }

    let inner = info.private_key.as_bytes();
    if inner.len() < SALT_LEN + DIGEST_LEN {
        return Err(Error::InvalidPrivateKey(
            "encrypted key shorter than salt and digest",
        ));
    }

    let ct_len = inner.len() - SALT_LEN - DIGEST_LEN;
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&inner[..SALT_LEN]);
    let ciphertext = &inner[SALT_LEN..SALT_LEN + ct_len];
    let tag = &inner[SALT_LEN + ct_len..];

    let widened = WidenedPassword::new(password);
    let keystream = keystream(&widened, &salt, ct_len);

    let plain: Vec<u8> = ciphertext
        .iter()
        .zip(keystream.iter())
        .map(|(c, k)| c ^ k)
        .collect();

    let computed = verification_digest(&widened, &plain);
    if !constant_time_eq(&computed, tag) {
        return Err(Error::InvalidPrivateKey("verification digest mismatch"));
    }

    Ok(plain)
}

/// Generates `len` keystream bytes: each 20-byte block is
/// `SHA1(widened_password || previous_block)`, starting from the salt. The
/// final block is truncated to fit; a zero-length request runs zero rounds.
fn keystream(widened: &WidenedPassword, salt: &[u8; SALT_LEN], len: usize) -> Zeroizing<Vec<u8>> {
    let mut stream = Zeroizing::new(vec![0u8; len]);
    let mut block: [u8; DIGEST_LEN] = *salt;

    for chunk in stream.chunks_mut(DIGEST_LEN) {
        let mut sha = Sha1::new();
        sha.update(widened.as_bytes());
        sha.update(block);
        block = sha.finalize().into();
        chunk.copy_from_slice(&block[..chunk.len()]);
    }

    stream
}

fn verification_digest(widened: &WidenedPassword, plain: &[u8]) -> [u8; DIGEST_LEN] {
    let mut sha = Sha1::new();
    sha.update(widened.as_bytes());
    sha.update(plain);
    sha.finalize().into()
}

/// Comparison that does not leak the position of the first mismatch.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
