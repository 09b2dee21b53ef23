use std::fmt;
use std::io;

/// Error type for keystore operations.
#[derive(Debug)]
pub enum Error {
    /// The underlying reader or writer failed.
    Io {
        what: &'static str,
        source: io::Error,
    },
    /// The stream ended in the middle of a field.
    UnexpectedEof(&'static str),
    /// The header magic is not `0xFEEDFEED`.
    BadMagic(u32),
    /// The header version is neither 1 nor 2.
    UnknownVersion(u32),
    /// An entry tag is neither 1 (private key) nor 2 (trusted certificate).
    UnknownEntryTag(u32),
    /// The trailing SHA-1 does not match the computed one. This is the
    /// wrong-store-password (or corruption) signal.
    BadDigest,
    /// The encrypted private key is malformed or its verification digest
    /// does not match. The latter is the wrong-key-password signal.
    InvalidPrivateKey(&'static str),
    /// The encrypted private key uses an algorithm other than the JKS
    /// key protector.
    UnsupportedAlgorithm(String),
    /// No entry exists under the alias.
    EntryNotFound(String),
    /// An entry exists under the alias but has the other variant.
    WrongEntryType(String),
    /// A private key entry was inserted with an empty key.
    EmptyPrivateKey,
    /// A certificate was inserted with an empty type string.
    EmptyCertificateType,
    /// A certificate was inserted with empty content.
    EmptyCertificateContent,
    /// The password is shorter than the configured minimum.
    ShortPassword { len: usize, min: usize },
    /// A string or blob does not fit its length prefix.
    SequenceTooLong {
        what: &'static str,
        len: usize,
        max: u64,
    },
    /// A length-prefixed string on the wire is not valid UTF-8.
    InvalidString(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { what, source } => write!(f, "i/o error on {}: {}", what, source),
            Error::UnexpectedEof(what) => {
                write!(f, "unexpected end of stream while reading {}", what)
            }
            Error::BadMagic(found) => write!(f, "invalid keystore magic 0x{:08x}", found),
            Error::UnknownVersion(found) => write!(f, "unsupported keystore version {}", found),
            Error::UnknownEntryTag(found) => write!(f, "unknown entry tag {}", found),
            Error::BadDigest => {
                write!(f, "keystore digest mismatch (wrong password or corrupted data)")
            }
            Error::InvalidPrivateKey(reason) => write!(f, "invalid private key: {}", reason),
            Error::UnsupportedAlgorithm(oid) => {
                write!(f, "unsupported private key encryption algorithm {}", oid)
            }
            Error::EntryNotFound(alias) => write!(f, "entry not found: {}", alias),
            Error::WrongEntryType(alias) => write!(f, "wrong entry type: {}", alias),
            Error::EmptyPrivateKey => write!(f, "private key cannot be empty"),
            Error::EmptyCertificateType => write!(f, "certificate type cannot be empty"),
            Error::EmptyCertificateContent => write!(f, "certificate content cannot be empty"),
            Error::ShortPassword { len, min } => {
                write!(f, "password is {} bytes, minimum is {}", len, min)
            }
            Error::SequenceTooLong { what, len, max } => {
                write!(f, "{} is {} bytes long, maximum is {}", what, len, max)
            }
            Error::InvalidString(what) => write!(f, "{} is not valid UTF-8", what),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Error {
    /// Maps a transport error from a read, turning a short read into
    /// `UnexpectedEof` with the name of the field being read.
    pub(crate) fn from_read(source: io::Error, what: &'static str) -> Self {
        if source.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof(what)
        } else {
            Error::Io { what, source }
        }
    }

    pub(crate) fn from_write(source: io::Error, what: &'static str) -> Self {
        Error::Io { what, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_read_becomes_unexpected_eof() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(
            Error::from_read(io_err, "magic"),
            Error::UnexpectedEof("magic")
        ));
    }

    #[test]
    fn other_read_failures_stay_io() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        match Error::from_read(io_err, "alias") {
            Error::Io { what, .. } => assert_eq!(what, "alias"),
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn display_names_the_field() {
        let msg = Error::UnexpectedEof("entry tag").to_string();
        assert!(msg.contains("entry tag"));

        let msg = Error::BadMagic(0xCAFEBABE).to_string();
        assert!(msg.contains("0xcafebabe"));
    }
}
