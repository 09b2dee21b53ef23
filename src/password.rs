use std::fmt;

use zeroize::Zeroize;

/// A password expanded to the byte layout Java hashes it in: a zero byte
/// inserted before every password byte (UTF-16BE widening of ASCII).
///
/// The buffer is wiped when the value goes out of scope, on every path.
pub(crate) struct WidenedPassword {
    bytes: Vec<u8>,
}

impl WidenedPassword {
    pub(crate) fn new(password: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(password.len() * 2);
        for &b in password {
            bytes.push(0);
            bytes.push(b);
        }
        Self { bytes }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for WidenedPassword {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl fmt::Debug for WidenedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidenedPassword")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_zero_before_every_byte() {
        let widened = WidenedPassword::new(b"AB");
        assert_eq!(widened.as_bytes(), &[0x00, 0x41, 0x00, 0x42]);
    }

    #[test]
    fn empty_password_widens_to_empty() {
        let widened = WidenedPassword::new(b"");
        assert!(widened.as_bytes().is_empty());
    }

    #[test]
    fn high_bit_bytes_widen_bytewise() {
        // Widening is per byte, not per character.
        let widened = WidenedPassword::new(&[0xC3, 0xA9]);
        assert_eq!(widened.as_bytes(), &[0x00, 0xC3, 0x00, 0xA9]);
    }

    #[test]
    fn debug_does_not_leak() {
        let widened = WidenedPassword::new(b"secret");
        assert!(!format!("{:?}", widened).contains("secret"));
    }
}
