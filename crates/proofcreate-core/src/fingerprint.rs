//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 digest of the complete byte content of a file.
//! Its canonical text form is the `0x` marker followed by 64 lowercase hex
//! characters, which is also the form the ledger indexes claims by.

use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Marker prepended to the hex form of a fingerprint.
pub const FINGERPRINT_PREFIX: &str = "0x";

/// Length of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// Read buffer used when streaming content.
const READ_CHUNK: usize = 64 * 1024;

/// A 32-byte SHA-256 content fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Create from raw digest bytes.
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest bytes.
    pub const fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Canonical text form: `0x` followed by lowercase hex.
    pub fn to_hex(&self) -> String {
        format!("{}{}", FINGERPRINT_PREFIX, hex::encode(self.0))
    }

    /// Parse the canonical text form.
    ///
    /// The `0x` marker is required. Hex digits may be upper or lowercase.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix(FINGERPRINT_PREFIX).ok_or_else(|| {
            CoreError::InvalidFingerprint(format!("missing {} marker", FINGERPRINT_PREFIX))
        })?;
        let bytes =
            hex::decode(digits).map_err(|e| CoreError::InvalidFingerprint(e.to_string()))?;
        let arr: [u8; FINGERPRINT_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::InvalidFingerprint(format!(
                "expected {} bytes, got {}",
                FINGERPRINT_LEN,
                b.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Truncated form for list views: the first `len` characters of the
    /// canonical form followed by `...`.
    pub fn short(&self, len: usize) -> String {
        let full = self.to_hex();
        if len >= full.len() {
            return full;
        }
        format!("{}...", &full[..len])
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short(18))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Fingerprint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for Fingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; FINGERPRINT_LEN]> for Fingerprint {
    fn from(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Fingerprint {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; FINGERPRINT_LEN] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// Computes content fingerprints.
///
/// Every entry point consumes the whole input before producing a digest.
/// Readers that fail part way through yield [`CoreError::Io`], never a
/// fingerprint of the bytes read so far.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerprintEngine;

impl FingerprintEngine {
    /// Fingerprint an in-memory buffer.
    pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
        Fingerprint(Sha256::digest(bytes).into())
    }

    /// Fingerprint everything a reader yields until end of input.
    pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<Fingerprint> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CoreError::Io(e)),
            }
        }

        Ok(Fingerprint(hasher.finalize().into()))
    }

    /// Fingerprint the content of a file on disk.
    pub fn fingerprint_file(path: impl AsRef<Path>) -> Result<Fingerprint> {
        let file = File::open(path)?;
        Self::fingerprint_reader(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    /// Reader that yields some bytes and then fails.
    struct BrokenReader {
        served: bool,
    }

    impl Read for BrokenReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.served {
                return Err(io::Error::new(ErrorKind::UnexpectedEof, "device unplugged"));
            }
            self.served = true;
            buf[..4].copy_from_slice(b"head");
            Ok(4)
        }
    }

    #[test]
    fn test_known_digests() {
        assert_eq!(
            FingerprintEngine::fingerprint(b"").to_hex(),
            "0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            FingerprintEngine::fingerprint(b"abc").to_hex(),
            "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_reader_matches_slice() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let from_slice = FingerprintEngine::fingerprint(&data);
        let from_reader = FingerprintEngine::fingerprint_reader(Cursor::new(&data)).unwrap();
        assert_eq!(from_slice, from_reader);
    }

    #[test]
    fn test_reader_failure_is_error() {
        let result = FingerprintEngine::fingerprint_reader(BrokenReader { served: false });
        assert!(matches!(result, Err(CoreError::Io(_))));
    }

    #[test]
    fn test_missing_file_is_error() {
        let result = FingerprintEngine::fingerprint_file("/definitely/not/here.bin");
        assert!(matches!(result, Err(CoreError::Io(_))));
    }

    #[test]
    fn test_hex_roundtrip_and_case() {
        let fp = FingerprintEngine::fingerprint(b"hello world");
        let hex = fp.to_hex();
        assert!(hex.starts_with("0x"));
        assert_eq!(hex.len(), 66);
        assert_eq!(Fingerprint::from_hex(&hex).unwrap(), fp);

        let upper = format!("0x{}", hex[2..].to_uppercase());
        assert_eq!(Fingerprint::from_hex(&upper).unwrap(), fp);
    }

    #[test]
    fn test_from_hex_rejects_malformed() {
        let bare = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
        assert!(Fingerprint::from_hex(bare).is_err());
        assert!(Fingerprint::from_hex("0xabcd").is_err());
        assert!(Fingerprint::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_short_form() {
        let fp = Fingerprint::from_bytes([0xab; 32]);
        assert_eq!(fp.short(20), "0xababababababababab...");
        assert_eq!(fp.short(100), fp.to_hex());
    }
}
