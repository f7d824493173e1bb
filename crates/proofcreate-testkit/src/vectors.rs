//! Golden fingerprint vectors.
//!
//! Fixed inputs with their SHA-256 fingerprints in canonical text form.
//! Any change to fingerprinting that alters these breaks every existing
//! claim, so they must never change.

/// A golden fingerprint vector.
#[derive(Debug, Clone)]
pub struct FingerprintVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input bytes.
    pub input: Vec<u8>,
    /// Expected fingerprint, `0x` + 64 lowercase hex.
    pub expected: &'static str,
}

/// Fingerprint of [`scenario_buffer`].
pub const SCENARIO_FINGERPRINT: &str =
    "0xc848e1013f9f04a9d63fa43ce7fd4af035152c7c669a4a404b67107cee5f2e4e";

/// The 10-byte buffer `[0x01..=0x0A]` used by the end-to-end scenario.
pub fn scenario_buffer() -> Vec<u8> {
    (0x01..=0x0A).collect()
}

/// Get all golden vectors.
pub fn all_vectors() -> Vec<FingerprintVector> {
    vec![
        FingerprintVector {
            name: "empty input",
            input: Vec::new(),
            expected: "0xe3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        },
        FingerprintVector {
            name: "abc",
            input: b"abc".to_vec(),
            expected: "0xba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        },
        FingerprintVector {
            name: "hello world",
            input: b"hello world".to_vec(),
            expected: "0xb94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        },
        FingerprintVector {
            name: "scenario buffer 01..0a",
            input: scenario_buffer(),
            expected: SCENARIO_FINGERPRINT,
        },
        FingerprintVector {
            name: "every byte value",
            input: (0..=255u8).collect(),
            expected: "0x40aff2e9d2d8922e47afd4648e6967497158785fbd1da870e7110266bf944880",
        },
        FingerprintVector {
            name: "1 KiB of 0x42",
            input: vec![0x42; 1024],
            expected: "0x9b6ce55f379e9771551de6939556a7e6b949814ae27c2f5cfd5dbeb378ce7c2a",
        },
        FingerprintVector {
            name: "one million 'a'",
            input: vec![b'a'; 1_000_000],
            expected: "0xcdc76e5c9914fb9281a1c7e284d73e67f1809a48a497200e046d39ccc7112cd0",
        },
    ]
}
