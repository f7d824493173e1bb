//! Canonical CBOR encoding for claim transactions.
//!
//! Claim transactions are encoded as a CBOR map with small integer keys in
//! ascending order, shortest-form integers, and definite lengths only. The
//! same transaction therefore always produces the same bytes, the same
//! signature message, and the same transaction hash.

use ciborium::value::{Integer, Value};

use crate::crypto::{PublicKey, Signature};
use crate::error::{CoreError, Result};
use crate::fingerprint::Fingerprint;
use crate::transaction::{ClaimTransaction, UnsignedClaim};

/// Domain separation prefix for claim signatures.
pub const SIGN_DOMAIN: &[u8] = b"proofcreate/claim-sig/v1";

/// Encoding version written into every transaction.
pub const TX_VERSION: u64 = 1;

/// Map keys. Keys 0-23 encode as single bytes in CBOR.
mod keys {
    pub const VERSION: u64 = 0;
    pub const FINGERPRINT: u64 = 1;
    pub const SENDER: u64 = 2;
    pub const NONCE: u64 = 3;
    pub const SIGNATURE: u64 = 4;
}

/// Canonical bytes of the unsigned claim (the signed content).
pub fn canonical_unsigned_bytes(claim: &UnsignedClaim) -> Vec<u8> {
    encode_value(&Value::Map(unsigned_entries(claim)))
}

/// Canonical bytes of a signed transaction (the hashed content).
pub fn canonical_transaction_bytes(tx: &ClaimTransaction) -> Vec<u8> {
    let mut entries = unsigned_entries(&tx.claim);
    entries.push((
        Value::Integer(keys::SIGNATURE.into()),
        Value::Bytes(tx.signature.0.to_vec()),
    ));
    encode_value(&Value::Map(entries))
}

/// The message a signer signs: `SIGN_DOMAIN || canonical_unsigned_bytes`.
pub fn sign_message(claim: &UnsignedClaim) -> Vec<u8> {
    let content = canonical_unsigned_bytes(claim);
    let mut msg = Vec::with_capacity(SIGN_DOMAIN.len() + content.len());
    msg.extend_from_slice(SIGN_DOMAIN);
    msg.extend_from_slice(&content);
    msg
}

/// Decode a transaction previously produced by [`canonical_transaction_bytes`].
pub fn decode_transaction(bytes: &[u8]) -> Result<ClaimTransaction> {
    let value: Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;

    let entries = match value {
        Value::Map(entries) => entries,
        _ => return Err(CoreError::DecodingError("expected map".into())),
    };

    let mut version = None;
    let mut fingerprint = None;
    let mut sender = None;
    let mut nonce = None;
    let mut signature = None;

    for (k, v) in entries {
        let key = match k {
            Value::Integer(i) => u64::try_from(i)
                .map_err(|_| CoreError::DecodingError("negative map key".into()))?,
            _ => return Err(CoreError::DecodingError("non-integer map key".into())),
        };
        match key {
            keys::VERSION => version = Some(as_u64(v)?),
            keys::FINGERPRINT => fingerprint = Some(Fingerprint(as_array(v)?)),
            keys::SENDER => sender = Some(PublicKey(as_array(v)?)),
            keys::NONCE => nonce = Some(as_u64(v)?),
            keys::SIGNATURE => signature = Some(Signature(as_array(v)?)),
            other => {
                return Err(CoreError::DecodingError(format!("unknown key {}", other)));
            }
        }
    }

    match version {
        Some(TX_VERSION) => {}
        Some(v) => return Err(CoreError::DecodingError(format!("unsupported version {}", v))),
        None => return Err(CoreError::DecodingError("missing version".into())),
    }

    let missing = |field: &str| CoreError::DecodingError(format!("missing {}", field));
    Ok(ClaimTransaction {
        claim: UnsignedClaim {
            fingerprint: fingerprint.ok_or_else(|| missing("fingerprint"))?,
            sender: sender.ok_or_else(|| missing("sender"))?,
            nonce: nonce.ok_or_else(|| missing("nonce"))?,
        },
        signature: signature.ok_or_else(|| missing("signature"))?,
    })
}

fn unsigned_entries(claim: &UnsignedClaim) -> Vec<(Value, Value)> {
    vec![
        (
            Value::Integer(keys::VERSION.into()),
            Value::Integer(TX_VERSION.into()),
        ),
        (
            Value::Integer(keys::FINGERPRINT.into()),
            Value::Bytes(claim.fingerprint.0.to_vec()),
        ),
        (
            Value::Integer(keys::SENDER.into()),
            Value::Bytes(claim.sender.0.to_vec()),
        ),
        (
            Value::Integer(keys::NONCE.into()),
            Value::Integer(claim.nonce.into()),
        ),
    ]
}

fn as_u64(value: Value) -> Result<u64> {
    match value {
        Value::Integer(i) => {
            u64::try_from(i).map_err(|_| CoreError::DecodingError("integer out of range".into()))
        }
        _ => Err(CoreError::DecodingError("expected integer".into())),
    }
}

fn as_array<const N: usize>(value: Value) -> Result<[u8; N]> {
    match value {
        Value::Bytes(b) => b.try_into().map_err(|b: Vec<u8>| {
            CoreError::DecodingError(format!("expected {} bytes, got {}", N, b.len()))
        }),
        _ => Err(CoreError::DecodingError("expected byte string".into())),
    }
}

/// Encode the subset of CBOR used by claim transactions.
///
/// Map entries must already be in ascending key order.
fn encode_value(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Integer(i) => encode_integer(buf, *i),
        Value::Bytes(b) => {
            encode_uint(buf, 2, b.len() as u64);
            buf.extend_from_slice(b);
        }
        Value::Map(entries) => {
            encode_uint(buf, 5, entries.len() as u64);
            for (k, v) in entries {
                encode_value_to(buf, k);
                encode_value_to(buf, v);
            }
        }
        // Transactions never contain other types.
        _ => unreachable!("unsupported CBOR value in claim transaction"),
    }
}

fn encode_integer(buf: &mut Vec<u8>, i: Integer) {
    let n: i128 = i.into();
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type, shortest form.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}
