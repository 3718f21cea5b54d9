//! Hashing primitives and canonical encoding for powledger

use rand::rngs::OsRng;
use rand::RngCore;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const HEX_DIGEST_LEN: usize = 64;

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// JSON for `value` with object keys sorted at every depth.
///
/// Separators are `", "` and `": "` and every character outside printable
/// ASCII is written as a `\uXXXX` escape, which is the byte layout of
/// Python's `json.dumps(value, sort_keys=True)`. The output depends only on
/// the data, never on struct field declaration order or on whether
/// serde_json was built with `preserve_order`.
pub fn canonical_json(value: Value) -> String {
    let mut out = String::new();
    write_canonical(&value, &mut out);
    out
}

/// SHA-256 over the canonical JSON encoding of `value`.
pub fn canonical_hash(value: Value) -> String {
    sha256_hex(canonical_json(value).as_bytes())
}

/// JSON number for `n`; non-finite values have no JSON form and become `null`.
pub fn json_f64(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, inner)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_string(key, out);
                out.push_str(": ");
                write_canonical(inner, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, inner) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_canonical(inner, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Quoted string; serde_json handles quotes, backslashes and control
/// characters; anything else outside printable ASCII becomes UTF-16 escapes.
fn write_string(s: &str, out: &mut String) {
    let quoted = Value::String(s.to_owned()).to_string();
    let mut units = [0u16; 2];
    for c in quoted.chars() {
        if (' '..='~').contains(&c) {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
}

/// True when `hex_digest` starts with `difficulty` `'0'` characters.
pub fn has_leading_zeros(hex_digest: &str, difficulty: usize) -> bool {
    hex_digest.len() >= difficulty && hex_digest.bytes().take(difficulty).all(|b| b == b'0')
}

/// Random 128-bit identifier as 32 hex characters.
pub fn random_identifier() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
