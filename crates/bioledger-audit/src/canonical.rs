//! Canonical encoding used as hash input.
//!
//! Values are first converted to a `serde_json::Value` and then emitted as
//! whitespace-free JSON with object keys sorted by byte order and RFC 8785
//! string escaping.  The output does not depend on field declaration order,
//! map iteration order, or serde_json feature flags, so a chain sealed by one
//! build verifies under any other build carrying the same
//! `CANONICAL_VERSION`.
//!
//! Caller snapshots (`old_val` / `new_val`) arrive pre-encoded as strings and
//! are emitted as string leaves; this module never walks into them.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{Map, Value};

use bioledger_contracts::{
    error::{LedgerError, LedgerResult},
    record::AuditRecord,
};

use crate::chain::sha256_hex;

/// Identifier of the canonical encoding.
pub const CANONICALIZER_ID: &str = "bioledger-canon-json";

/// Version of the canonical encoding.  Bumping it requires a new chain version.
pub const CANONICAL_VERSION: u16 = 1;

/// Maximum nesting depth accepted.
pub const MAX_DEPTH: usize = 64;

/// Top-level record fields left out of the chain checksum input.
///
/// `checksum` would be self-referential; `signature` is attached after the
/// record is sealed and must not invalidate it.
pub const EXCLUDED_RECORD_FIELDS: [&str; 2] = ["checksum", "signature"];

fn canonicalization_error(reason: impl Into<String>) -> LedgerError {
    LedgerError::Canonicalization {
        reason: reason.into(),
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> LedgerResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| canonicalization_error(format!("value is not serializable: {}", e)))
}

/// Canonical bytes of any serializable value.
///
/// # Errors
///
/// `LedgerError::Canonicalization` when the value's `Serialize` impl fails
/// (for example maps with non-string keys) or nesting exceeds `MAX_DEPTH`.
pub fn canonicalize<T: Serialize + ?Sized>(value: &T) -> LedgerResult<Vec<u8>> {
    let value = to_value(value)?;
    canonical_bytes(&value)
}

/// Canonical bytes of a `serde_json::Value`.
pub fn canonical_bytes(value: &Value) -> LedgerResult<Vec<u8>> {
    let mut output = String::new();
    emit_value(value, 0, &mut output)?;
    Ok(output.into_bytes())
}

/// Canonical bytes of a record, without `checksum` and `signature`.
pub fn canonicalize_record(record: &AuditRecord) -> LedgerResult<Vec<u8>> {
    let mut value = to_value(record)?;
    let Value::Object(fields) = &mut value else {
        return Err(canonicalization_error("audit record did not encode as an object"));
    };
    for field in EXCLUDED_RECORD_FIELDS {
        fields.remove(field);
    }
    canonical_bytes(&value)
}

/// Lowercase hex SHA-256 over the canonical bytes of `value`.
///
/// This is how callers produce the `data_checksum` an electronic signature
/// is later bound to.
pub fn checksum_of_data_record<T: Serialize + ?Sized>(value: &T) -> LedgerResult<String> {
    let canonical = canonicalize(value)?;
    Ok(sha256_hex(&[canonical.as_slice()]))
}

// ── Emitters ──────────────────────────────────────────────────────────────────

fn emit_value(value: &Value, depth: usize, output: &mut String) -> LedgerResult<()> {
    if depth > MAX_DEPTH {
        return Err(canonicalization_error(format!(
            "value nested deeper than {} levels",
            MAX_DEPTH
        )));
    }
    match value {
        Value::Null => output.push_str("null"),
        Value::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        // serde_json prints integers verbatim and floats in shortest
        // round-trip form, both deterministic.
        Value::Number(n) => {
            let _ = write!(output, "{}", n);
        }
        Value::String(s) => emit_string(s, output),
        Value::Array(items) => {
            output.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    output.push(',');
                }
                emit_value(item, depth + 1, output)?;
            }
            output.push(']');
        }
        Value::Object(fields) => emit_object(fields, depth, output)?,
    }
    Ok(())
}

fn emit_object(fields: &Map<String, Value>, depth: usize, output: &mut String) -> LedgerResult<()> {
    let mut keys: Vec<&String> = fields.keys().collect();
    keys.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));

    output.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_string(key, output);
        output.push(':');
        emit_value(&fields[key.as_str()], depth + 1, output)?;
    }
    output.push('}');
    Ok(())
}

/// Only `"`, `\` and U+0000..=U+001F are escaped.
fn emit_string(s: &str, output: &mut String) {
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c <= '\u{001F}' => {
                let _ = write!(output, "\\u{:04x}", c as u32);
            }
            c => output.push(c),
        }
    }
    output.push('"');
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use serde::ser::{Error as _, Serializer};
    use serde_json::json;

    use super::*;

    fn canon_str(value: &Value) -> String {
        String::from_utf8(canonical_bytes(value).unwrap()).unwrap()
    }

    #[test]
    fn keys_are_sorted_and_whitespace_dropped() {
        let value = json!({ "zeta": 1, "alpha": { "b": [1, 2], "a": null }, "mid": true });
        assert_eq!(
            canon_str(&value),
            r#"{"alpha":{"a":null,"b":[1,2]},"mid":true,"zeta":1}"#
        );
    }

    #[test]
    fn field_order_does_not_change_bytes() {
        let mut forward = HashMap::new();
        let mut backward = HashMap::new();
        for i in 0..32 {
            forward.insert(format!("k{i}"), i);
        }
        for i in (0..32).rev() {
            backward.insert(format!("k{i}"), i);
        }
        assert_eq!(canonicalize(&forward).unwrap(), canonicalize(&backward).unwrap());

        let sorted: BTreeMap<_, _> = forward.into_iter().collect();
        assert_eq!(canonicalize(&sorted).unwrap(), canonicalize(&backward).unwrap());
    }

    #[test]
    fn strings_use_minimal_escaping() {
        let value = json!("quote\" slash\\ nl\n bell\u{0007} é");
        assert_eq!(canon_str(&value), "\"quote\\\" slash\\\\ nl\\n bell\\u0007 é\"");
    }

    #[test]
    fn data_checksum_is_stable_hex() {
        let a = checksum_of_data_record(&json!({ "refund": 120, "ticket": "cs-4411" })).unwrap();
        let b = checksum_of_data_record(&json!({ "ticket": "cs-4411", "refund": 120 })).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let c = checksum_of_data_record(&json!({ "ticket": "cs-4411", "refund": 121 })).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut map = HashMap::new();
        map.insert(vec![1u8, 2], "x");
        match canonicalize(&map) {
            Err(LedgerError::Canonicalization { reason }) => {
                assert!(reason.contains("not serializable"), "unexpected reason: {reason}")
            }
            other => panic!("expected Canonicalization error, got {:?}", other),
        }
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cyclic reference"))
        }
    }

    #[test]
    fn failing_serialize_impl_is_surfaced() {
        let err = checksum_of_data_record(&Unserializable).unwrap_err();
        assert!(err.to_string().contains("cyclic reference"));
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let mut value = json!(0);
        for _ in 0..=MAX_DEPTH {
            value = json!([value]);
        }
        let err = canonical_bytes(&value).unwrap_err();
        assert!(matches!(err, LedgerError::Canonicalization { .. }));

        let mut shallow = json!(0);
        for _ in 0..MAX_DEPTH {
            shallow = json!([shallow]);
        }
        assert!(canonical_bytes(&shallow).is_ok());
    }
}
