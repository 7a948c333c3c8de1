//! Record normalization
//!
//! Converts raw records of arbitrary origin into the bronze layer's uniform
//! string representation. Three stages, all pure and deterministic:
//!
//! 1. **Stringify**: each value renders with its native representation
//!    (strings verbatim, numbers and bools via Display, null and absent
//!    columns become the empty string, nested JSON is re-serialized).
//! 2. **Repair**: a fixed substitution table maps the common
//!    UTF-8-read-as-CP1252 punctuation sequences back to the intended
//!    characters.
//! 3. **Clean**: control characters below 32 are stripped (tab, newline and
//!    carriage return survive) and anything outside the Basic Multilingual
//!    Plane is dropped.
//!
//! For raw byte content, [`decode_bytes`] runs encoding detection and a
//! fixed fallback chain ending in lossy UTF-8; it always returns a string.

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use serde_json::Value;

use crate::error::{AcquireError, AcquireResult};
use crate::source::RawRecord;

/// Mis-decoded multi-byte sequences and the characters they were meant to
/// be: UTF-8 read as CP1252. Spelled with escapes because several of the
/// broken forms contain characters that are invisible or easy to mistype.
const REPLACEMENTS: &[(&str, &str)] = &[
    ("\u{e2}\u{20ac}\u{2122}", "\u{2019}"), // â€™ -> right single quote
    ("\u{e2}\u{20ac}\u{2dc}", "\u{2018}"),  // â€˜ -> left single quote
    ("\u{e2}\u{20ac}\u{153}", "\u{201c}"),  // â€œ -> left double quote
    ("\u{e2}\u{20ac}\u{9d}", "\u{201d}"),   // â€? -> right double quote
    ("\u{e2}\u{20ac}\u{201c}", "\u{2013}"), // â€“ -> en dash
    ("\u{e2}\u{20ac}\u{201d}", "\u{2014}"), // â€” -> em dash
    ("\u{e2}\u{20ac}\u{a6}", "\u{2026}"),   // â€¦ -> ellipsis
    ("\u{e2}\u{20ac}\u{a2}", "\u{2022}"),   // â€¢ -> bullet
    ("\u{c2}\u{a0}", " "),                  // Â + nbsp -> plain space
    ("\u{c3}\u{a9}", "\u{e9}"),             // Ã© -> é
    ("\u{c3}\u{a8}", "\u{e8}"),             // Ã¨ -> è
    ("\u{c3}\u{a1}", "\u{e1}"),             // Ã¡ -> á
    ("\u{c3}\u{b3}", "\u{f3}"),             // Ã³ -> ó
    ("\u{c3}\u{b1}", "\u{f1}"),             // Ã± -> ñ
    ("\u{c3}\u{bc}", "\u{fc}"),             // Ã¼ -> ü
    ("\u{c3}\u{b6}", "\u{f6}"),             // Ã¶ -> ö
    ("\u{c3}\u{a4}", "\u{e4}"),             // Ã¤ -> ä
    ("\u{c3}\u{a7}", "\u{e7}"),             // Ã§ -> ç
    ("\u{c3}\u{a0}", "\u{e0}"),             // Ã + nbsp -> à
];

/// Decode fallback labels tried in order after detection.
const FALLBACK_ENCODINGS: &[&str] = &["utf-8", "latin1", "windows-1252", "iso-8859-1", "cp1252"];

/// One record projected onto its task's column contract: same length and
/// order as the contract, every value a non-null string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub values: Vec<String>,
}

/// Project a raw record onto the task's ordered column contract.
///
/// Absent columns map to the empty string. A record column outside the
/// contract is a schema mismatch and fails the task; the engine never
/// alters a table mid-task.
pub fn normalize(
    record: &RawRecord,
    columns: &[String],
    table: &str,
) -> AcquireResult<NormalizedRecord> {
    for (name, _) in &record.fields {
        if !columns.iter().any(|c| c == name) {
            return Err(AcquireError::SchemaMismatch {
                table: table.to_string(),
                column: name.clone(),
            });
        }
    }

    let values = columns
        .iter()
        .map(|column| {
            let raw = record.get(column).map(value_to_string).unwrap_or_default();
            clean_text(&raw)
        })
        .collect();

    Ok(NormalizedRecord { values })
}

/// Render a value with its native representation.
fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // Nested structures land in bronze as their JSON text.
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Repair mojibake, strip control characters, drop non-BMP characters.
pub fn clean_text(input: &str) -> String {
    let repaired = if input.contains('â') || input.contains('Ã') || input.contains('Â') {
        let mut text = input.to_string();
        for (broken, intended) in REPLACEMENTS {
            if text.contains(broken) {
                text = text.replace(broken, intended);
            }
        }
        text
    } else {
        input.to_string()
    };

    repaired
        .chars()
        .filter(|&c| {
            let code = c as u32;
            if code < 32 {
                matches!(c, '\t' | '\n' | '\r')
            } else {
                code <= 0xFFFF
            }
        })
        .collect()
}

/// Decode raw bytes into a string, whatever it takes: detected encoding
/// first, then the fixed fallback chain, finally lossy UTF-8. Never fails.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let detected = detector.guess(None, true);

    let (text, _, malformed) = detected.decode(bytes);
    if !malformed {
        return text.into_owned();
    }

    for label in FALLBACK_ENCODINGS {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            let (text, _, malformed) = encoding.decode(bytes);
            if !malformed {
                return text.into_owned();
            }
        }
    }

    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> RawRecord {
        let mut r = RawRecord::new();
        for (name, value) in pairs {
            r.push(name.to_string(), value.clone());
        }
        r
    }

    fn contract(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_normalize_projects_in_contract_order() {
        let r = record(&[("b", Value::String("2".into())), ("a", Value::String("1".into()))]);
        let normalized = normalize(&r, &contract(&["a", "b"]), "t").unwrap();
        assert_eq!(normalized.values, vec!["1", "2"]);
    }

    #[test]
    fn test_normalize_absent_column_is_empty_string() {
        let r = record(&[("a", Value::String("1".into()))]);
        let normalized = normalize(&r, &contract(&["a", "missing"]), "t").unwrap();
        assert_eq!(normalized.values, vec!["1", ""]);
    }

    #[test]
    fn test_normalize_null_is_empty_string() {
        let r = record(&[("a", Value::Null)]);
        let normalized = normalize(&r, &contract(&["a"]), "t").unwrap();
        assert_eq!(normalized.values, vec![""]);
    }

    #[test]
    fn test_normalize_rejects_unknown_column() {
        let r = record(&[("a", Value::String("1".into())), ("rogue", Value::String("x".into()))]);
        let err = normalize(&r, &contract(&["a"]), "bronze.orders").unwrap_err();
        match err {
            AcquireError::SchemaMismatch { table, column } => {
                assert_eq!(table, "bronze.orders");
                assert_eq!(column, "rogue");
            },
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_native_representations() {
        let r = record(&[
            ("n", serde_json::json!(42)),
            ("f", serde_json::json!(1.5)),
            ("b", serde_json::json!(true)),
            ("o", serde_json::json!({"k": "v"})),
        ]);
        let normalized = normalize(&r, &contract(&["n", "f", "b", "o"]), "t").unwrap();
        assert_eq!(normalized.values, vec!["42", "1.5", "true", "{\"k\":\"v\"}"]);
    }

    #[test]
    fn test_clean_text_repairs_mojibake() {
        // don + broken right single quote + t
        assert_eq!(clean_text("don\u{e2}\u{20ac}\u{2122}t"), "don\u{2019}t");
        // broken left/right double quotes around a word
        assert_eq!(
            clean_text("\u{e2}\u{20ac}\u{153}quoted\u{e2}\u{20ac}\u{9d}"),
            "\u{201c}quoted\u{201d}"
        );
        // caf + broken é
        assert_eq!(clean_text("caf\u{c3}\u{a9}"), "caf\u{e9}");
        // wait + broken ellipsis
        assert_eq!(clean_text("wait\u{e2}\u{20ac}\u{a6}"), "wait\u{2026}");
    }

    #[test]
    fn test_clean_text_strips_low_controls_keeps_whitespace() {
        assert_eq!(clean_text("a\u{0}b\u{1f}c"), "abc");
        assert_eq!(clean_text("a\tb\nc\rd"), "a\tb\nc\rd");
    }

    #[test]
    fn test_clean_text_drops_non_bmp() {
        assert_eq!(clean_text("ok \u{1F600} done"), "ok  done");
        // BMP characters survive untouched.
        assert_eq!(clean_text("漢字"), "漢字");
    }

    #[test]
    fn test_clean_text_is_deterministic() {
        let input = "mixed â€” bag\u{3} \u{1F4A9} cafÃ©";
        assert_eq!(clean_text(input), clean_text(input));
    }

    #[test]
    fn test_decode_bytes_utf8() {
        assert_eq!(decode_bytes("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn test_decode_bytes_latin1() {
        assert_eq!(decode_bytes(b"caf\xe9"), "café");
    }

    #[test]
    fn test_decode_bytes_never_fails_on_garbage() {
        let garbage: Vec<u8> = (0..=255).collect();
        let decoded = decode_bytes(&garbage);
        assert!(!decoded.is_empty());
        // Determinism: same bytes, same string.
        assert_eq!(decoded, decode_bytes(&garbage));
    }

    #[test]
    fn test_decoded_then_cleaned_is_bmp_and_control_free() {
        let garbage: Vec<u8> = (0..=255).collect();
        let cleaned = clean_text(&decode_bytes(&garbage));
        for c in cleaned.chars() {
            let code = c as u32;
            assert!(code >= 32 || matches!(c, '\t' | '\n' | '\r'));
            assert!(code <= 0xFFFF);
        }
    }
}
