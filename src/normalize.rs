//! JSON-safe rendering of ledger values
//!
//! Many JSON consumers hold numbers as IEEE doubles and silently lose precision
//! past 2^53. Every arbitrary-precision integer coming off the ledger is
//! therefore rendered as a decimal string, recursively through arrays and
//! objects. Everything else passes through unchanged.

use num_bigint::BigUint;
use serde_json::{Map, Number, Value};

use crate::ledger::abi::{checksum_address, Token};

/// Largest integer a double represents exactly
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Receipt and log fields the node reports as hex quantities
const QUANTITY_FIELDS: &[&str] = &[
    "blockNumber",
    "cumulativeGasUsed",
    "effectiveGasPrice",
    "gasUsed",
    "status",
    "transactionIndex",
    "logIndex",
    "type",
    "blobGasUsed",
    "blobGasPrice",
];

/// Render a decoded ABI value as JSON
pub fn token_to_json(token: &Token) -> Value {
    match token {
        Token::Address(address) => Value::String(checksum_address(address)),
        Token::Bool(b) => Value::Bool(*b),
        Token::Uint(n) => Value::String(n.to_string()),
        Token::Int(n) => Value::String(n.to_string()),
        Token::String(s) => Value::String(s.clone()),
        Token::Bytes(b) | Token::FixedBytes(b) => Value::String(format!("0x{}", hex::encode(b))),
        Token::Array(items) | Token::FixedArray(items) => {
            Value::Array(items.iter().map(token_to_json).collect())
        }
        Token::Tuple(fields) => struct_to_json(fields),
    }
}

/// Struct-like rendering: every field by position, named fields by name too
pub fn struct_to_json(fields: &[(String, Token)]) -> Value {
    let mut object = Map::new();
    for (i, (name, value)) in fields.iter().enumerate() {
        let rendered = token_to_json(value);
        if !name.is_empty() {
            object.insert(name.clone(), rendered.clone());
        }
        object.insert(i.to_string(), rendered);
    }
    object.insert("__length__".to_string(), Value::Number(Number::from(fields.len())));
    Value::Object(object)
}

/// Render a function's outputs: a single output is returned bare, several as a struct
pub fn outputs_to_json(outputs: &[(String, Token)]) -> Value {
    match outputs {
        [] => Value::Null,
        [(_, single)] => token_to_json(single),
        many => struct_to_json(many),
    }
}

/// Normalize a JSON document returned by the node (e.g. a transaction receipt)
pub fn normalize_json(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_json).collect()),
        Value::Object(object) => Value::Object(
            object
                .into_iter()
                .map(|(key, value)| {
                    let value = match value {
                        Value::String(s) if QUANTITY_FIELDS.contains(&key.as_str()) => {
                            Value::String(quantity_to_decimal(&s).unwrap_or(s))
                        }
                        other => normalize_json(other),
                    };
                    (key, value)
                })
                .collect(),
        ),
        Value::Number(n) => normalize_number(n),
        other => other,
    }
}

fn normalize_number(n: Number) -> Value {
    let unsafe_integer = match (n.as_u64(), n.as_i64()) {
        (Some(u), _) => u > MAX_SAFE_INTEGER,
        (None, Some(i)) => i.unsigned_abs() > MAX_SAFE_INTEGER,
        _ => false,
    };
    if unsafe_integer {
        Value::String(n.to_string())
    } else {
        Value::Number(n)
    }
}

/// `0x`-prefixed hex quantity to a decimal string
pub fn quantity_to_decimal(quantity: &str) -> Option<String> {
    let digits = quantity.strip_prefix("0x")?;
    if digits.is_empty() {
        return Some("0".to_string());
    }
    BigUint::parse_bytes(digits.as_bytes(), 16).map(|n| n.to_string())
}
