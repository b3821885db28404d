//! Solidity ABI coding for contract calls
//!
//! Covers the static and dynamic types a ledger contract's entry points use:
//! integers, addresses, booleans, strings, byte strings, arrays and tuples.
//! Values are laid out in 32-byte words; dynamic values live in the tail and
//! are referenced by offset from the start of their enclosing sequence.

use num_bigint::{BigInt, BigUint, Sign};
use serde::Deserialize;
use sha3::{Digest, Keccak256};

use crate::error::{Error, Result};

const WORD: usize = 32;

/// A parameter as written in a compiled contract's ABI JSON
#[derive(Debug, Clone, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub components: Vec<AbiParam>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    Address,
    Bool,
    Uint(usize),
    Int(usize),
    String,
    Bytes,
    FixedBytes(usize),
    Array(Box<ParamType>),
    FixedArray(Box<ParamType>, usize),
    /// Named components; names may be empty
    Tuple(Vec<(String, ParamType)>),
}

impl ParamType {
    pub fn from_abi(param: &AbiParam) -> Result<Self> {
        parse_type(&param.kind, &param.components)
    }

    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::String | ParamType::Bytes | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(components) => components.iter().any(|(_, p)| p.is_dynamic()),
            _ => false,
        }
    }

    /// Canonical type name as used in function signatures
    pub fn canonical(&self) -> String {
        match self {
            ParamType::Address => "address".to_string(),
            ParamType::Bool => "bool".to_string(),
            ParamType::Uint(bits) => format!("uint{bits}"),
            ParamType::Int(bits) => format!("int{bits}"),
            ParamType::String => "string".to_string(),
            ParamType::Bytes => "bytes".to_string(),
            ParamType::FixedBytes(len) => format!("bytes{len}"),
            ParamType::Array(inner) => format!("{}[]", inner.canonical()),
            ParamType::FixedArray(inner, len) => format!("{}[{len}]", inner.canonical()),
            ParamType::Tuple(components) => format!(
                "({})",
                components
                    .iter()
                    .map(|(_, p)| p.canonical())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
        }
    }

    /// Bytes this type occupies in the head of its enclosing sequence
    fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            ParamType::FixedArray(inner, len) => inner.head_size() * len,
            ParamType::Tuple(components) => components.iter().map(|(_, p)| p.head_size()).sum(),
            _ => WORD,
        }
    }
}

fn parse_type(kind: &str, components: &[AbiParam]) -> Result<ParamType> {
    if let Some(stripped) = kind.strip_suffix(']') {
        let open = stripped
            .rfind('[')
            .ok_or_else(|| Error::AbiError(format!("malformed array type {kind}")))?;
        let inner = Box::new(parse_type(&stripped[..open], components)?);
        let size = &stripped[open + 1..];
        if size.is_empty() {
            return Ok(ParamType::Array(inner));
        }
        let len = size
            .parse()
            .map_err(|_| Error::AbiError(format!("malformed array length in {kind}")))?;
        return Ok(ParamType::FixedArray(inner, len));
    }

    if kind == "tuple" {
        let components = components
            .iter()
            .map(|c| Ok((c.name.clone(), ParamType::from_abi(c)?)))
            .collect::<Result<Vec<_>>>()?;
        return Ok(ParamType::Tuple(components));
    }

    parse_elementary(kind)
}

fn parse_elementary(kind: &str) -> Result<ParamType> {
    let invalid = || Error::AbiError(format!("unsupported ABI type {kind}"));
    let bits = |digits: &str| -> Result<usize> {
        if digits.is_empty() {
            return Ok(256);
        }
        match digits.parse::<usize>() {
            Ok(n) if n > 0 && n <= 256 && n % 8 == 0 => Ok(n),
            _ => Err(invalid()),
        }
    };

    match kind {
        "address" => Ok(ParamType::Address),
        "bool" => Ok(ParamType::Bool),
        "string" => Ok(ParamType::String),
        "bytes" => Ok(ParamType::Bytes),
        _ => {
            if let Some(digits) = kind.strip_prefix("uint") {
                Ok(ParamType::Uint(bits(digits)?))
            } else if let Some(digits) = kind.strip_prefix("int") {
                Ok(ParamType::Int(bits(digits)?))
            } else if let Some(digits) = kind.strip_prefix("bytes") {
                match digits.parse::<usize>() {
                    Ok(n) if (1..=WORD).contains(&n) => Ok(ParamType::FixedBytes(n)),
                    _ => Err(invalid()),
                }
            } else {
                Err(invalid())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address([u8; 20]),
    Bool(bool),
    Uint(BigUint),
    Int(BigInt),
    String(String),
    Bytes(Vec<u8>),
    FixedBytes(Vec<u8>),
    Array(Vec<Token>),
    FixedArray(Vec<Token>),
    Tuple(Vec<(String, Token)>),
}

impl Token {
    fn is_dynamic(&self) -> bool {
        match self {
            Token::String(_) | Token::Bytes(_) | Token::Array(_) => true,
            Token::FixedArray(items) => items.iter().any(Token::is_dynamic),
            Token::Tuple(fields) => fields.iter().any(|(_, t)| t.is_dynamic()),
            _ => false,
        }
    }

    fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return WORD;
        }
        match self {
            Token::FixedArray(items) => items.iter().map(Token::head_size).sum(),
            Token::Tuple(fields) => fields.iter().map(|(_, t)| t.head_size()).sum(),
            _ => WORD,
        }
    }

    /// Whether this value can be encoded as the given type
    pub fn matches(&self, ty: &ParamType) -> bool {
        match (self, ty) {
            (Token::Address(_), ParamType::Address)
            | (Token::Bool(_), ParamType::Bool)
            | (Token::Uint(_), ParamType::Uint(_))
            | (Token::Int(_), ParamType::Int(_))
            | (Token::String(_), ParamType::String)
            | (Token::Bytes(_), ParamType::Bytes) => true,
            (Token::FixedBytes(b), ParamType::FixedBytes(len)) => b.len() == *len,
            (Token::Array(items), ParamType::Array(inner)) => items.iter().all(|t| t.matches(inner)),
            (Token::FixedArray(items), ParamType::FixedArray(inner, len)) => {
                items.len() == *len && items.iter().all(|t| t.matches(inner))
            }
            (Token::Tuple(fields), ParamType::Tuple(components)) => {
                fields.len() == components.len()
                    && fields
                        .iter()
                        .zip(components)
                        .all(|((_, t), (_, p))| t.matches(p))
            }
            _ => false,
        }
    }
}

/// First four bytes of the keccak-256 hash of a canonical function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// EIP-55 mixed-case checksum encoding of an address
pub fn checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());
    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub fn parse_address(address: &str) -> Result<[u8; 20]> {
    let digits = address.strip_prefix("0x").unwrap_or(address);
    let bytes = hex::decode(digits).map_err(|e| Error::AbiError(format!("invalid address {address}: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| Error::AbiError(format!("address {address} is not 20 bytes")))
}

/// Encode a sequence of values as function arguments
pub fn encode(tokens: &[Token]) -> Result<Vec<u8>> {
    encode_sequence(tokens.iter())
}

fn encode_sequence<'a>(tokens: impl Iterator<Item = &'a Token> + Clone) -> Result<Vec<u8>> {
    let head_len: usize = tokens.clone().map(Token::head_size).sum();
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&usize_word(head_len + tail.len()));
            tail.extend(encode_token(token)?);
        } else {
            head.extend(encode_token(token)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_token(token: &Token) -> Result<Vec<u8>> {
    match token {
        Token::Address(address) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(address);
            Ok(word.to_vec())
        }
        Token::Bool(value) => Ok(usize_word(*value as usize).to_vec()),
        Token::Uint(value) => {
            let bytes = value.to_bytes_be();
            if bytes.len() > WORD {
                return Err(Error::AbiError(format!("{value} does not fit in 256 bits")));
            }
            let mut word = [0u8; WORD];
            word[WORD - bytes.len()..].copy_from_slice(&bytes);
            Ok(word.to_vec())
        }
        Token::Int(value) => {
            let bytes = value.to_signed_bytes_be();
            if bytes.len() > WORD {
                return Err(Error::AbiError(format!("{value} does not fit in 256 bits")));
            }
            let fill = if value.sign() == Sign::Minus { 0xff } else { 0x00 };
            let mut word = [fill; WORD];
            word[WORD - bytes.len()..].copy_from_slice(&bytes);
            Ok(word.to_vec())
        }
        Token::String(value) => Ok(encode_dynamic_bytes(value.as_bytes())),
        Token::Bytes(value) => Ok(encode_dynamic_bytes(value)),
        Token::FixedBytes(value) => {
            if value.len() > WORD {
                return Err(Error::AbiError("fixed bytes longer than 32".to_string()));
            }
            let mut word = [0u8; WORD];
            word[..value.len()].copy_from_slice(value);
            Ok(word.to_vec())
        }
        Token::Array(items) => {
            let mut out = usize_word(items.len()).to_vec();
            out.extend(encode_sequence(items.iter())?);
            Ok(out)
        }
        Token::FixedArray(items) => encode_sequence(items.iter()),
        Token::Tuple(fields) => encode_sequence(fields.iter().map(|(_, t)| t)),
    }
}

fn encode_dynamic_bytes(bytes: &[u8]) -> Vec<u8> {
    let padded = bytes.len().div_ceil(WORD) * WORD;
    let mut out = Vec::with_capacity(WORD + padded);
    out.extend_from_slice(&usize_word(bytes.len()));
    out.extend_from_slice(bytes);
    out.resize(WORD + padded, 0);
    out
}

fn usize_word(value: usize) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 8..].copy_from_slice(&(value as u64).to_be_bytes());
    word
}

/// Decode return data laid out as a sequence of the given types
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>> {
    decode_sequence(types, data, 0)
}

fn decode_sequence(types: &[ParamType], data: &[u8], base: usize) -> Result<Vec<Token>> {
    let mut offset = base;
    let mut tokens = Vec::with_capacity(types.len());

    for ty in types {
        if ty.is_dynamic() {
            let pointer = read_usize(data, offset)?;
            let at = base
                .checked_add(pointer)
                .ok_or_else(|| Error::AbiError("offset overflow".to_string()))?;
            tokens.push(decode_param(ty, data, at)?);
            offset += WORD;
        } else {
            tokens.push(decode_param(ty, data, offset)?);
            offset += ty.head_size();
        }
    }

    Ok(tokens)
}

fn decode_param(ty: &ParamType, data: &[u8], at: usize) -> Result<Token> {
    match ty {
        ParamType::Address => {
            let word = read_word(data, at)?;
            let mut address = [0u8; 20];
            address.copy_from_slice(&word[12..]);
            Ok(Token::Address(address))
        }
        ParamType::Bool => Ok(Token::Bool(read_word(data, at)?.iter().any(|b| *b != 0))),
        ParamType::Uint(_) => Ok(Token::Uint(BigUint::from_bytes_be(read_word(data, at)?))),
        ParamType::Int(_) => Ok(Token::Int(BigInt::from_signed_bytes_be(read_word(data, at)?))),
        ParamType::FixedBytes(len) => Ok(Token::FixedBytes(read_word(data, at)?[..*len].to_vec())),
        ParamType::Bytes => Ok(Token::Bytes(read_dynamic_bytes(data, at)?.to_vec())),
        ParamType::String => {
            let bytes = read_dynamic_bytes(data, at)?;
            Ok(Token::String(String::from_utf8_lossy(bytes).into_owned()))
        }
        ParamType::Array(inner) => {
            let len = read_usize(data, at)?;
            let start = at + WORD;
            // Every element takes at least one head word.
            if len > data.len().saturating_sub(start) / WORD {
                return Err(Error::AbiError(format!("array length {len} exceeds return data")));
            }
            let types = vec![(**inner).clone(); len];
            Ok(Token::Array(decode_sequence(&types, data, start)?))
        }
        ParamType::FixedArray(inner, len) => {
            let types = vec![(**inner).clone(); *len];
            Ok(Token::FixedArray(decode_sequence(&types, data, at)?))
        }
        ParamType::Tuple(components) => {
            let types: Vec<ParamType> = components.iter().map(|(_, p)| p.clone()).collect();
            let values = decode_sequence(&types, data, at)?;
            Ok(Token::Tuple(
                components
                    .iter()
                    .map(|(name, _)| name.clone())
                    .zip(values)
                    .collect(),
            ))
        }
    }
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8]> {
    at.checked_add(WORD)
        .and_then(|end| data.get(at..end))
        .ok_or_else(|| Error::AbiError(format!("return data too short: need word at {at}, have {} bytes", data.len())))
}

fn read_usize(data: &[u8], at: usize) -> Result<usize> {
    let word = read_word(data, at)?;
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(Error::AbiError(format!("offset or length at {at} out of range")));
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(raw))
        .map_err(|_| Error::AbiError(format!("offset or length at {at} out of range")))
}

fn read_dynamic_bytes(data: &[u8], at: usize) -> Result<&[u8]> {
    let len = read_usize(data, at)?;
    let start = at + WORD;
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| Error::AbiError(format!("byte string of length {len} exceeds return data")))
}
