//! EIP-712 hashing for JSON typed data (`eth_signTypedData_v4` payloads).
//!
//! Supports atomic types (`address`, `bool`, `bytesN`, `uintN`, `intN`), `string`, `bytes`,
//! fixed and dynamic arrays, and nested structs.

use std::collections::{BTreeMap, BTreeSet};

use alloy_primitives::{keccak256, Address, B256, I256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;

const DOMAIN_TYPE_NAME: &str = "EIP712Domain";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

pub type Types = BTreeMap<String, Vec<TypedField>>;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "de_opt_uint")]
    pub chain_id: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<B256>,
}

fn de_opt_uint<'de, D>(deserializer: D) -> Result<Option<U256>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    value.map(|v| parse_uint(&v).map_err(serde::de::Error::custom)).transpose()
}

impl Eip712Domain {
    /// `EIP712Domain` fields in canonical order, only those present.
    pub fn fields(&self) -> Vec<TypedField> {
        let mut fields = Vec::with_capacity(5);
        let mut push = |name: &str, ty: &str| fields.push(TypedField { name: name.into(), ty: ty.into() });
        if self.name.is_some() {
            push("name", "string");
        }
        if self.version.is_some() {
            push("version", "string");
        }
        if self.chain_id.is_some() {
            push("chainId", "uint256");
        }
        if self.verifying_contract.is_some() {
            push("verifyingContract", "address");
        }
        if self.salt.is_some() {
            push("salt", "bytes32");
        }
        fields
    }

    pub fn separator(&self) -> Result<B256, DecodeError> {
        let mut types = Types::new();
        types.insert(DOMAIN_TYPE_NAME.to_string(), self.fields());
        let value = serde_json::to_value(self).map_err(|e| DecodeError::TypedData(e.to_string()))?;
        hash_struct(&types, DOMAIN_TYPE_NAME, &value)
    }
}

/// Full typed-data payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: Types,
    pub primary_type: String,
    pub domain: Eip712Domain,
    pub message: Value,
}

impl TypedData {
    pub fn new(domain: Eip712Domain, types: Types, primary_type: impl Into<String>, message: Value) -> Self {
        Self { types, primary_type: primary_type.into(), domain, message }
    }

    pub fn from_json(json: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(json).map_err(|e| DecodeError::TypedData(e.to_string()))
    }

    pub fn encode_type(&self) -> Result<String, DecodeError> {
        encode_type(&self.types, &self.primary_type)
    }

    pub fn type_hash(&self) -> Result<B256, DecodeError> {
        Ok(keccak256(self.encode_type()?))
    }

    pub fn hash_struct(&self) -> Result<B256, DecodeError> {
        hash_struct(&self.types, &self.primary_type, &self.message)
    }

    pub fn domain_separator(&self) -> Result<B256, DecodeError> {
        self.domain.separator()
    }

    /// `keccak256(0x1901 || domainSeparator || hashStruct(message))`.
    pub fn signing_hash(&self) -> Result<B256, DecodeError> {
        Ok(typed_data_digest(self.domain_separator()?, self.hash_struct()?))
    }
}

pub fn typed_data_digest(domain_separator: B256, struct_hash: B256) -> B256 {
    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(domain_separator.as_slice());
    buf[34..66].copy_from_slice(struct_hash.as_slice());
    keccak256(buf)
}

fn err(msg: impl Into<String>) -> DecodeError {
    DecodeError::TypedData(msg.into())
}

/// Split `T[]` / `T[N]` into `(T, Some(len))`; `len` is `None` for dynamic arrays.
fn split_array(ty: &str) -> Option<(&str, Option<usize>)> {
    let inner = ty.strip_suffix(']')?;
    let open = inner.rfind('[')?;
    let (base, len) = (&inner[..open], &inner[open + 1..]);
    if len.is_empty() {
        Some((base, None))
    } else {
        len.parse().ok().map(|n| (base, Some(n)))
    }
}

fn base_type(ty: &str) -> &str {
    let mut ty = ty;
    while let Some((base, _)) = split_array(ty) {
        ty = base;
    }
    ty
}

fn collect_deps(types: &Types, ty: &str, out: &mut BTreeSet<String>) -> Result<(), DecodeError> {
    let fields = types.get(ty).ok_or_else(|| err(format!("unknown struct type {ty}")))?;
    for field in fields {
        let base = base_type(&field.ty);
        if types.contains_key(base) && !out.contains(base) {
            out.insert(base.to_string());
            collect_deps(types, base, out)?;
        }
    }
    Ok(())
}

fn format_struct(name: &str, fields: &[TypedField]) -> String {
    let params: Vec<String> = fields.iter().map(|f| format!("{} {}", f.ty, f.name)).collect();
    format!("{name}({})", params.join(","))
}

/// Primary type followed by its referenced struct types in alphabetical order.
pub fn encode_type(types: &Types, primary: &str) -> Result<String, DecodeError> {
    let mut deps = BTreeSet::new();
    collect_deps(types, primary, &mut deps)?;
    deps.remove(primary);

    let mut out = format_struct(primary, &types[primary]);
    for dep in deps {
        out.push_str(&format_struct(&dep, &types[&dep]));
    }
    Ok(out)
}

pub fn hash_struct(types: &Types, ty: &str, value: &Value) -> Result<B256, DecodeError> {
    let fields = types.get(ty).ok_or_else(|| err(format!("unknown struct type {ty}")))?;
    let obj = value.as_object().ok_or_else(|| err(format!("{ty} value must be an object")))?;

    let mut buf = Vec::with_capacity(32 * (fields.len() + 1));
    buf.extend_from_slice(keccak256(encode_type(types, ty)?).as_slice());
    for field in fields {
        let field_value = obj.get(&field.name).unwrap_or(&Value::Null);
        buf.extend_from_slice(&encode_value(types, &field.ty, field_value)?);
    }
    Ok(keccak256(buf))
}

fn encode_value(types: &Types, ty: &str, value: &Value) -> Result<[u8; 32], DecodeError> {
    if let Some((base, len)) = split_array(ty) {
        let items = value.as_array().ok_or_else(|| err(format!("{ty} value must be an array")))?;
        if let Some(n) = len {
            if items.len() != n {
                return Err(err(format!("{ty} expects {n} items, got {}", items.len())));
            }
        }
        let mut buf = Vec::with_capacity(32 * items.len());
        for item in items {
            buf.extend_from_slice(&encode_value(types, base, item)?);
        }
        return Ok(keccak256(buf).0);
    }

    if types.contains_key(ty) {
        return Ok(hash_struct(types, ty, value)?.0);
    }

    let mut word = [0u8; 32];
    match ty {
        "string" => {
            let s = value.as_str().ok_or_else(|| err("string value expected"))?;
            return Ok(keccak256(s.as_bytes()).0);
        }
        "bytes" => return Ok(keccak256(parse_hex(value)?).0),
        "address" => {
            let s = value.as_str().ok_or_else(|| err("address value expected"))?;
            let addr: Address = s.parse().map_err(|_| err(format!("invalid address {s}")))?;
            word[12..].copy_from_slice(addr.as_slice());
        }
        "bool" => {
            let b = match value {
                Value::Bool(b) => *b,
                Value::String(s) if s == "true" => true,
                Value::String(s) if s == "false" => false,
                _ => return Err(err("bool value expected")),
            };
            word[31] = u8::from(b);
        }
        _ if ty.starts_with("bytes") => {
            let n: usize = ty[5..].parse().map_err(|_| err(format!("unknown type {ty}")))?;
            let raw = parse_hex(value)?;
            if n == 0 || n > 32 || raw.len() > n {
                return Err(err(format!("invalid {ty} value")));
            }
            word[..raw.len()].copy_from_slice(&raw);
        }
        _ if ty.starts_with("uint") => {
            let bits = int_width(ty, "uint")?;
            let v = parse_uint(value)?;
            if bits < 256 && v >> bits != U256::ZERO {
                return Err(err(format!("{v} does not fit {ty}")));
            }
            word = v.to_be_bytes::<32>();
        }
        _ if ty.starts_with("int") => {
            let bits = int_width(ty, "int")?;
            let v = parse_int(value)?;
            if bits < 256 {
                let limit = U256::from(1u8) << (bits - 1);
                let magnitude = v.unsigned_abs();
                if magnitude > limit || (!v.is_negative() && magnitude == limit) {
                    return Err(err(format!("{v} does not fit {ty}")));
                }
            }
            word = v.into_raw().to_be_bytes::<32>();
        }
        _ => return Err(err(format!("unknown type {ty}"))),
    }
    Ok(word)
}

/// Bit width of a `uintN`/`intN` type; a bare `uint`/`int` is 256 bits.
fn int_width(ty: &str, prefix: &str) -> Result<usize, DecodeError> {
    let suffix = &ty[prefix.len()..];
    if suffix.is_empty() {
        return Ok(256);
    }
    match suffix.parse::<usize>() {
        Ok(bits) if bits > 0 && bits <= 256 && bits % 8 == 0 => Ok(bits),
        _ => Err(err(format!("unknown type {ty}"))),
    }
}

fn parse_hex(value: &Value) -> Result<Vec<u8>, DecodeError> {
    let s = value.as_str().ok_or_else(|| err("hex string expected"))?;
    hex::decode(s.trim_start_matches("0x")).map_err(|e| err(format!("invalid hex {s}: {e}")))
}

pub(crate) fn parse_uint(value: &Value) -> Result<U256, DecodeError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| err(format!("invalid unsigned integer {n}"))),
        Value::String(s) => match s.strip_prefix("0x") {
            Some(hex) => U256::from_str_radix(hex, 16),
            None => U256::from_str_radix(s, 10),
        }
        .map_err(|_| err(format!("invalid unsigned integer {s}"))),
        _ => Err(err("integer value expected")),
    }
}

fn parse_int(value: &Value) -> Result<I256, DecodeError> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return Err(err("integer value expected")),
    };
    I256::from_dec_str(&text).map_err(|_| err(format!("invalid signed integer {text}")))
}
