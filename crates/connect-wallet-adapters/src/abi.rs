//! Contract call encoding for `eth_call`, driven by a JSON ABI and string arguments.

use std::str::FromStr;

use alloy::dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Function, JsonAbi};
use alloy::primitives::{Address, Bytes, FixedBytes, I256, U256};
use serde_json::{json, Value};

use connect_wallet_core::PortError;

/// Picks the function named by `method` (a bare name or a full `name(types)` signature)
/// and encodes `args` as its calldata.
pub fn encode_call<'a>(
    abi: &'a JsonAbi,
    method: &str,
    args: &[String],
) -> Result<(&'a Function, Bytes), PortError> {
    let function = select_function(abi, method, args.len())?;
    let values = function
        .inputs
        .iter()
        .zip(args)
        .map(|(input, arg)| {
            // Struct parameters carry `tuple` plus components; resolve expands them.
            let ty: DynSolType = input.resolve().map_err(|e| {
                PortError::Validation(format!("unsupported type '{}': {e}", input.ty))
            })?;
            // Composite arguments are JSON arrays; scalars stay strings so large integers
            // never pass through f64.
            let raw = match ty {
                DynSolType::Array(_) | DynSolType::FixedArray(..) | DynSolType::Tuple(_) => {
                    serde_json::from_str::<Value>(arg).unwrap_or_else(|_| json!(arg))
                }
                _ => json!(arg),
            };
            to_dyn_value(&raw, &ty).map_err(|e| {
                PortError::Validation(format!("argument '{}' of {method}: {e}", input.name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data = function
        .abi_encode_input(&values)
        .map_err(|e| PortError::Validation(format!("abi encoding failed: {e}")))?;
    Ok((function, Bytes::from(data)))
}

/// Decodes return data. A single output comes back as the bare value, several as an array.
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Value, PortError> {
    let mut values = function
        .abi_decode_output(data, true)
        .map_err(|e| {
            PortError::Validation(format!("abi decoding of {} failed: {e}", function.name))
        })?;
    if values.len() == 1 {
        return Ok(to_json(&values.remove(0)));
    }
    Ok(Value::Array(values.iter().map(to_json).collect()))
}

fn select_function<'a>(
    abi: &'a JsonAbi,
    method: &str,
    arity: usize,
) -> Result<&'a Function, PortError> {
    let name = method.split_once('(').map_or(method, |(name, _)| name);
    let overloads = abi
        .function(name)
        .ok_or_else(|| PortError::Validation(format!("method not found: {name}")))?;

    if method.contains('(') {
        return overloads
            .iter()
            .find(|f| f.signature() == method)
            .ok_or_else(|| PortError::Validation(format!("method signature not found: {method}")));
    }
    overloads
        .iter()
        .find(|f| f.inputs.len() == arity)
        .ok_or_else(|| {
            PortError::Validation(format!("no overload of {name} takes {arity} arguments"))
        })
}

fn to_dyn_value(value: &Value, ty: &DynSolType) -> Result<DynSolValue, String> {
    let text = || {
        value
            .as_str()
            .map(str::to_owned)
            .or_else(|| match value {
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| format!("expected a string for {}", ty.sol_type_name()))
    };
    match ty {
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) => s
                .parse()
                .map(DynSolValue::Bool)
                .map_err(|_| format!("invalid bool '{s}'")),
            _ => Err("expected bool".to_owned()),
        },
        DynSolType::Uint(bits) => U256::from_str(&text()?)
            .map(|x| DynSolValue::Uint(x, *bits))
            .map_err(|e| format!("invalid uint: {e}")),
        DynSolType::Int(bits) => I256::from_str(&text()?)
            .map(|x| DynSolValue::Int(x, *bits))
            .map_err(|e| format!("invalid int: {e}")),
        DynSolType::Address => Address::from_str(&text()?)
            .map(DynSolValue::Address)
            .map_err(|e| format!("invalid address: {e}")),
        DynSolType::FixedBytes(size) => FixedBytes::<32>::from_str(&right_pad(&text()?, *size))
            .map(|x| DynSolValue::FixedBytes(x, *size))
            .map_err(|e| format!("invalid bytes{size}: {e}")),
        DynSolType::Bytes => Bytes::from_str(&text()?)
            .map(|x| DynSolValue::Bytes(x.to_vec()))
            .map_err(|e| format!("invalid bytes: {e}")),
        DynSolType::String => Ok(DynSolValue::String(text()?)),
        DynSolType::Array(inner) => items(value, None)?
            .iter()
            .map(|v| to_dyn_value(v, inner))
            .collect::<Result<_, _>>()
            .map(DynSolValue::Array),
        DynSolType::FixedArray(inner, size) => items(value, Some(*size))?
            .iter()
            .map(|v| to_dyn_value(v, inner))
            .collect::<Result<_, _>>()
            .map(DynSolValue::FixedArray),
        DynSolType::Tuple(inner) => {
            let values = items(value, Some(inner.len()))?;
            values
                .iter()
                .zip(inner)
                .map(|(v, t)| to_dyn_value(v, t))
                .collect::<Result<_, _>>()
                .map(DynSolValue::Tuple)
        }
        other => Err(format!("type {} is not supported", other.sol_type_name())),
    }
}

fn items(value: &Value, len: Option<usize>) -> Result<&Vec<Value>, String> {
    let arr = value.as_array().ok_or_else(|| "expected an array".to_owned())?;
    match len {
        Some(expected) if arr.len() != expected => Err(format!(
            "length mismatch: expected {expected}, got {}",
            arr.len()
        )),
        _ => Ok(arr),
    }
}

/// `bytesN` values shorter than 32 bytes are left-aligned in their word.
fn right_pad(hex: &str, size: usize) -> String {
    let digits = hex.trim_start_matches("0x");
    if digits.len() != size * 2 {
        return hex.to_owned();
    }
    format!("0x{digits:0<64}")
}

fn to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => json!(b),
        DynSolValue::Uint(x, _) => json!(x.to_string()),
        DynSolValue::Int(x, _) => json!(x.to_string()),
        DynSolValue::Address(a) => json!(a.to_string()),
        DynSolValue::FixedBytes(word, size) => {
            json!(Bytes::copy_from_slice(&word[..*size]).to_string())
        }
        DynSolValue::Bytes(b) => json!(Bytes::copy_from_slice(b).to_string()),
        DynSolValue::String(s) => json!(s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(to_json).collect())
        }
        other => json!(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn erc20() -> JsonAbi {
        serde_json::from_value(json!([
            {
                "type": "function",
                "name": "balanceOf",
                "stateMutability": "view",
                "inputs": [{ "name": "owner", "type": "address" }],
                "outputs": [{ "name": "", "type": "uint256" }]
            },
            {
                "type": "function",
                "name": "symbol",
                "stateMutability": "view",
                "inputs": [],
                "outputs": [{ "name": "", "type": "string" }]
            }
        ]))
        .expect("valid abi")
    }

    #[test]
    fn encodes_selector_and_argument() {
        let abi = erc20();
        let (function, data) = encode_call(
            &abi,
            "balanceOf",
            &["0x1000000000000000000000000000000000000001".to_owned()],
        )
        .expect("encode");
        assert_eq!(function.name, "balanceOf");
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(data.len(), 4 + 32);
    }

    #[test]
    fn struct_parameter_encodes_from_a_json_array() {
        let abi: JsonAbi = serde_json::from_value(json!([{
            "type": "function",
            "name": "submit",
            "stateMutability": "nonpayable",
            "inputs": [{
                "name": "order",
                "type": "tuple",
                "internalType": "struct Order",
                "components": [
                    { "name": "maker", "type": "address" },
                    { "name": "amount", "type": "uint256" }
                ]
            }],
            "outputs": []
        }]))
        .expect("valid abi");

        let arg = r#"["0x1000000000000000000000000000000000000001", "5"]"#.to_owned();
        let (function, data) = encode_call(&abi, "submit", &[arg]).expect("encode tuple");
        assert_eq!(function.signature(), "submit((address,uint256))");
        assert_eq!(data.len(), 4 + 64);
        assert_eq!(data[4 + 31], 0x01);
        assert_eq!(data[4 + 63], 5);
    }

    #[test]
    fn arity_mismatch_is_a_validation_error() {
        let abi = erc20();
        let err = encode_call(&abi, "balanceOf", &[]).expect_err("must fail");
        assert!(err.to_string().contains("takes 0 arguments"));
    }

    #[test]
    fn single_output_decodes_to_bare_value() {
        let abi = erc20();
        let function = &abi.function("balanceOf").expect("present")[0];
        let word = U256::from(1_000u64).to_be_bytes::<32>();
        assert_eq!(
            decode_output(function, &word).expect("decode"),
            json!("1000")
        );
    }
}
