//! Parameter conversion
//!
//! Pure functions turning the raw text of a path or query parameter into a
//! typed JSON value for the request message. Conversion never panics on
//! malformed input; every failure is a recoverable [`GatewayError::Convert`]
//! carrying the parameter name and the reason.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde_json::Value;

use crate::descriptor::FieldKind;
use crate::error::{GatewayError, GatewayResult};

/// Convert one raw parameter value into the target field kind
pub fn convert(kind: &FieldKind, param: &str, raw: &str) -> GatewayResult<Value> {
    convert_inner(kind, raw).map_err(|reason| GatewayError::Convert {
        param: param.to_string(),
        reason,
    })
}

/// Convert repeated occurrences of the same query key, preserving order
pub fn convert_repeated<'a, I>(kind: &FieldKind, param: &str, raws: I) -> GatewayResult<Value>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut values = Vec::new();
    for raw in raws {
        values.push(convert(kind, param, raw)?);
    }
    Ok(Value::Array(values))
}

fn convert_inner(kind: &FieldKind, raw: &str) -> Result<Value, String> {
    match kind {
        FieldKind::Int32 => parse_number::<i32>(raw),
        FieldKind::Int64 => parse_number::<i64>(raw),
        FieldKind::Uint32 => parse_number::<u32>(raw),
        FieldKind::Uint64 => parse_number::<u64>(raw),
        FieldKind::Float => parse_float(raw, raw.parse::<f32>().map(f64::from)),
        FieldKind::Double => parse_float(raw, raw.parse::<f64>()),
        FieldKind::Bool => parse_bool(raw),
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::Bytes => parse_bytes(raw),
        FieldKind::Enum(desc) => {
            if desc.by_name(raw).is_some() {
                return Ok(Value::String(raw.to_string()));
            }
            if let Ok(number) = raw.parse::<i32>() {
                if desc.has_number(number) {
                    return Ok(Value::Number(number.into()));
                }
            }
            Err(format!("unknown value {:?} for enum {}", raw, desc.name))
        }
        FieldKind::Message(desc) => Err(format!(
            "message field {} cannot be bound from a parameter",
            desc.name
        )),
    }
}

fn parse_number<T>(raw: &str) -> Result<Value, String>
where
    T: std::str::FromStr + Into<serde_json::Number>,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map(|n| Value::Number(n.into()))
        .map_err(|err| err.to_string())
}

fn parse_float(raw: &str, parsed: Result<f64, std::num::ParseFloatError>) -> Result<Value, String> {
    let value = parsed.map_err(|err| err.to_string())?;
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| format!("{:?} is not a finite number", raw))
}

fn parse_bool(raw: &str) -> Result<Value, String> {
    match raw {
        "1" => Ok(Value::Bool(true)),
        "0" => Ok(Value::Bool(false)),
        _ if raw.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
        _ if raw.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
        _ => Err(format!("{:?} is not a boolean", raw)),
    }
}

/// Decode any common base64 flavor, re-encoding canonically for the wire
fn parse_bytes(raw: &str) -> Result<Value, String> {
    for engine in [&STANDARD, &STANDARD_NO_PAD, &URL_SAFE, &URL_SAFE_NO_PAD] {
        if let Ok(decoded) = engine.decode(raw) {
            return Ok(Value::String(STANDARD.encode(decoded)));
        }
    }
    Err(format!("{:?} is not valid base64", raw))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::descriptor::EnumDescriptor;

    #[test]
    fn test_convert_integers() {
        assert_eq!(convert(&FieldKind::Int32, "id", "42").unwrap(), json!(42));
        assert_eq!(convert(&FieldKind::Int64, "id", "-7").unwrap(), json!(-7));
        assert_eq!(
            convert(&FieldKind::Uint64, "id", "18446744073709551615").unwrap(),
            json!(18446744073709551615u64)
        );
    }

    #[test]
    fn test_convert_rejects_malformed_integers() {
        assert!(convert(&FieldKind::Int32, "id", "abc").is_err());
        assert!(convert(&FieldKind::Int32, "id", "").is_err());
        // overflow is malformed, not wrapped
        assert!(convert(&FieldKind::Int32, "id", "4294967296").is_err());
        assert!(convert(&FieldKind::Uint32, "id", "-1").is_err());
    }

    #[test]
    fn test_convert_error_names_parameter() {
        let err = convert(&FieldKind::Int32, "shelf.id", "abc").unwrap_err();
        assert!(err.to_string().contains("shelf.id"));
    }

    #[test]
    fn test_convert_floats() {
        assert_eq!(convert(&FieldKind::Double, "x", "2.5").unwrap(), json!(2.5));
        assert_eq!(convert(&FieldKind::Float, "x", "1.5").unwrap(), json!(1.5));
        assert!(convert(&FieldKind::Double, "x", "NaN").is_err());
        assert!(convert(&FieldKind::Double, "x", "three").is_err());
    }

    #[test]
    fn test_convert_bool() {
        assert_eq!(convert(&FieldKind::Bool, "b", "true").unwrap(), json!(true));
        assert_eq!(convert(&FieldKind::Bool, "b", "FALSE").unwrap(), json!(false));
        assert_eq!(convert(&FieldKind::Bool, "b", "1").unwrap(), json!(true));
        assert_eq!(convert(&FieldKind::Bool, "b", "0").unwrap(), json!(false));
        assert!(convert(&FieldKind::Bool, "b", "yes").is_err());
    }

    #[test]
    fn test_convert_string_passes_through() {
        assert_eq!(
            convert(&FieldKind::String, "s", "hello world").unwrap(),
            json!("hello world")
        );
        // empty is a valid string value
        assert_eq!(convert(&FieldKind::String, "s", "").unwrap(), json!(""));
    }

    #[test]
    fn test_convert_bytes_accepts_url_safe() {
        // "hi~" is "aGl-" url-safe, "aGl+" standard
        assert_eq!(
            convert(&FieldKind::Bytes, "b", "aGl-").unwrap(),
            json!("aGl+")
        );
        assert_eq!(
            convert(&FieldKind::Bytes, "b", "aGl+").unwrap(),
            json!("aGl+")
        );
        assert!(convert(&FieldKind::Bytes, "b", "!!!").is_err());
    }

    #[test]
    fn test_convert_enum() {
        let kind = FieldKind::Enum(EnumDescriptor::new(
            "library.Format",
            vec![("HARDCOVER", 0), ("PAPERBACK", 1)],
        ));
        assert_eq!(convert(&kind, "f", "PAPERBACK").unwrap(), json!("PAPERBACK"));
        assert_eq!(convert(&kind, "f", "1").unwrap(), json!(1));
        assert!(convert(&kind, "f", "paperback").is_err());
        assert!(convert(&kind, "f", "9").is_err());
    }

    #[test]
    fn test_convert_repeated_preserves_order() {
        let value =
            convert_repeated(&FieldKind::Int32, "ids", ["3", "1", "2"]).unwrap();
        assert_eq!(value, json!([3, 1, 2]));
    }

    #[test]
    fn test_convert_repeated_fails_on_any_malformed_element() {
        assert!(convert_repeated(&FieldKind::Int32, "ids", ["3", "x"]).is_err());
    }

    #[test]
    fn test_convert_is_idempotent() {
        for raw in ["42", "abc", ""] {
            let first = convert(&FieldKind::Int32, "id", raw);
            let second = convert(&FieldKind::Int32, "id", raw);
            match (first, second) {
                (Ok(a), Ok(b)) => assert_eq!(a, b),
                (Err(a), Err(b)) => assert_eq!(a.to_string(), b.to_string()),
                _ => panic!("conversion not idempotent for {:?}", raw),
            }
        }
    }
}
