use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// A structured queue payload.
///
/// Plain JSON types pass through the wire format untouched. The two special
/// cases, timestamps and exact decimals, are carried as tagged objects
/// (`{"_type": "datetime", "value": "..."}`) so they survive a text round
/// trip without losing precision.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Decimal(Decimal),
    DateTime(DateTime<FixedOffset>),
    Array(Vec<Payload>),
    Object(BTreeMap<String, Payload>),
}

const TYPE_KEY: &str = "_type";
const VALUE_KEY: &str = "value";
const TAG_DATETIME: &str = "datetime";
const TAG_DECIMAL: &str = "decimal";

/// Serialize a payload to wire text.
pub fn encode(payload: &Payload) -> Result<String> {
    Ok(serde_json::to_string(&to_tagged(payload))?)
}

/// Deserialize wire text back into a payload.
///
/// The exact inverse of [`encode`]: tagged objects are replaced with their
/// decoded types at any nesting depth, objects without a `_type` key pass
/// through unchanged. An unrecognised tag fails with [`Error::UnknownTag`].
pub fn decode(text: &str) -> Result<Payload> {
    let value: Value = serde_json::from_str(text)?;
    from_tagged(value)
}

/// Serialize a `(key, value)` work item to its wire form, a two-element
/// JSON array `[key, value]`.
pub(crate) fn encode_pair(key: &str, value: &Payload) -> Result<String> {
    let pair = Value::Array(vec![Value::String(key.to_string()), to_tagged(value)]);
    Ok(serde_json::to_string(&pair)?)
}

/// Deserialize a stored work item back into its `(key, value)` pair.
pub(crate) fn decode_pair(text: &str) -> Result<(String, Payload)> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(Error::Queue(format!("expected [key, value] pair, got: {}", text)));
    };
    let mut items = items.into_iter();
    match (items.next(), items.next(), items.next()) {
        (Some(Value::String(key)), Some(value), None) => Ok((key, from_tagged(value)?)),
        _ => Err(Error::Queue(format!("expected [key, value] pair, got: {}", text))),
    }
}

fn to_tagged(payload: &Payload) -> Value {
    match payload {
        Payload::Null => Value::Null,
        Payload::Bool(b) => Value::Bool(*b),
        Payload::Int(i) => Value::Number((*i).into()),
        Payload::Float(f) => Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
        Payload::String(s) => Value::String(s.clone()),
        Payload::Decimal(d) => tagged(TAG_DECIMAL, d.to_string()),
        Payload::DateTime(dt) => tagged(TAG_DATETIME, dt.to_rfc3339()),
        Payload::Array(items) => Value::Array(items.iter().map(to_tagged).collect()),
        Payload::Object(fields) => {
            let mut map = Map::new();
            for (k, v) in fields {
                map.insert(k.clone(), to_tagged(v));
            }
            Value::Object(map)
        }
    }
}

fn tagged(tag: &str, value: String) -> Value {
    let mut map = Map::new();
    map.insert(TYPE_KEY.to_string(), Value::String(tag.to_string()));
    map.insert(VALUE_KEY.to_string(), Value::String(value));
    Value::Object(map)
}

fn from_tagged(value: Value) -> Result<Payload> {
    match value {
        Value::Null => Ok(Payload::Null),
        Value::Bool(b) => Ok(Payload::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Payload::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Payload::Float(f))
            } else {
                Err(Error::Queue(format!("unrepresentable number: {}", n)))
            }
        }
        Value::String(s) => Ok(Payload::String(s)),
        Value::Array(items) => Ok(Payload::Array(
            items.into_iter().map(from_tagged).collect::<Result<_>>()?,
        )),
        Value::Object(map) => match map.get(TYPE_KEY) {
            Some(Value::String(tag)) => decode_tagged(tag, &map),
            Some(other) => Err(Error::UnknownTag(other.to_string())),
            None => {
                let mut fields = BTreeMap::new();
                for (k, v) in map {
                    fields.insert(k, from_tagged(v)?);
                }
                Ok(Payload::Object(fields))
            }
        },
    }
}

fn decode_tagged(tag: &str, map: &Map<String, Value>) -> Result<Payload> {
    let raw = match map.get(VALUE_KEY) {
        Some(Value::String(s)) => s.as_str(),
        _ => {
            return Err(Error::Codec {
                tag: tag.to_string(),
                detail: "missing or non-string value field".to_string(),
            })
        }
    };
    match tag {
        TAG_DATETIME => parse_datetime(raw).map(Payload::DateTime).ok_or_else(|| Error::Codec {
            tag: tag.to_string(),
            detail: format!("unparseable datetime: {}", raw),
        }),
        TAG_DECIMAL => raw
            .parse::<Decimal>()
            .map(Payload::Decimal)
            .map_err(|e| Error::Codec {
                tag: tag.to_string(),
                detail: format!("unparseable decimal {}: {}", raw, e),
            }),
        unknown => Err(Error::UnknownTag(unknown.to_string())),
    }
}

// Producers that serialize naive timestamps omit the offset; those are read
// back as UTC.
fn parse_datetime(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::String(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::String(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Payload::Int(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Int(value as i64)
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Payload::Float(value)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Payload::Bool(value)
    }
}

impl From<Decimal> for Payload {
    fn from(value: Decimal) -> Self {
        Payload::Decimal(value)
    }
}

impl From<DateTime<FixedOffset>> for Payload {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Payload::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Payload {
    fn from(value: DateTime<Utc>) -> Self {
        Payload::DateTime(value.fixed_offset())
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(value: Vec<Payload>) -> Self {
        Payload::Array(value)
    }
}

impl From<BTreeMap<String, Payload>> for Payload {
    fn from(value: BTreeMap<String, Payload>) -> Self {
        Payload::Object(value)
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Payload::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_datetime() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2020, 8, 12, 11, 42, 25)
            .unwrap()
    }

    #[test]
    fn encodes_datetime_as_tagged_object() {
        let dt = sample_datetime();
        let mut fields = BTreeMap::new();
        fields.insert("d".to_string(), Payload::DateTime(dt));

        let text = encode(&Payload::Object(fields)).unwrap();

        assert_eq!(
            text,
            format!(r#"{{"d":{{"_type":"datetime","value":"{}"}}}}"#, dt.to_rfc3339()),
        );
    }

    #[test]
    fn encodes_decimal_as_tagged_object() {
        let mut fields = BTreeMap::new();
        fields.insert("d".to_string(), Payload::Decimal("1.23".parse().unwrap()));

        let text = encode(&Payload::Object(fields)).unwrap();

        assert_eq!(text, r#"{"d":{"_type":"decimal","value":"1.23"}}"#);
    }

    #[test]
    fn decodes_tagged_datetime() {
        let dt = sample_datetime();
        let text = format!(r#"{{"d":{{"_type":"datetime","value":"{}"}}}}"#, dt.to_rfc3339());

        let decoded = decode(&text).unwrap();

        let mut fields = BTreeMap::new();
        fields.insert("d".to_string(), Payload::DateTime(dt));
        assert_eq!(decoded, Payload::Object(fields));
    }

    #[test]
    fn decodes_naive_datetime_as_utc() {
        let text = r#"{"_type":"datetime","value":"2020-08-12T11:42:25"}"#;

        let decoded = decode(text).unwrap();

        assert_eq!(decoded, Payload::DateTime(sample_datetime()));
    }

    #[test]
    fn decodes_tagged_decimal_exactly() {
        let text = r#"{"d":{"_type":"decimal","value":"1.30561"}}"#;

        let decoded = decode(text).unwrap();

        let Payload::Object(fields) = decoded else { panic!("expected object") };
        assert_eq!(fields["d"], Payload::Decimal("1.30561".parse().unwrap()));
    }

    #[test]
    fn unknown_tag_fails_naming_the_tag() {
        let err = decode(r#"{"d":{"_type":"unknown"}}"#).unwrap_err();

        match err {
            Error::UnknownTag(tag) => assert_eq!(tag, "unknown"),
            other => panic!("expected UnknownTag, got {:?}", other),
        }
    }

    #[test]
    fn known_tag_with_missing_value_fails() {
        let err = decode(r#"{"d":{"_type":"decimal"}}"#).unwrap_err();

        assert!(matches!(err, Error::Codec { .. }));
    }

    #[test]
    fn untagged_objects_pass_through_at_depth() {
        let text = r#"{"outer":{"inner":{"a":1,"b":[true,null]}}}"#;

        let decoded = decode(text).unwrap();
        let reencoded = encode(&decoded).unwrap();

        assert_eq!(decode(&reencoded).unwrap(), decoded);
    }

    #[test]
    fn round_trips_nested_payload_exactly() {
        let mut trade = BTreeMap::new();
        trade.insert("account_number".to_string(), Payload::Int(60733123));
        trade.insert("asset".to_string(), Payload::from("GBPUSD"));
        trade.insert("close_price".to_string(), Payload::Decimal("1.30561".parse().unwrap()));
        trade.insert("close_time".to_string(), Payload::DateTime(sample_datetime()));
        trade.insert("pnl_cash".to_string(), Payload::Decimal("-0.57".parse().unwrap()));
        trade.insert("risking".to_string(), Payload::Null);
        trade.insert("volume".to_string(), Payload::Float(0.05));
        trade.insert(
            "legs".to_string(),
            Payload::Array(vec![Payload::Int(1), Payload::from("hedge")]),
        );
        let value = Payload::Object(trade);

        let decoded = decode(&encode(&value).unwrap()).unwrap();

        assert_eq!(decoded, value);
    }

    #[test]
    fn decimal_scale_survives_round_trip() {
        let value = Payload::Decimal("0.0".parse().unwrap());

        let text = encode(&value).unwrap();

        assert_eq!(text, r#"{"_type":"decimal","value":"0.0"}"#);
        assert_eq!(decode(&text).unwrap(), value);
    }

    #[test]
    fn pair_round_trips() {
        let value = Payload::from("v");

        let text = encode_pair("k", &value).unwrap();
        assert_eq!(text, r#"["k","v"]"#);

        let (key, decoded) = decode_pair(&text).unwrap();
        assert_eq!(key, "k");
        assert_eq!(decoded, value);
    }

    #[test]
    fn pair_rejects_non_pair_wire_data() {
        assert!(decode_pair(r#"{"k":"v"}"#).is_err());
        assert!(decode_pair(r#"["k","v","extra"]"#).is_err());
    }
}
