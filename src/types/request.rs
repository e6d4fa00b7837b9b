//! Classification request read from one line of standard input

use crate::error::RequestError;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// A single image classification request
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyRequest {
    /// Path of the image to classify; removed once the request is handled
    pub image: PathBuf,

    /// Current barometric pressure in hPa
    pub pressure: f64,

    /// Capture a new baseline from this request
    pub reset: bool,

    /// Floor the caller is on; only read when `reset` is set
    pub current_floor: Option<i64>,
}

/// Request as it appears on the wire
#[derive(Deserialize)]
struct RawClassifyRequest {
    image: PathBuf,

    #[serde(deserialize_with = "lenient_f64")]
    pressure: f64,

    #[serde(default)]
    reset: bool,

    /// Absent key is `None`, explicit `null` is `Some(None)`
    #[serde(default, deserialize_with = "present")]
    current_floor: Option<Option<NumberOrString>>,
}

impl ClassifyRequest {
    /// Decode and parse one raw protocol line
    pub fn from_line(line: &[u8]) -> Result<Self, RequestError> {
        Self::parse(std::str::from_utf8(line)?)
    }

    /// Parse and validate one protocol line
    pub fn parse(line: &str) -> Result<Self, RequestError> {
        let raw: RawClassifyRequest = serde_json::from_str(line)?;

        if !raw.pressure.is_finite() {
            return Err(RequestError::InvalidField {
                field: "pressure",
                reason: format!("{} is not a finite number", raw.pressure),
            });
        }

        let current_floor = match raw.current_floor {
            None => None,
            Some(None) if raw.reset => {
                return Err(RequestError::InvalidField {
                    field: "current_floor",
                    reason: "null is not a floor number".to_string(),
                })
            }
            Some(None) => None,
            Some(Some(value)) => Some(value.into_i64().map_err(|reason| {
                RequestError::InvalidField {
                    field: "current_floor",
                    reason,
                }
            })?),
        };

        Ok(Self {
            image: raw.image,
            pressure: raw.pressure,
            reset: raw.reset,
            current_floor,
        })
    }
}

/// Numbers may arrive as JSON numbers or numeric strings
#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64(self) -> Result<f64, String> {
        match self {
            NumberOrString::Int(v) => Ok(v as f64),
            NumberOrString::Float(v) => Ok(v),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("invalid number: {s:?}")),
        }
    }

    fn into_i64(self) -> Result<i64, String> {
        match self {
            NumberOrString::Int(v) => Ok(v),
            NumberOrString::Float(v) if v.is_finite() => Ok(v.trunc() as i64),
            NumberOrString::Float(v) => Err(format!("invalid integer: {v}")),
            NumberOrString::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid integer: {s:?}")),
        }
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?
        .into_f64()
        .map_err(serde::de::Error::custom)
}

/// Wraps any present value, `null` included, in `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_request() {
        let request = ClassifyRequest::parse(r#"{"image":"b.jpg","pressure":998.6}"#).unwrap();
        assert_eq!(request.image, PathBuf::from("b.jpg"));
        assert_eq!(request.pressure, 998.6);
        assert!(!request.reset);
        assert_eq!(request.current_floor, None);
    }

    #[test]
    fn test_parse_reset_request() {
        let request = ClassifyRequest::parse(
            r#"{"image":"a.jpg","pressure":1005,"reset":true,"current_floor":3}"#,
        )
        .unwrap();
        assert_eq!(request.pressure, 1005.0);
        assert!(request.reset);
        assert_eq!(request.current_floor, Some(3));
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let request = ClassifyRequest::parse(
            r#"{"image":"a.jpg","pressure":"1012.25","reset":true,"current_floor":"4"}"#,
        )
        .unwrap();
        assert_eq!(request.pressure, 1012.25);
        assert_eq!(request.current_floor, Some(4));

        let request =
            ClassifyRequest::parse(r#"{"image":"a.jpg","pressure":1000,"current_floor":2.9}"#)
                .unwrap();
        assert_eq!(request.current_floor, Some(2));
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        assert!(matches!(
            ClassifyRequest::parse(r#"{"pressure":1000.0}"#),
            Err(RequestError::Malformed(_))
        ));
        assert!(matches!(
            ClassifyRequest::parse(r#"{"image":"a.jpg"}"#),
            Err(RequestError::Malformed(_))
        ));
        assert!(matches!(
            ClassifyRequest::parse("not json"),
            Err(RequestError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_finite_pressure_is_rejected() {
        let err = ClassifyRequest::parse(r#"{"image":"a.jpg","pressure":"NaN"}"#).unwrap_err();
        assert!(matches!(err, RequestError::InvalidField { field: "pressure", .. }));
    }

    #[test]
    fn test_null_floor_on_reset_is_rejected() {
        let err = ClassifyRequest::parse(
            r#"{"image":"a.jpg","pressure":1000.0,"reset":true,"current_floor":null}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RequestError::InvalidField { field: "current_floor", .. }));

        // Only reset requests read the floor
        let request =
            ClassifyRequest::parse(r#"{"image":"a.jpg","pressure":1000.0,"current_floor":null}"#)
                .unwrap();
        assert_eq!(request.current_floor, None);

        // A missing key still falls back to the default floor
        let request =
            ClassifyRequest::parse(r#"{"image":"a.jpg","pressure":1000.0,"reset":true}"#).unwrap();
        assert_eq!(request.current_floor, None);
    }

    #[test]
    fn test_unparseable_floor_is_invalid_field() {
        let err = ClassifyRequest::parse(
            r#"{"image":"a.jpg","pressure":1000.0,"reset":true,"current_floor":"third"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, RequestError::InvalidField { field: "current_floor", .. }));
    }

    #[test]
    fn test_from_line_rejects_invalid_utf8() {
        let err = ClassifyRequest::from_line(b"\xff\xfe garbage").unwrap_err();
        assert!(matches!(err, RequestError::NotUtf8(_)));

        let request = ClassifyRequest::from_line(br#"{"image":"a.jpg","pressure":1000}"#).unwrap();
        assert_eq!(request.pressure, 1000.0);
    }
}
