//! Response payloads.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Empty,
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl ResponseBody {
    /// Decode raw bytes according to the caller's response-type hint.
    ///
    /// JSON is decoded leniently: a body that is not valid JSON is kept as text.
    pub fn decode(bytes: &[u8], hint: crate::http::request::ResponseType) -> Self {
        use crate::http::request::ResponseType;

        if bytes.is_empty() {
            return ResponseBody::Empty;
        }
        match hint {
            ResponseType::Json => match serde_json::from_slice(bytes) {
                Ok(value) => ResponseBody::Json(value),
                Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
            },
            ResponseType::Text => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
            ResponseType::Bytes => ResponseBody::Bytes(bytes.to_vec()),
        }
    }

    /// The body as a JSON value, if it was decoded as JSON.
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Deserialize into the caller's type according to how the body was decoded.
    ///
    /// Text maps to a JSON string and bytes to a sequence of `u8`, so `String`
    /// and `Vec<u8>` targets work with the Text and Bytes hints. Text is never
    /// re-parsed as JSON here.
    pub fn deserialize<R: DeserializeOwned>(self) -> Result<R, serde_json::Error> {
        let value = match self {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => Value::String(text),
            ResponseBody::Bytes(bytes) => {
                Value::Array(bytes.into_iter().map(Value::from).collect())
            }
        };
        serde_json::from_value(value)
    }

    /// Best-effort conversion into a JSON value, for display.
    pub fn into_json(self) -> Value {
        match self {
            ResponseBody::Empty => Value::Null,
            ResponseBody::Json(value) => value,
            ResponseBody::Text(text) => {
                serde_json::from_str(&text).unwrap_or(Value::String(text))
            }
            ResponseBody::Bytes(bytes) => serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())),
        }
    }
}

/// A successful response, unwrapped from the transport.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// Lowercase header names.
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
    /// Echoed by the destination, or the ID this attempt was sent with.
    pub correlation_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::ResponseType;
    use serde_json::json;

    #[test]
    fn test_decode_by_hint() {
        assert_eq!(ResponseBody::decode(b"", ResponseType::Json), ResponseBody::Empty);
        assert_eq!(
            ResponseBody::decode(br#"{"id":1}"#, ResponseType::Json),
            ResponseBody::Json(json!({"id": 1}))
        );
        assert_eq!(
            ResponseBody::decode(b"plain", ResponseType::Json),
            ResponseBody::Text("plain".into())
        );
        assert_eq!(
            ResponseBody::decode(br#"{"id":1}"#, ResponseType::Text),
            ResponseBody::Text(r#"{"id":1}"#.into())
        );
        assert_eq!(
            ResponseBody::decode(&[0, 159], ResponseType::Bytes),
            ResponseBody::Bytes(vec![0, 159])
        );
    }

    #[test]
    fn test_deserialize_honours_variant() {
        let text: String = ResponseBody::Text("42".into()).deserialize().unwrap();
        assert_eq!(text, "42");

        let bytes: Vec<u8> = ResponseBody::Bytes(vec![0, 159, 255]).deserialize().unwrap();
        assert_eq!(bytes, vec![0, 159, 255]);

        let id: u64 = ResponseBody::Json(json!(7)).deserialize().unwrap();
        assert_eq!(id, 7);

        let nothing: Option<String> = ResponseBody::Empty.deserialize().unwrap();
        assert_eq!(nothing, None);

        assert!(ResponseBody::Text("42".into()).deserialize::<u64>().is_err());
    }

    #[test]
    fn test_into_json() {
        assert_eq!(ResponseBody::Empty.into_json(), Value::Null);
        assert_eq!(ResponseBody::Text("[1,2]".into()).into_json(), json!([1, 2]));
        assert_eq!(ResponseBody::Text("hi".into()).into_json(), json!("hi"));
        assert_eq!(ResponseBody::Bytes(b"true".to_vec()).into_json(), json!(true));
    }
}
