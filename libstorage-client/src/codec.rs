//! JSON payload encoding and response decoding.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{ClientError, Result};

/// Content type sent with every request that carries a payload.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Encode an optional payload. An absent payload yields an absent body.
pub fn encode_payload<P>(payload: Option<&P>) -> Result<Option<Bytes>>
where
    P: Serialize + ?Sized,
{
    payload
        .map(|p| {
            serde_json::to_vec(p)
                .map(Bytes::from)
                .map_err(|e| ClientError::Encode(format!("JSON encoding failed: {}", e)))
        })
        .transpose()
}

/// Decode a fully-read response body.
pub fn decode_body<R>(body: &[u8]) -> Result<R>
where
    R: DeserializeOwned,
{
    serde_json::from_slice(body)
        .map_err(|e| ClientError::Decode(format!("JSON decoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct CreateRequest {
        name: String,
        size: i64,
        opts: BTreeMap<String, String>,
    }

    #[test]
    fn test_absent_payload_is_absent_body() {
        let body = encode_payload::<()>(None).unwrap();
        assert!(body.is_none());
    }

    #[test]
    fn test_payload_decodes_back_to_original() {
        let req = CreateRequest {
            name: "vol-1".into(),
            size: 10,
            opts: BTreeMap::from([("tier".to_string(), "gold".to_string())]),
        };
        let body = encode_payload(Some(&req)).unwrap().unwrap();
        let decoded: CreateRequest = decode_body(&body).unwrap();
        assert_eq!(decoded, req);
    }

    #[test]
    fn test_unsized_payload() {
        let names: &[&str] = &["a", "b"];
        let body = encode_payload(Some(names)).unwrap().unwrap();
        assert_eq!(&body[..], br#"["a","b"]"#);
    }

    #[test]
    fn test_encode_failure_is_encode_error() {
        // JSON object keys must be strings
        let bad = BTreeMap::from([((1, 2), "x")]);
        let err = encode_payload(Some(&bad)).unwrap_err();
        assert!(matches!(err, ClientError::Encode(_)));
    }

    #[test]
    fn test_invalid_json_is_decode_error() {
        let err = decode_body::<Vec<String>>(b"not-json").unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn test_wrong_shape_is_decode_error() {
        let err = decode_body::<Vec<String>>(br#"{"volumes":1}"#).unwrap_err();
        assert!(err.is_decode());
    }
}
