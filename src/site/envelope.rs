use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::app::{ComiciError, Result};

/// Application-level success code inside JSON bodies.
pub const SUCCESS_CODE: i64 = 1000;

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    code: i64,
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Unwrap `{code, result | message}`. The code is checked before the result
/// is interpreted, so server messages surface even for malformed payloads.
pub fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    let envelope: ApiEnvelope = serde_json::from_str(body)?;
    if envelope.code != SUCCESS_CODE {
        return Err(ComiciError::Api {
            code: envelope.code,
            message: envelope.message.unwrap_or_default(),
        });
    }
    let result = envelope
        .result
        .ok_or_else(|| ComiciError::Markup("response without result".into()))?;
    Ok(serde_json::from_value(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success() {
        let value: Vec<u32> = decode(r#"{"code":1000,"result":[1,2,3]}"#).unwrap();
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn test_error_code_carries_message() {
        let err = decode::<Vec<u32>>(r#"{"code":1003,"message":"not purchased"}"#).unwrap_err();
        match err {
            ComiciError::Api { code, message } => {
                assert_eq!(code, 1003);
                assert_eq!(message, "not purchased");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_code_checked_before_shape() {
        let err = decode::<Vec<u32>>(r#"{"code":500,"result":"garbage","message":"boom"}"#)
            .unwrap_err();
        assert!(matches!(err, ComiciError::Api { code: 500, .. }));
    }

    #[test]
    fn test_missing_result() {
        let err = decode::<Vec<u32>>(r#"{"code":1000}"#).unwrap_err();
        assert!(matches!(err, ComiciError::Markup(_)));
    }
}
