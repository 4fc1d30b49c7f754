use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use super::{AuthError, Claims};

/// Turns an access token into its claim mapping.
pub trait TokenDecoder: Send + Sync {
    fn decode(&self, token: &str) -> Result<Claims, AuthError>;
}

/// Reads the payload segment of a compact JWT.
///
/// The client only needs the claims to render identity and gate UI; the
/// server verifies signatures on every request, so none is checked here.
#[derive(Debug, Default, Clone, Copy)]
pub struct JwtDecoder;

impl TokenDecoder for JwtDecoder {
    fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode_payload(token)
    }
}

pub fn decode_payload(token: &str) -> Result<Claims, AuthError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    let [_header, payload, _signature] = segments.as_slice() else {
        return Err(AuthError::decode(format!(
            "expected 3 dot-separated segments, found {}",
            segments.len()
        )));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| AuthError::decode(format!("payload is not base64url: {e}")))?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(AuthError::decode("payload is not a JSON object")),
        Err(e) => Err(AuthError::decode(format!("payload is not JSON: {e}"))),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::unsigned_token;
    use serde_json::json;

    #[test]
    fn test_decode_payload() {
        let token = unsigned_token(&json!({"sub": "12", "role": ["Admin"]}));
        let claims = JwtDecoder.decode(&token).expect("token should decode");
        assert_eq!(claims.get("sub"), Some(&json!("12")));
        assert_eq!(claims.get("role"), Some(&json!(["Admin"])));
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        let body = base64::engine::general_purpose::URL_SAFE.encode(br#"{"sub":"1"}"#);
        let token = format!("e30.{body}.sig");
        assert!(decode_payload(&token).is_ok());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "e30.!!!.sig"] {
            assert!(
                matches!(decode_payload(token), Err(AuthError::Decode(_))),
                "{token:?} should not decode"
            );
        }

        let array = URL_SAFE_NO_PAD.encode(b"[1,2,3]");
        assert!(decode_payload(&format!("e30.{array}.sig")).is_err());

        let garbage = URL_SAFE_NO_PAD.encode(b"not json");
        assert!(decode_payload(&format!("e30.{garbage}.sig")).is_err());
    }
}
