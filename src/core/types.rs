//! Core types - Credentials and the request/response values of one call

use std::fmt;

use reqwest::header::HeaderValue;
use serde_json::{Map, Value};

use crate::core::{Error, Result};

/// Fixed API root of the ICObench service
pub const API_URL: &str = "https://icobench.com/api/v1/";

/// Header carrying the public key
pub const KEY_HEADER: &str = "X-ICObench-Key";

/// Header carrying the base64 HMAC-SHA384 signature
pub const SIG_HEADER: &str = "X-ICObench-Sig";

/// JSON object sent as the request body
pub type RequestBody = Map<String, Value>;

/// Normalized result of a call: decoded JSON or the envelope's `message`
pub type Payload = Value;

/// API key pair. The private key never leaves this struct except through
/// the signer.
#[derive(Clone)]
pub struct Credentials {
    private_key: String,
    public_key: String,
}

impl Credentials {
    pub fn new(private_key: impl Into<String>, public_key: impl Into<String>) -> Result<Self> {
        let private_key = private_key.into();
        let public_key = public_key.into();

        if private_key.is_empty() {
            return Err(Error::Config("private key is empty".to_string()));
        }
        if public_key.is_empty() {
            return Err(Error::Config("public key is empty".to_string()));
        }
        HeaderValue::from_str(&public_key).map_err(|e| {
            Error::Config(format!("public key is not a valid header value: {}", e))
        })?;

        Ok(Self { private_key, public_key })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub(crate) fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Authentication headers of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub key: String,
    pub signature: String,
}

impl SignedHeaders {
    /// Header name/value pairs in wire order
    pub fn pairs(&self) -> [(&'static str, &str); 2] {
        [(KEY_HEADER, &self.key), (SIG_HEADER, &self.signature)]
    }
}

/// A built and signed call, ready for the transport.
///
/// `body` is the exact byte sequence the signature was computed over.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub path: String,
    pub body: Vec<u8>,
    pub headers: SignedHeaders,
}

/// Raw answer handed back by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ResponseEnvelope {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_reject_empty_keys() {
        assert!(matches!(Credentials::new("", "pub"), Err(Error::Config(_))));
        assert!(matches!(Credentials::new("priv", ""), Err(Error::Config(_))));
    }

    #[test]
    fn test_credentials_reject_unprintable_public_key() {
        let result = Credentials::new("priv", "bad\nkey");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let creds = Credentials::new("top-secret", "pub-123").unwrap();
        let shown = format!("{:?}", creds);
        assert!(!shown.contains("top-secret"));
        assert!(shown.contains("pub-123"));
    }

    #[test]
    fn test_header_pairs() {
        let headers = SignedHeaders {
            key: "pub".to_string(),
            signature: "sig".to_string(),
        };
        assert_eq!(
            headers.pairs(),
            [("X-ICObench-Key", "pub"), ("X-ICObench-Sig", "sig")]
        );
    }
}
