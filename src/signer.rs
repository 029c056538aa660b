//! HMAC-SHA384 request signing

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::Sha384;

use crate::core::{Credentials, SignedHeaders};

type HmacSha384 = Hmac<Sha384>;

/// base64(HMAC-SHA384(payload, private_key))
pub fn sign(payload: &[u8], private_key: &str) -> String {
    let mut mac = HmacSha384::new_from_slice(private_key.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    BASE64.encode(mac.finalize().into_bytes())
}

pub trait Signer: Send + Sync {
    fn sign(&self, payload: &[u8]) -> String;
    fn key_id(&self) -> &str;

    fn signed_headers(&self, payload: &[u8]) -> SignedHeaders {
        SignedHeaders {
            key: self.key_id().to_string(),
            signature: self.sign(payload),
        }
    }
}

pub struct HmacSigner {
    credentials: Credentials,
}

impl HmacSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl Signer for HmacSigner {
    fn sign(&self, payload: &[u8]) -> String {
        sign(payload, self.credentials.private_key())
    }

    fn key_id(&self) -> &str {
        self.credentials.public_key()
    }
}
