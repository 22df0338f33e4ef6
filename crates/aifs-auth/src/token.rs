use base64::prelude::{Engine as _, BASE64_STANDARD_NO_PAD};
use serde::{Deserialize, Serialize};

use crate::verifier::AuthError;

/// A capability token.
///
/// The signature is a chained MAC: `sig_0 = MAC(secret, identifier)`,
/// then `sig_{i+1} = MAC(sig_i, caveat_i)`. Appending a caveat only needs
/// the previous signature, so holders can attenuate; removing one would
/// require inverting the MAC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityToken {
    pub location: String,
    pub identifier: String,
    /// Caveat predicate strings, in chain order.
    pub caveats: Vec<String>,
    /// Hex MAC over the caveat chain.
    pub signature: String,
}

impl CapabilityToken {
    /// Append a first-party caveat, extending the MAC chain.
    pub fn attenuate(mut self, predicate: impl Into<String>) -> Self {
        let predicate = predicate.into();
        let prev = self.signature_bytes().unwrap_or([0u8; 32]);
        self.signature = hex::encode(chain_mac(&prev, predicate.as_bytes()));
        self.caveats.push(predicate);
        self
    }

    /// The raw signature bytes, if the hex is well-formed.
    pub fn signature_bytes(&self) -> Option<[u8; 32]> {
        let bytes = hex::decode(&self.signature).ok()?;
        bytes.try_into().ok()
    }

    /// Serialize to the bearer form (base64 of the JSON encoding).
    pub fn serialize(&self) -> String {
        let json = serde_json::to_vec(self).expect("token serializes");
        BASE64_STANDARD_NO_PAD.encode(json)
    }

    /// Parse the bearer form.
    pub fn parse(token: &str) -> Result<Self, AuthError> {
        let json = BASE64_STANDARD_NO_PAD
            .decode(token.trim())
            .map_err(|_| AuthError::Unauthenticated("token is not base64".into()))?;
        serde_json::from_slice(&json)
            .map_err(|_| AuthError::Unauthenticated("token is not valid JSON".into()))
    }
}

/// One step of the MAC chain: keyed BLAKE3 of the data under the previous
/// signature (or the root secret for the first step).
pub(crate) fn chain_mac(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
    *blake3::keyed_hash(key, data).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_token() -> CapabilityToken {
        let secret = [7u8; 32];
        CapabilityToken {
            location: "aifs://localhost".into(),
            identifier: "user-42".into(),
            caveats: vec![],
            signature: hex::encode(chain_mac(&secret, b"user-42")),
        }
    }

    #[test]
    fn serialize_parse_roundtrip() {
        let token = root_token().attenuate("method = get");
        let parsed = CapabilityToken::parse(&token.serialize()).unwrap();
        assert_eq!(parsed, token);
    }

    #[test]
    fn attenuate_extends_chain() {
        let token = root_token();
        let restricted = token.clone().attenuate("namespace = prod");
        assert_eq!(restricted.caveats.len(), 1);
        assert_ne!(restricted.signature, token.signature);
    }

    #[test]
    fn attenuation_is_deterministic() {
        let a = root_token().attenuate("method = get");
        let b = root_token().attenuate("method = get");
        assert_eq!(a.signature, b.signature);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(CapabilityToken::parse("!!! not base64 !!!").is_err());
        let b64 = BASE64_STANDARD_NO_PAD.encode(b"not json");
        assert!(CapabilityToken::parse(&b64).is_err());
    }
}
