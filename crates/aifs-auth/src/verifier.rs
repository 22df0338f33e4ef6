use thiserror::Error;

use crate::caveat::{Caveat, Method};
use crate::token::{chain_mac, CapabilityToken};

/// Authorization failures.
///
/// `Unauthenticated` means the token itself is no good (bad MAC, expired,
/// malformed); `PermissionDenied` means a valid token does not cover the
/// requested operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Mints and verifies capability tokens against a server-held secret.
///
/// The secret is fixed at startup; rotation requires a restart.
pub struct Authorizer {
    secret: [u8; 32],
    location: String,
}

impl Authorizer {
    pub fn new(secret: [u8; 32], location: impl Into<String>) -> Self {
        Self {
            secret,
            location: location.into(),
        }
    }

    /// Mint a token for `identifier` carrying the given caveats.
    pub fn mint(&self, identifier: &str, caveats: &[Caveat]) -> CapabilityToken {
        let mut token = CapabilityToken {
            location: self.location.clone(),
            identifier: identifier.to_string(),
            caveats: Vec::new(),
            signature: hex::encode(chain_mac(&self.secret, identifier.as_bytes())),
        };
        for caveat in caveats {
            token = token.attenuate(caveat.predicate());
        }
        token
    }

    /// Verify a bearer token against a request.
    ///
    /// Checks, in order: MAC chain, expiry, method coverage, namespace
    /// restriction. `now` is epoch seconds.
    pub fn verify(
        &self,
        bearer: &str,
        required: Method,
        namespace: &str,
        now: u64,
    ) -> Result<CapabilityToken, AuthError> {
        let token = CapabilityToken::parse(bearer)?;

        // Recompute the MAC chain over identifier + caveats.
        let mut mac = chain_mac(&self.secret, token.identifier.as_bytes());
        for predicate in &token.caveats {
            mac = chain_mac(&mac, predicate.as_bytes());
        }
        let presented = token
            .signature_bytes()
            .ok_or_else(|| AuthError::Unauthenticated("malformed signature".into()))?;
        if mac != presented {
            return Err(AuthError::Unauthenticated("signature mismatch".into()));
        }

        // Every caveat must be satisfied by this request.
        for predicate in &token.caveats {
            let caveat = Caveat::parse(predicate).ok_or_else(|| {
                AuthError::Unauthenticated(format!("unrecognized caveat: {predicate}"))
            })?;
            match caveat {
                Caveat::Expires(deadline) => {
                    if now > deadline {
                        return Err(AuthError::Unauthenticated("token expired".into()));
                    }
                }
                Caveat::Methods(methods) => {
                    // `admin` covers everything.
                    if !methods.contains(&required) && !methods.contains(&Method::Admin) {
                        return Err(AuthError::PermissionDenied(format!(
                            "method {required} not granted"
                        )));
                    }
                }
                Caveat::Namespace(ns) => {
                    if ns != namespace {
                        return Err(AuthError::PermissionDenied(format!(
                            "namespace {namespace} not granted"
                        )));
                    }
                }
            }
        }

        Ok(token)
    }

    /// Whether a verified token carries the `admin` method caveat (or no
    /// method caveat at all, which leaves every method open).
    pub fn grants_admin(token: &CapabilityToken) -> bool {
        let mut saw_method_caveat = false;
        for predicate in &token.caveats {
            if let Some(Caveat::Methods(methods)) = Caveat::parse(predicate) {
                saw_method_caveat = true;
                if methods.contains(&Method::Admin) {
                    return true;
                }
            }
        }
        !saw_method_caveat
    }
}

impl std::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Authorizer(location={}, secret=<redacted>)", self.location)
    }
}
