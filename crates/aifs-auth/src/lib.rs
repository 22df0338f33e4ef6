//! Capability tokens for AIFS.
//!
//! Tokens are macaroon-style bearer credentials: a location, an
//! identifier, a list of first-party caveats, and a MAC over the caveat
//! chain keyed by a server-held secret. Caveats only ever restrict —
//! anyone holding a token can attenuate it further, nobody can widen it
//! without the secret.
//!
//! Recognized caveats: `namespace = N`, `method = M` (from
//! `{put, get, search, snapshot, branch, tag, admin}`), `expires = T`
//! (epoch seconds).

pub mod caveat;
pub mod token;
pub mod verifier;

pub use caveat::{Caveat, Method};
pub use token::CapabilityToken;
pub use verifier::{AuthError, Authorizer};
