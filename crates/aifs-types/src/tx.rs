use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(Uuid);

impl TxId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse from the canonical hyphenated form.
    pub fn parse(s: &str) -> Result<Self, crate::TypeError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::TypeError::InvalidHex(e.to_string()))
    }
}

impl Default for TxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &self.0.to_string()[..8])
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(TxId::new(), TxId::new());
    }

    #[test]
    fn parse_roundtrip() {
        let id = TxId::new();
        assert_eq!(TxId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(TxId::parse("not-a-uuid").is_err());
    }
}
