use serde::{Deserialize, Serialize};

/// RPC method classes a token can be restricted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Put,
    Get,
    Search,
    Snapshot,
    Branch,
    Tag,
    Admin,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Get => "get",
            Self::Search => "search",
            Self::Snapshot => "snapshot",
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "put" => Some(Self::Put),
            "get" => Some(Self::Get),
            "search" => Some(Self::Search),
            "snapshot" => Some(Self::Snapshot),
            "branch" => Some(Self::Branch),
            "tag" => Some(Self::Tag),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A first-party caveat.
///
/// Caveats travel as predicate strings (`"method = get"`) inside the MAC
/// chain; this enum is the parsed view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Caveat {
    /// Restrict to one namespace.
    Namespace(String),
    /// Allow these methods only. Multiple method caveats intersect.
    Methods(Vec<Method>),
    /// Token invalid after this epoch second.
    Expires(u64),
}

impl Caveat {
    /// Render to the canonical predicate string covered by the MAC.
    pub fn predicate(&self) -> String {
        match self {
            Self::Namespace(ns) => format!("namespace = {ns}"),
            Self::Methods(methods) => {
                let list: Vec<&str> = methods.iter().map(Method::as_str).collect();
                format!("method = {}", list.join(","))
            }
            Self::Expires(t) => format!("expires = {t}"),
        }
    }

    /// Parse a predicate string. Unknown predicates return `None`; the
    /// verifier treats them as unsatisfiable.
    pub fn parse(predicate: &str) -> Option<Self> {
        let (key, value) = predicate.split_once('=')?;
        let key = key.trim();
        let value = value.trim();
        match key {
            "namespace" => Some(Self::Namespace(value.to_string())),
            "method" => {
                let methods: Option<Vec<Method>> =
                    value.split(',').map(|m| Method::parse(m.trim())).collect();
                methods.map(Self::Methods)
            }
            "expires" => value.parse().ok().map(Self::Expires),
            _ => None,
        }
    }
}
