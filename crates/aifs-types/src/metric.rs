use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Distance metric for embedding vectors.
///
/// Carried in embed payload headers and configured per vector-index
/// namespace. Scores are "smaller is closer" for the true distances and
/// negated for the similarity metrics, so best-first ordering is uniform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
    Euclidean,
    Dot,
    Manhattan,
    Hamming,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dot => "dot",
            Self::Manhattan => "manhattan",
            Self::Hamming => "hamming",
        }
    }

    pub fn parse(s: &str) -> Result<Self, TypeError> {
        match s {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "dot" => Ok(Self::Dot),
            "manhattan" => Ok(Self::Manhattan),
            "hamming" => Ok(Self::Hamming),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
