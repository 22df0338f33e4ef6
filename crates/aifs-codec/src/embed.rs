use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use aifs_types::DistanceMetric;

use crate::error::{CodecError, CodecResult};

/// Magic bytes prefixing an encoded embedding payload.
const MAGIC: &[u8; 4] = b"AIE1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct EmbedHeader {
    model_name: String,
    dimension: u32,
    distance_metric: DistanceMetric,
    parameters: BTreeMap<String, String>,
}

/// A fixed-dimension f32 embedding with model provenance.
///
/// Wire layout: `MAGIC || header_len(u32 LE) || bincode(header) || f32 LE
/// vector`. The declared dimension must equal the vector length; the
/// validator enforces this on both encode and decode.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbedPayload {
    pub model_name: String,
    pub distance_metric: DistanceMetric,
    pub parameters: BTreeMap<String, String>,
    pub vector: Vec<f32>,
}

impl EmbedPayload {
    pub fn new(
        model_name: impl Into<String>,
        vector: Vec<f32>,
        distance_metric: DistanceMetric,
    ) -> CodecResult<Self> {
        if vector.is_empty() {
            return Err(CodecError::Dimension {
                declared: 0,
                actual: 0,
            });
        }
        Ok(Self {
            model_name: model_name.into(),
            distance_metric,
            parameters: BTreeMap::new(),
            vector,
        })
    }

    pub fn with_parameters(mut self, parameters: BTreeMap<String, String>) -> Self {
        self.parameters = parameters;
        self
    }

    /// The vector dimension.
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    /// Encode to the deterministic wire form.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        let header = EmbedHeader {
            model_name: self.model_name.clone(),
            dimension: self.vector.len() as u32,
            distance_metric: self.distance_metric,
            parameters: self.parameters.clone(),
        };
        let header_bytes =
            bincode::serialize(&header).map_err(|e| CodecError::Header(e.to_string()))?;
        let mut out = Vec::with_capacity(8 + header_bytes.len() + self.vector.len() * 4);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&header_bytes);
        for v in &self.vector {
            out.extend_from_slice(&v.to_le_bytes());
        }
        Ok(out)
    }

    /// Decode and validate an encoded embedding payload.
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        if data.len() < 8 {
            return Err(CodecError::Truncated(data.len()));
        }
        if &data[..4] != MAGIC {
            return Err(CodecError::BadMagic {
                expected: String::from_utf8_lossy(MAGIC).into_owned(),
                actual: String::from_utf8_lossy(&data[..4]).into_owned(),
            });
        }
        let header_len = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
        if data.len() < 8 + header_len {
            return Err(CodecError::Truncated(data.len()));
        }
        let header: EmbedHeader = bincode::deserialize(&data[8..8 + header_len])
            .map_err(|e| CodecError::Header(e.to_string()))?;

        let vec_bytes = &data[8 + header_len..];
        if vec_bytes.len() % 4 != 0 {
            return Err(CodecError::Truncated(data.len()));
        }
        let vector: Vec<f32> = vec_bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        if vector.is_empty() || vector.len() != header.dimension as usize {
            return Err(CodecError::Dimension {
                declared: header.dimension as usize,
                actual: vector.len(),
            });
        }

        Ok(Self {
            model_name: header.model_name,
            distance_metric: header.distance_metric,
            parameters: header.parameters,
            vector,
        })
    }
}
