use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// Magic bytes prefixing an encoded tensor payload.
const MAGIC: &[u8; 4] = b"AIT1";

/// Element types a tensor buffer may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
    Bool,
}

impl Dtype {
    /// Element width in bytes. `f16` travels as raw 2-byte words; `bool`
    /// is one byte per element.
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::I8 | Self::U8 | Self::Bool => 1,
            Self::I16 | Self::U16 | Self::F16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Bool => "bool",
        }
    }
}

/// Header travelling ahead of the element buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct TensorHeader {
    dtype: Dtype,
    shape: Vec<u64>,
    strides: Option<Vec<i64>>,
    null_bitmap: Option<Vec<u8>>,
    metadata: BTreeMap<String, String>,
}

/// An n-dimensional typed array payload.
///
/// Wire layout: `MAGIC || header_len(u32 LE) || bincode(header) || buffer`.
/// Round-trips preserve dtype, shape, and the exact element bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorPayload {
    pub dtype: Dtype,
    pub shape: Vec<u64>,
    pub strides: Option<Vec<i64>>,
    pub null_bitmap: Option<Vec<u8>>,
    pub metadata: BTreeMap<String, String>,
    /// Contiguous element buffer, row-major unless `strides` says otherwise.
    pub buffer: Vec<u8>,
}

impl TensorPayload {
    /// Construct a tensor payload, checking buffer size against the shape.
    pub fn new(dtype: Dtype, shape: Vec<u64>, buffer: Vec<u8>) -> CodecResult<Self> {
        let payload = Self {
            dtype,
            shape,
            strides: None,
            null_bitmap: None,
            metadata: BTreeMap::new(),
            buffer,
        };
        payload.check()?;
        Ok(payload)
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Total element count implied by the shape. A zero-rank tensor holds
    /// one scalar element.
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product::<u64>().max(u64::from(self.shape.is_empty()))
    }

    fn check(&self) -> CodecResult<()> {
        if self.shape.contains(&0) {
            return Err(CodecError::ZeroDimension);
        }
        let expected = self.element_count() as usize * self.dtype.size_bytes();
        if expected != self.buffer.len() {
            return Err(CodecError::BufferSize {
                expected,
                actual: self.buffer.len(),
            });
        }
        Ok(())
    }

    /// Encode to the deterministic wire form.
    pub fn encode(&self) -> CodecResult<Vec<u8>> {
        self.check()?;
        let header = TensorHeader {
            dtype: self.dtype,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            null_bitmap: self.null_bitmap.clone(),
            metadata: self.metadata.clone(),
        };
        let header_bytes =
            bincode::serialize(&header).map_err(|e| CodecError::Header(e.to_string()))?;
        let mut out = Vec::with_capacity(8 + header_bytes.len() + self.buffer.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&self.buffer);
        Ok(out)
    }

    /// Decode and validate an encoded tensor payload.
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
        let header: TensorHeader = bincode::deserialize(&data[8..8 + header_len])
            .map_err(|e| CodecError::Header(e.to_string()))?;
        let payload = Self {
            dtype: header.dtype,
            shape: header.shape,
            strides: header.strides,
            null_bitmap: header.null_bitmap,
            metadata: header.metadata,
            buffer: data[8 + header_len..].to_vec(),
        };
        payload.check()?;
        Ok(payload)
    }
}
