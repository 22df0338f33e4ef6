use crate::error::{ProtocolError, ProtocolResult};
use crate::message::{AifsMessage, MAX_MESSAGE_SIZE};

/// Codec for framed AIFS protocol messages.
pub struct AifsCodec;

impl AifsCodec {
    /// Encode a message with framing: `[4 bytes len][1 byte tag][payload]`.
    pub fn encode(msg: &AifsMessage) -> ProtocolResult<Vec<u8>> {
        let payload = bincode::serialize(msg)
            .map_err(|e| ProtocolError::Serialization(e.to_string()))?;
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: payload.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let len = (payload.len() + 1) as u32;
        let mut buf = Vec::with_capacity(4 + 1 + payload.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.push(msg.type_tag());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Decode one framed message. Returns `(message, bytes_consumed)`.
    pub fn decode(data: &[u8]) -> ProtocolResult<(AifsMessage, usize)> {
        if data.len() < 5 {
            return Err(ProtocolError::FramingError("too short".into()));
        }
        let len = u32::from_be_bytes(data[0..4].try_into().unwrap()) as usize;
        if len < 1 {
            return Err(ProtocolError::FramingError("zero-length frame".into()));
        }
        if len - 1 > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::MessageTooLarge {
                size: len - 1,
                max: MAX_MESSAGE_SIZE,
            });
        }
        let total = 4 + len;
        if data.len() < total {
            return Err(ProtocolError::FramingError(format!(
                "incomplete: have {}, need {}",
                data.len(),
                total
            )));
        }
        let payload = &data[5..total];
        let msg: AifsMessage = bincode::deserialize(payload)
            .map_err(|e| ProtocolError::Deserialization(e.to_string()))?;
        Ok((msg, total))
    }

    /// Decode a whole buffer of consecutive frames.
    pub fn decode_stream(mut data: &[u8]) -> ProtocolResult<Vec<AifsMessage>> {
        let mut messages = Vec::new();
        while !data.is_empty() {
            let (msg, consumed) = Self::decode(data)?;
            messages.push(msg);
            data = &data[consumed..];
        }
        Ok(messages)
    }
}
