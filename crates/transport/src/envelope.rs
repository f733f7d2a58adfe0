//! Wire format for captured frames.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use framecast_common::error::{FramecastError, FramecastResult};

/// One frame on the wire: a JSON text message carrying the base64-encoded
/// image bytes and the capture timestamp in epoch milliseconds.
///
/// ```json
/// {"frame": "<base64>", "timestamp": 1712345678901}
/// ```
///
/// Envelopes carry no sequence number. Timestamps are non-decreasing in
/// send order, but a receiver observing transport reordering has no way
/// to restore it; consumers that care should sort by `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEnvelope {
    /// Base64 (standard alphabet, padded) image payload.
    pub frame: String,

    /// Capture time, milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl FrameEnvelope {
    /// Encode raw image bytes into an envelope.
    pub fn new(payload: &[u8], timestamp_ms: i64) -> Self {
        Self {
            frame: STANDARD.encode(payload),
            timestamp: timestamp_ms,
        }
    }

    /// Decode the image payload.
    ///
    /// # Errors
    ///
    /// Returns `FramecastError::Transport` if the `frame` field is not
    /// valid base64.
    pub fn payload(&self) -> FramecastResult<Vec<u8>> {
        STANDARD
            .decode(&self.frame)
            .map_err(|e| FramecastError::transport(format!("Invalid base64 payload: {e}")))
    }

    /// Serialize to the JSON text sent over the socket.
    pub fn to_json(&self) -> FramecastResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an envelope from received JSON text.
    pub fn from_json(text: &str) -> FramecastResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_shape_has_exact_keys() {
        let envelope = FrameEnvelope::new(b"\xff\xd8\xff", 1712345678901);
        let json = envelope.to_json().unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();

        assert_eq!(object.len(), 2);
        assert_eq!(object["frame"], "/9j/");
        assert_eq!(object["timestamp"], 1712345678901i64);
    }

    #[test]
    fn payload_decodes_to_original_bytes() {
        let bytes = vec![0u8, 1, 2, 254, 255];
        let envelope = FrameEnvelope::new(&bytes, 42);

        assert_eq!(envelope.payload().unwrap(), bytes);
        assert_eq!(envelope.timestamp, 42);
    }

    #[test]
    fn payload_rejects_invalid_base64() {
        let envelope = FrameEnvelope {
            frame: "not base64!!!".to_string(),
            timestamp: 0,
        };

        assert!(envelope.payload().is_err());
    }
}
