//! Encoding of caller payloads into the opaque blob kept under `v_Data`.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Arbitrary structured secret data supplied by the caller.
pub type Payload = Map<String, Value>;

pub trait PayloadCodec {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>>;

    /// `None` when the blob is not a payload this codec understands.
    fn decode(&self, blob: &[u8]) -> Option<Payload>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode(&self, payload: &Payload) -> Result<Vec<u8>> {
        serde_json::to_vec(payload).map_err(|e| {
            tracing::warn!(error = %e, "failed to encode payload");
            Error::InvalidParameter
        })
    }

    fn decode(&self, blob: &[u8]) -> Option<Payload> {
        serde_json::from_slice(blob).ok()
    }
}
