//! JSON text codec for the signaling envelope.

use crate::model::{Signal, SignalEnvelope, SignalKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown message type '{0}'")]
    UnknownType(String),

    #[error("Message '{kind}' is missing required field '{field}'")]
    MissingField {
        kind: SignalKind,
        field: &'static str,
    },
}

pub fn decode(text: &str) -> Result<Signal, CodecError> {
    let envelope: SignalEnvelope = serde_json::from_str(text)?;
    Signal::try_from(envelope)
}

pub fn encode(signal: &Signal) -> Result<String, CodecError> {
    let envelope = SignalEnvelope::from(signal.clone());
    Ok(serde_json::to_string(&envelope)?)
}
