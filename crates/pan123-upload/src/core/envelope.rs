use serde_json::Value;

use crate::data::wire::Envelope;
use crate::error::{ApiError, NO_TRACE_ID};

/// Decode a raw API response into its `data` payload.
///
/// - status other than 200 → [`ApiError::Transport`]
/// - body that is not an envelope → [`ApiError::Protocol`]
/// - non-zero `code` → [`ApiError::Api`]
pub fn decode_envelope(status: u16, body: &[u8]) -> Result<Value, ApiError> {
    if status != 200 {
        return Err(ApiError::Transport {
            status:  Some(status),
            message: format!("http_code error: {status}"),
        });
    }
    let envelope: Envelope = serde_json::from_slice(body).map_err(|e| {
        ApiError::Protocol(format!("http_resp not json ({e}): {}", String::from_utf8_lossy(body)))
    })?;
    if envelope.code != 0 {
        return Err(ApiError::Api {
            code:     envelope.code,
            message:  envelope.message,
            trace_id: envelope.trace_id.unwrap_or_else(|| NO_TRACE_ID.to_string()),
        });
    }
    Ok(envelope.data)
}
