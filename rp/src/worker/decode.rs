//! Response body decoding

use tracing::debug;

use crate::domain::{ResponseBody, ResponseType, TaskError};
use crate::transport::TransportResponse;

/// Decode a 2xx body per the declared response type.
///
/// JSON is parsed only when the body arrived without an announced length;
/// otherwise it is passed through raw, as is any untyped body.
pub fn decode_body(response_type: Option<ResponseType>, response: &TransportResponse) -> Result<ResponseBody, TaskError> {
    debug!(?response_type, len = response.body.len(), length_computable = response.length_computable, "decode_body: called");
    let body = match response_type {
        Some(ResponseType::Text) => ResponseBody::Text(String::from_utf8_lossy(&response.body).into_owned()),
        Some(ResponseType::Document) => ResponseBody::Document(String::from_utf8_lossy(&response.body).into_owned()),
        Some(ResponseType::Blob) => ResponseBody::Blob(response.body.clone()),
        Some(ResponseType::Json) if !response.length_computable => {
            let value = serde_json::from_slice(&response.body).map_err(|e| {
                debug!(error = %e, "decode_body: invalid json");
                TaskError::Transport {
                    status: i32::from(response.status),
                    message: format!("invalid json: {}", e),
                }
            })?;
            ResponseBody::Json(value)
        }
        _ => ResponseBody::Raw(response.body.clone()),
    };
    Ok(body)
}
