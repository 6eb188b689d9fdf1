//! Strict parsing of Messages API payloads.
//!
//! The backend's JSON is treated as an external tagged variant: one parse
//! step maps it into the crate's own shape and rejects anything that does
//! not conform, so nothing downstream ever touches the raw structure.

use serde::Deserialize;

use tutor_core::{GenerationResponse, Result, TokenUsage, TutorError};

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Parse a successful Messages API response into a [`GenerationResponse`].
///
/// Text blocks are concatenated; a response with no text block at all is a
/// contract violation and fails with [`TutorError::ResponseParse`].
pub(crate) fn parse_messages_response(raw: &str) -> Result<GenerationResponse> {
    let parsed: MessagesResponse = serde_json::from_str(raw).map_err(|e| {
        TutorError::ResponseParse { message: format!("malformed messages response: {e}") }
    })?;

    let text: String = parsed
        .content
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
        .collect::<Vec<_>>()
        .join("");

    if text.is_empty() {
        return Err(TutorError::ResponseParse {
            message: "response contained no text content block".to_string(),
        });
    }

    Ok(GenerationResponse {
        text,
        usage: TokenUsage {
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        },
    })
}

/// Extract a human-readable detail string from an error payload, falling
/// back to the raw body when it is not the documented shape.
pub(crate) fn error_detail(raw: &str) -> String {
    serde_json::from_str::<ErrorResponse>(raw)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| raw.to_string())
}
