//! Prompt construction and reply parsing shared by every LLM-backed provider
//!
//! The model is asked for a single JSON object:
//!
//! ```json
//! {"decision": "...", "confidence": 0.0, "actions": ["..."]}
//! ```
//!
//! Models do not always comply, so a plain-text reply is accepted as the
//! decision itself with [`DEFAULT_CONFIDENCE`].

use crate::error::ProviderError;
use crate::orchestration::{OrchestrationRequest, agent_for_event};
use crate::providers::Invocation;
use serde::Deserialize;

/// Replies larger than this are treated as a malfunction
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024;

/// Confidence assigned to replies that do not report one
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Serialized context is cut at this many characters
const MAX_CONTEXT_CHARS: usize = 4000;

/// System instruction sent ahead of the user prompt
pub const SYSTEM_PROMPT: &str = "You are an IT operations agent that decides how to handle \
    service-management events. Reply with a single JSON object and nothing else.";

/// Build the user prompt for `request`
pub fn build_prompt(request: &OrchestrationRequest) -> String {
    let context = serde_json::to_string_pretty(request.context()).unwrap_or_default();

    // Char-based truncation so multi-byte input never splits a code point
    let context = if context.chars().count() > MAX_CONTEXT_CHARS {
        let truncated: String = context.chars().take(MAX_CONTEXT_CHARS).collect();
        format!("{}... [truncated]", truncated)
    } else {
        context
    };

    format!(
        "Agent: {}\n\
         Event type: {}\n\n\
         Event context:\n{}\n\n\
         Decide what should happen next. Respond with ONLY a JSON object of the form\n\
         {{\"decision\": \"<one sentence>\", \"confidence\": <number between 0 and 1>, \
         \"actions\": [\"<snake_case_action>\", ...]}}",
        agent_for_event(request.event_type()),
        request.event_type(),
        context
    )
}

/// Append a streamed chunk, enforcing [`MAX_RESPONSE_BYTES`]
pub(crate) fn append_chunk(
    provider: &str,
    buffer: &mut String,
    chunk: &str,
) -> Result<(), ProviderError> {
    let size = buffer.len() + chunk.len();
    if size > MAX_RESPONSE_BYTES {
        return Err(ProviderError::ResponseTooLarge {
            provider: provider.to_string(),
            size,
            max_bytes: MAX_RESPONSE_BYTES,
        });
    }
    buffer.push_str(chunk);
    Ok(())
}

#[derive(Deserialize)]
struct Reply {
    decision: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    actions: Vec<String>,
}

/// Parse a model reply into an [`Invocation`]
///
/// # Errors
/// - `EmptyResponse` for blank replies
/// - `ResponseTooLarge` above [`MAX_RESPONSE_BYTES`]
/// - `InvalidResponse` for a JSON object without a usable `decision`
pub fn parse_response(provider: &str, text: &str) -> Result<Invocation, ProviderError> {
    if text.len() > MAX_RESPONSE_BYTES {
        return Err(ProviderError::ResponseTooLarge {
            provider: provider.to_string(),
            size: text.len(),
            max_bytes: MAX_RESPONSE_BYTES,
        });
    }

    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(ProviderError::EmptyResponse {
            provider: provider.to_string(),
        });
    }

    if !body.starts_with('{') {
        return Ok(Invocation {
            decision: body.to_string(),
            confidence: DEFAULT_CONFIDENCE,
            actions: Vec::new(),
        });
    }

    let reply: Reply = serde_json::from_str(body).map_err(|e| {
        tracing::warn!(
            provider = %provider,
            error = %e,
            response_length = body.len(),
            "Provider returned malformed JSON decision"
        );
        ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("malformed decision object: {}", e),
        }
    })?;

    let decision = reply.decision.trim();
    if decision.is_empty() {
        return Err(ProviderError::InvalidResponse {
            provider: provider.to_string(),
            reason: "decision is empty".to_string(),
        });
    }

    let confidence = reply
        .confidence
        .filter(|c| c.is_finite())
        .unwrap_or(DEFAULT_CONFIDENCE);

    Ok(Invocation {
        decision: decision.to_string(),
        confidence,
        actions: reply
            .actions
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
    })
}

/// Remove a surrounding Markdown code fence (```json ... ```), if any
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the info string ("json") on the opening line
    match rest.find('\n') {
        Some(newline) => rest[newline + 1..].trim(),
        None => rest.trim(),
    }
}
