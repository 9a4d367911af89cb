use super::validation::decode_extraction;
use crate::models::PatientExtraction;

/// Opening marker of the structured block, matched ASCII case-insensitively.
pub const FENCE_OPEN: &str = "```json";
const FENCE: &str = "```";

/// Upper bound on the structured block body. Anything larger is treated as
/// "no block" rather than decoded.
pub const MAX_BLOCK_BYTES: usize = 64 * 1024;

/// How the structured part of a response was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// A block was found and decoded.
    Extracted,
    /// No usable block; the whole response is the message.
    NoBlock,
    /// A block was found but did not decode; defaults were used.
    DecodeFailed(String),
}

/// A model response split into its structured record and user-facing prose.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub extraction: PatientExtraction,
    pub message: String,
    pub outcome: ExtractionOutcome,
}

/// Location of the first structured block within a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FencedBlock<'a> {
    /// Byte offset of the opening marker.
    start: usize,
    /// Byte offset just past the closing marker.
    end: usize,
    body: &'a str,
}

/// Split a model response into a `PatientExtraction` and the prose around it.
///
/// Never fails: a missing, malformed or undecodable block yields
/// `PatientExtraction::default()`. Only the first block is consumed; later
/// blocks stay in the message untouched.
pub fn parse_extraction_response(response: &str) -> ParsedResponse {
    let Some(block) = locate_block(response) else {
        tracing::debug!(response_len = response.len(), "No structured block in model response");
        return ParsedResponse {
            extraction: PatientExtraction::default(),
            message: response.trim().to_string(),
            outcome: ExtractionOutcome::NoBlock,
        };
    };

    let message = strip_block(response, &block);

    match decode_extraction(block.body) {
        Ok(extraction) => ParsedResponse {
            extraction,
            message,
            outcome: ExtractionOutcome::Extracted,
        },
        Err(e) => {
            tracing::warn!(error = %e, body_len = block.body.len(), "Structured block failed to decode, using defaults");
            ParsedResponse {
                extraction: PatientExtraction::default(),
                message,
                outcome: ExtractionOutcome::DecodeFailed(e.to_string()),
            }
        }
    }
}

/// Convenience wrapper returning only the extraction.
pub fn parse_extraction(response: &str) -> PatientExtraction {
    parse_extraction_response(response).extraction
}

/// Find the first `FENCE_OPEN ... FENCE` region.
///
/// Returns `None` for unterminated blocks, blocks whose tag runs on
/// (e.g. `` ```jsonl ``), empty or oversized bodies, and nested fences (the
/// first closing marker is itself another opening tag).
fn locate_block(text: &str) -> Option<FencedBlock<'_>> {
    // ASCII lowercasing keeps byte offsets identical.
    let lower = text.to_ascii_lowercase();
    let start = lower.find(FENCE_OPEN)?;
    let body_start = start + FENCE_OPEN.len();

    if text[body_start..]
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }

    let close_rel = text[body_start..].find(FENCE)?;
    let body_end = body_start + close_rel;
    let end = body_end + FENCE.len();

    let after_close = &text[end..];
    if after_close
        .chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric())
    {
        return None;
    }

    let body = text[body_start..body_end].trim();
    if body.is_empty() || body.len() > MAX_BLOCK_BYTES {
        return None;
    }

    Some(FencedBlock { start, end, body })
}

fn strip_block(text: &str, block: &FencedBlock<'_>) -> String {
    let before = text[..block.start].trim_end();
    let after = text[block.end..].trim_start();
    match (before.is_empty(), after.is_empty()) {
        (true, _) => after.trim_end().to_string(),
        (false, true) => before.trim_start().to_string(),
        (false, false) => format!("{}\n\n{}", before.trim_start(), after.trim_end()),
    }
}
