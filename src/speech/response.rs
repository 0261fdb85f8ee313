//! Parsing of the download stream body.
//!
//! The body is newline-delimited JSON. The service always ends it with an
//! empty-result sentinel, so the final transcript is on the second-to-last
//! line:
//!
//! ```text
//! {"result":[{"alternative":[{"transcript":"hello world"}],"final":true}],"result_index":0}
//! {"result":[]}
//! ```

use serde::Deserialize;
use thiserror::Error;

/// Why a download body could not be turned into a transcript.
///
/// When the service is unhappy it answers with an HTML page instead of
/// JSON, which lands here as `Malformed` or `TooShort`.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response has {lines} line(s), expected a result followed by a sentinel")]
    TooShort { lines: usize },

    #[error("result line is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("result line contains no result")]
    NoResult,

    #[error("result contains no alternative")]
    NoAlternative,
}

#[derive(Deserialize)]
struct RecognitionEvent {
    result: Vec<RecognitionResult>,
}

#[derive(Deserialize)]
struct RecognitionResult {
    alternative: Vec<Alternative>,
}

#[derive(Deserialize)]
struct Alternative {
    transcript: String,
}

/// Extract `result[0].alternative[0].transcript` from the second-to-last line.
pub fn parse_final_transcript(body: &str) -> Result<String, ResponseError> {
    let lines: Vec<&str> = body.split('\n').collect();
    if lines.len() < 2 {
        return Err(ResponseError::TooShort { lines: lines.len() });
    }

    let line = lines[lines.len() - 2].trim();
    let event: RecognitionEvent = serde_json::from_str(line)?;

    let result = event.result.into_iter().next().ok_or(ResponseError::NoResult)?;
    let alternative = result
        .alternative
        .into_iter()
        .next()
        .ok_or(ResponseError::NoAlternative)?;

    Ok(alternative.transcript)
}

/// A well-formed download body whose final transcript is `transcript`.
pub fn recognition_body(transcript: &str) -> String {
    let result = serde_json::json!({
        "result": [{
            "alternative": [{ "transcript": transcript, "confidence": 0.92 }],
            "final": true
        }],
        "result_index": 0
    });
    format!("{result}\n{{\"result\":[]}}")
}
