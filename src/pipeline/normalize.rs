//! Response normalisation: one remote reply in, one text or [`FileError`]
//! out.
//!
//! Checks run in a fixed order:
//! 1. call failures (handle instantiation vs. transport)
//! 2. prompt-level block (`promptFeedback.blockReason`)
//! 3. a finish reason other than `STOP` on the first candidate
//! 4. missing or blank text

use super::assemble::ModelTarget;
use crate::error::{FileError, RemoteError};
use crate::vertex::types::{GenerateResponse, FINISH_REASON_STOP};
use tracing::{debug, warn};

pub fn normalize(
    target: &ModelTarget,
    reply: Result<GenerateResponse, RemoteError>,
) -> Result<String, FileError> {
    let response = match reply {
        Ok(r) => r,
        Err(e) if e.is_init_failure() => {
            warn!("Could not instantiate {}: {}", target, e);
            return Err(FileError::ModelInit {
                target: target.identifier.clone(),
                detail: e.to_string(),
            });
        }
        Err(e) => {
            warn!("Remote call to {} failed: {}", target, e);
            return Err(FileError::Transport(format!("Remote model call failed: {e}")));
        }
    };

    if let Some(usage) = &response.usage_metadata {
        debug!(
            "Token usage: prompt={} candidates={} total={}",
            usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
        );
    }

    if let Some(feedback) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_description())
    {
        return Err(FileError::PromptBlocked { feedback });
    }

    let Some(candidate) = response.candidates.first() else {
        return Err(FileError::EmptyResponse);
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != FINISH_REASON_STOP {
            return Err(FileError::Stopped {
                reason: reason.to_string(),
            });
        }
    }

    let text = candidate.text();
    if text.trim().is_empty() {
        return Err(FileError::EmptyResponse);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> ModelTarget {
        ModelTarget::base("gemini-test")
    }

    fn reply(value: serde_json::Value) -> Result<GenerateResponse, RemoteError> {
        Ok(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn success_text() {
        let out = normalize(&target(), Ok(GenerateResponse::from_text("**Summary:** hi")));
        assert_eq!(out.unwrap(), "**Summary:** hi");
    }

    #[test]
    fn non_stop_finish_reason_is_reported() {
        for reason in ["SAFETY", "MAX_TOKENS", "RECITATION"] {
            let err = normalize(
                &target(),
                reply(json!({"candidates":[{"content":{"parts":[{"text":"partial"}]},"finishReason":reason}]})),
            )
            .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Analysis stopped due to {reason}. Check safety settings or input content.")
            );
        }
    }

    #[test]
    fn blocked_prompt() {
        let err = normalize(
            &target(),
            reply(json!({"promptFeedback":{"blockReason":"PROHIBITED_CONTENT"}})),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Analysis failed. Reason: PROHIBITED_CONTENT");
    }

    #[test]
    fn empty_replies() {
        assert_eq!(normalize(&target(), reply(json!({}))).unwrap_err(), FileError::EmptyResponse);
        assert_eq!(
            normalize(
                &target(),
                reply(json!({"candidates":[{"content":{"parts":[{"text":"  \n"}]},"finishReason":"STOP"}]}))
            )
            .unwrap_err(),
            FileError::EmptyResponse
        );
        assert_eq!(
            normalize(&target(), reply(json!({"candidates":[{"finishReason":"STOP"}]}))).unwrap_err(),
            FileError::EmptyResponse
        );
    }

    #[test]
    fn missing_finish_reason_with_text_is_success() {
        let out = normalize(&target(), reply(json!({"candidates":[{"content":{"parts":[{"text":"ok"}]}}]})));
        assert_eq!(out.unwrap(), "ok");
    }

    #[test]
    fn transport_and_init_failures() {
        let err = normalize(
            &target(),
            Err(RemoteError::Http {
                status: 503,
                body: "unavailable".into(),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, FileError::Transport(_)));
        assert!(err.to_string().contains("503"));

        let err = normalize(&target(), Err(RemoteError::Auth("no token".into()))).unwrap_err();
        match err {
            FileError::ModelInit { target, .. } => assert_eq!(target, "gemini-test"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
