//! Gap asker: asks the user for the details the critique says are missing.
//!
//! Two-call protocol:
//! 1. No reply yet: publish a hint built from the critique, register a pending
//!    confirmation and return `awaiting_user_input`. Nothing else changes.
//! 2. Reply present: consume the pending request, write `user_input` and
//!    return `skipped`, `info_collected` or `error`.
//!
//! Every outcome is a value. Nothing here returns `Err` or panics, because the
//! caller is an orchestration loop that has to keep going.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::session::confirmation::ToolContext;
use crate::session::state::keys;

pub const TOOL_NAME: &str = "resume_gap_asker";
/// Reply token (compared case-insensitively) that opts out of adding details.
pub const SKIP_TOKEN: &str = "SKIP";
/// Stored in `user_input` when the user skips, so downstream stages never see the raw token.
pub const SKIP_EXPLANATION: &str = "User chose to proceed without additional information";
const WAITING_MESSAGE: &str = "Waiting for user response...";
const SKIPPED_MESSAGE: &str = "Proceeding with current resume...";
const REPLY_FIELD: &str = "user_response";

/// Result of one gap-asker invocation, serialized as `{"status": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GapAskResult {
    AwaitingUserInput { message: String },
    Skipped { user_input: String, message: String },
    InfoCollected { user_input: String },
    Error { message: String },
}

impl GapAskResult {
    pub fn status(&self) -> &'static str {
        match self {
            GapAskResult::AwaitingUserInput { .. } => "awaiting_user_input",
            GapAskResult::Skipped { .. } => "skipped",
            GapAskResult::InfoCollected { .. } => "info_collected",
            GapAskResult::Error { .. } => "error",
        }
    }
}

/// Builds the question shown to the user.
pub fn build_hint(critique: &str) -> String {
    format!(
        "To improve your resume, please provide: {critique}\n\n\
         You can also type '{SKIP_TOKEN}' to proceed with current resume."
    )
}

fn is_skip(response: &str) -> bool {
    response.trim().eq_ignore_ascii_case(SKIP_TOKEN)
}

/// Runs one step of the protocol against `ctx`.
pub fn ask_for_gaps(ctx: &mut ToolContext<'_>) -> GapAskResult {
    let Some(reply) = ctx.reply().cloned() else {
        let critique = ctx.state.get_text(keys::CRITIQUE).unwrap_or_default();
        let hint = build_hint(&critique);
        let payload = json!({ "user_response": "your input here" });
        let request_id = ctx.request_confirmation(TOOL_NAME, hint.clone(), payload).id;
        info!(%request_id, "gap asker waiting for user input");
        return GapAskResult::AwaitingUserInput {
            message: format!("{WAITING_MESSAGE}\n\n{hint}"),
        };
    };

    let Some(request) = ctx.take_pending() else {
        warn!("gap asker received a reply with no outstanding request");
        return GapAskResult::Error {
            message: "No question is outstanding for this session; reply ignored".to_string(),
        };
    };

    let response = match reply.payload.get(REPLY_FIELD) {
        Some(Value::String(text)) => text.clone(),
        Some(other) => {
            warn!(request_id = %request.id, "gap asker reply has non-string {REPLY_FIELD}");
            return GapAskResult::Error {
                message: format!("An error occurred: '{REPLY_FIELD}' must be a string, got {other}"),
            };
        }
        None => {
            warn!(request_id = %request.id, "gap asker reply is missing {REPLY_FIELD}");
            return GapAskResult::Error {
                message: format!("An error occurred: reply is missing '{REPLY_FIELD}'"),
            };
        }
    };

    if is_skip(&response) {
        ctx.state.set(keys::USER_INPUT, SKIP_EXPLANATION);
        info!(request_id = %request.id, "user skipped gap filling");
        return GapAskResult::Skipped {
            user_input: SKIP_EXPLANATION.to_string(),
            message: SKIPPED_MESSAGE.to_string(),
        };
    }

    ctx.state.set(keys::USER_INPUT, response.clone());
    info!(request_id = %request.id, chars = response.len(), "user supplied gap details");
    GapAskResult::InfoCollected {
        user_input: response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::confirmation::{ConfirmationReply, ConfirmationRequest};
    use crate::session::state::SessionState;

    const CRITIQUE: &str = "Add a quantified achievement to Project X";

    fn state_with_critique(critique: &str) -> SessionState {
        let mut state = SessionState::new();
        state.set(keys::CRITIQUE, critique);
        state
    }

    fn run(
        state: &mut SessionState,
        pending: &mut Option<ConfirmationRequest>,
        reply: Option<ConfirmationReply>,
    ) -> GapAskResult {
        let mut ctx = ToolContext::new(state, pending, reply);
        ask_for_gaps(&mut ctx)
    }

    #[test]
    fn test_first_call_awaits_and_leaves_user_input_alone() {
        for prior in [None, Some("earlier answer")] {
            let mut state = state_with_critique(CRITIQUE);
            if let Some(prior) = prior {
                state.set(keys::USER_INPUT, prior);
            }
            let before = state.get(keys::USER_INPUT).cloned();
            let mut pending = None;

            let result = run(&mut state, &mut pending, None);

            assert_eq!(result.status(), "awaiting_user_input");
            assert_eq!(state.get(keys::USER_INPUT).cloned(), before);
            let request = pending.expect("request registered");
            assert_eq!(request.tool, TOOL_NAME);
            assert_eq!(request.payload, json!({"user_response": "your input here"}));
        }
    }

    #[test]
    fn test_first_call_without_critique_still_awaits() {
        let mut state = SessionState::new();
        let mut pending = None;
        let result = run(&mut state, &mut pending, None);
        assert_eq!(result.status(), "awaiting_user_input");
        assert!(pending.is_some());
    }

    #[test]
    fn test_skip_is_case_insensitive() {
        for token in ["SKIP", "skip", "Skip", "  sKiP\n"] {
            let mut state = state_with_critique(CRITIQUE);
            let mut pending = None;
            run(&mut state, &mut pending, None);

            let result = run(
                &mut state,
                &mut pending,
                Some(ConfirmationReply::user_response(token)),
            );

            assert_eq!(result.status(), "skipped", "token {token:?}");
            assert!(pending.is_none());
        }
    }

    #[test]
    fn test_non_skip_reply_passes_through_verbatim() {
        for reply in ["Skipper of the sailing club", "  padded  ", "", "SKIP IT"] {
            let mut state = state_with_critique(CRITIQUE);
            let mut pending = None;
            run(&mut state, &mut pending, None);

            let result = run(
                &mut state,
                &mut pending,
                Some(ConfirmationReply::user_response(reply)),
            );

            assert_eq!(
                result,
                GapAskResult::InfoCollected {
                    user_input: reply.to_string()
                }
            );
            assert_eq!(state.get_text(keys::USER_INPUT).as_deref(), Some(reply));
        }
    }

    #[test]
    fn test_reask_after_resolution_is_independent() {
        let mut state = state_with_critique(CRITIQUE);
        let mut pending = None;
        run(&mut state, &mut pending, None);
        let first_id = pending.as_ref().map(|r| r.id);
        run(
            &mut state,
            &mut pending,
            Some(ConfirmationReply::user_response("first round details")),
        );
        assert!(pending.is_none());

        state.set(keys::CRITIQUE, "Mention Kubernetes experience");
        let result = run(&mut state, &mut pending, None);

        let GapAskResult::AwaitingUserInput { message } = result else {
            panic!("expected awaiting, got {result:?}");
        };
        assert!(message.contains("Mention Kubernetes experience"));
        assert!(!message.contains(CRITIQUE));
        let request = pending.expect("fresh request");
        assert_ne!(Some(request.id), first_id);
        assert!(!request.hint.contains("first round details"));
    }

    #[test]
    fn test_missing_user_response_is_error_and_keeps_prior_input() {
        let mut state = state_with_critique(CRITIQUE);
        state.set(keys::USER_INPUT, "prior");
        let mut pending = None;
        run(&mut state, &mut pending, None);

        let mut payload = serde_json::Map::new();
        payload.insert("answer".into(), json!("wrong key"));
        let result = run(
            &mut state,
            &mut pending,
            Some(ConfirmationReply::new(payload)),
        );

        assert_eq!(result.status(), "error");
        assert_eq!(state.get_text(keys::USER_INPUT).as_deref(), Some("prior"));
    }

    #[test]
    fn test_non_string_user_response_is_error() {
        let mut state = state_with_critique(CRITIQUE);
        let mut pending = None;
        run(&mut state, &mut pending, None);

        let mut payload = serde_json::Map::new();
        payload.insert("user_response".into(), json!(42));
        let result = run(
            &mut state,
            &mut pending,
            Some(ConfirmationReply::new(payload)),
        );

        assert_eq!(result.status(), "error");
        assert!(state.get(keys::USER_INPUT).is_none());
    }

    #[test]
    fn test_unsolicited_reply_is_rejected_without_mutation() {
        let mut state = state_with_critique(CRITIQUE);
        let before = state.clone();
        let mut pending = None;

        let result = run(
            &mut state,
            &mut pending,
            Some(ConfirmationReply::user_response("unprompted")),
        );

        assert_eq!(result.status(), "error");
        assert_eq!(state, before);
        assert!(pending.is_none());
    }

    #[test]
    fn test_scenario_skip() {
        let mut state = state_with_critique(CRITIQUE);
        let mut pending = None;

        let first = run(&mut state, &mut pending, None);
        let GapAskResult::AwaitingUserInput { message } = &first else {
            panic!("expected awaiting, got {first:?}");
        };
        assert!(message.contains(CRITIQUE));
        assert!(message.contains("SKIP"));

        let second = run(
            &mut state,
            &mut pending,
            Some(ConfirmationReply::user_response("SKIP")),
        );
        assert_eq!(
            second,
            GapAskResult::Skipped {
                user_input: SKIP_EXPLANATION.to_string(),
                message: "Proceeding with current resume...".to_string(),
            }
        );
        assert_eq!(
            state.get_text(keys::USER_INPUT).as_deref(),
            Some(SKIP_EXPLANATION)
        );
    }

    #[test]
    fn test_scenario_collected() {
        let answer = "I led a 3-person team and cut load time 40%";
        let mut state = state_with_critique(CRITIQUE);
        let mut pending = None;
        run(&mut state, &mut pending, None);

        let result = run(
            &mut state,
            &mut pending,
            Some(ConfirmationReply::user_response(answer)),
        );

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "info_collected", "user_input": answer})
        );
    }

    #[test]
    fn test_result_serializes_with_status_tag() {
        let value = serde_json::to_value(GapAskResult::AwaitingUserInput {
            message: "m".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"status": "awaiting_user_input", "message": "m"}));
    }
}
