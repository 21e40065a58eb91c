//! Confirmation request/reply: the pause/resume pair used to ask the user a question mid-run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::session::state::SessionState;

/// An outstanding question. Lives in the session until a reply consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub id: Uuid,
    /// Tool that registered the request.
    pub tool: String,
    pub hint: String,
    /// Example of the reply shape the tool expects, e.g. `{"user_response": "..."}`.
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// The user's answer. Any JSON object; tools pick the fields they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfirmationReply {
    pub payload: Map<String, Value>,
}

impl ConfirmationReply {
    pub fn new(payload: Map<String, Value>) -> Self {
        Self { payload }
    }

    /// Convenience for the common `{"user_response": text}` shape.
    pub fn user_response(text: impl Into<String>) -> Self {
        let mut payload = Map::new();
        payload.insert("user_response".to_string(), Value::String(text.into()));
        Self { payload }
    }
}

/// What a tool sees when it runs: shared state, the pending-request slot and
/// (on re-entry) the reply to that request.
pub struct ToolContext<'a> {
    pub state: &'a mut SessionState,
    pending: &'a mut Option<ConfirmationRequest>,
    reply: Option<ConfirmationReply>,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        state: &'a mut SessionState,
        pending: &'a mut Option<ConfirmationRequest>,
        reply: Option<ConfirmationReply>,
    ) -> Self {
        Self {
            state,
            pending,
            reply,
        }
    }

    pub fn reply(&self) -> Option<&ConfirmationReply> {
        self.reply.as_ref()
    }

    /// Registers a question for the user. Replaces any request still outstanding.
    pub fn request_confirmation(
        &mut self,
        tool: &str,
        hint: String,
        payload: Value,
    ) -> &ConfirmationRequest {
        let request = ConfirmationRequest {
            id: Uuid::new_v4(),
            tool: tool.to_string(),
            hint,
            payload,
            created_at: Utc::now(),
        };
        debug!(request_id = %request.id, tool, "confirmation requested");
        self.pending.insert(request)
    }

    /// Consumes the outstanding request, if any.
    pub fn take_pending(&mut self) -> Option<ConfirmationRequest> {
        self.pending.take()
    }
}
