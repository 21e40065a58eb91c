use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::confirmation::ConfirmationRequest;
use crate::session::gap_asker::GapAskResult;
use crate::session::state::{keys, SessionState};

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Running,
    AwaitingUserInput,
    Completed,
    Failed,
}

/// Pointer to a saved artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRef {
    pub filename: String,
    pub version: u32,
}

/// One end-to-end pipeline run. Persisted between the two halves of a confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub phase: SessionPhase,
    pub state: SessionState,
    pub pending: Option<ConfirmationRequest>,
    /// Most recent gap-asker outcome.
    pub last_gap_result: Option<GapAskResult>,
    pub artifact: Option<ArtifactRef>,
    /// User-visible explanation when the run failed or finished with a caveat.
    pub notice: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(state: SessionState) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phase: SessionPhase::Running,
            state,
            pending: None,
            last_gap_result: None,
            artifact: None,
            notice: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// What API callers see. Intermediate stage outputs stay server-side.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub pending_confirmation: Option<ConfirmationRequest>,
    pub gap_result: Option<GapAskResult>,
    pub critique: Option<String>,
    pub artifact: Option<ArtifactRef>,
    pub download_url: Option<String>,
    /// Filled LaTeX, only when the run completed without an artifact to download.
    pub latex: Option<String>,
    pub notice: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionView {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id,
            phase: session.phase,
            pending_confirmation: session.pending.clone(),
            gap_result: session.last_gap_result.clone(),
            critique: session
                .state
                .get_text(keys::CRITIQUE),
            artifact: session.artifact.clone(),
            download_url: session.artifact.as_ref().map(|a| {
                format!("/api/v1/sessions/{}/artifacts/{}", session.id, a.filename)
            }),
            latex: match (session.phase, &session.artifact) {
                (SessionPhase::Completed, None) => session
                    .state
                    .get_text(keys::FILLED_LATEX),
                _ => None,
            },
            notice: session.notice.clone(),
            updated_at: session.updated_at,
        }
    }
}
